//! # Hive AI
//!
//! A move engine for the hive board game: a hybrid of Monte Carlo tree
//! search and small feed-forward networks, trained by self-play
//! reinforcement and by an evolutionary tournament.
//!
//! ## Modules
//!
//! - [`game`] - Hex coordinates, pieces, board stacks, positions and the rules adapter
//! - [`ai`] - State encoding, the feed-forward network, MCTS, heuristic, decision policy
//! - [`training`] - Self-play and evolutionary trainers, replay buffer, metrics, CSV export
//! - [`checkpoint`] - Model stores and checkpoints
//! - [`config`] - TOML configuration loading and validation
//! - [`error`] - Structured error types

pub mod ai;
pub mod checkpoint;
pub mod config;
pub mod error;
pub mod game;
pub mod training;
