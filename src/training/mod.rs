//! Training infrastructure: game drivers and reward assignment, the replay
//! buffer, self-play and evolutionary trainers, rolling metrics and CSV
//! export.

pub mod combined;
pub mod episode;
pub mod evolution;
pub mod export;
pub mod metrics;
pub mod replay_buffer;
pub mod self_play;

pub use combined::{train_combined, CombinedReport};
pub use episode::{assign_rewards, derive_seed, play_match, play_self_play_game, EpisodeTrace};
pub use evolution::{EvolutionConfig, EvolutionaryTrainer, GenerationStats};
pub use metrics::{EpisodeResult, TrainingMetrics};
pub use replay_buffer::ReplayBuffer;
pub use self_play::{train_step, SelfPlayConfig, SelfPlaySummary, SelfPlayTrainer};
