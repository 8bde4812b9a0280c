//! Decision engine: state encoding, the feed-forward network, search,
//! heuristic evaluation and the phase-based move policy.

mod agent;
pub mod heuristic;
pub mod mcts;
pub mod networks;
pub mod policy;
pub mod state_encoding;

pub use agent::{move_slot, Agent, AgentStats, Experience, MatchOutcome};
pub use mcts::{MctsConfig, MctsEngine, SearchReport};
pub use networks::{NetworkConfig, NeuralNetwork};
pub use policy::{DecisionPolicy, Phase, PolicyConfig};
pub use state_encoding::{BoardEncoder, StateEncoder, FEATURE_LEN};
