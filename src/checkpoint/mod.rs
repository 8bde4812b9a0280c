//! Model persistence: the keyed store abstraction and checkpoints built on it.

mod manager;
mod metadata;
mod store;

pub use manager::CheckpointManager;
pub use metadata::{CheckpointKind, CheckpointMetadata, CheckpointMetrics};
pub use store::{FileModelStore, MemoryModelStore, ModelStore, StorageConfig};

pub const POLICY_NETWORK_KEY: &str = "policy_network.bin";
pub const VALUE_NETWORK_KEY: &str = "value_network.bin";
pub const METADATA_KEY: &str = "checkpoint.json";
pub const TRAINING_LOG_KEY: &str = "training_log.txt";
