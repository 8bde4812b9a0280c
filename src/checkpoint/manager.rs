use tracing::{debug, info};

use crate::ai::{Agent, NetworkConfig};
use crate::checkpoint::metadata::CheckpointMetadata;
use crate::checkpoint::store::ModelStore;
use crate::checkpoint::{
    METADATA_KEY, POLICY_NETWORK_KEY, TRAINING_LOG_KEY, VALUE_NETWORK_KEY,
};
use crate::error::CheckpointError;

/// Saves and restores agents through a [`ModelStore`].
///
/// A checkpoint is the policy and value weight blobs, `checkpoint.json`
/// and one appended line in `training_log.txt`. Each save replaces the
/// previous weights.
pub struct CheckpointManager<'a> {
    store: &'a dyn ModelStore,
}

impl<'a> CheckpointManager<'a> {
    pub fn new(store: &'a dyn ModelStore) -> Self {
        CheckpointManager { store }
    }

    pub fn store(&self) -> &'a dyn ModelStore {
        self.store
    }

    /// Write both networks, then the metadata, then the log line.
    pub fn save(&self, agent: &Agent, metadata: &CheckpointMetadata) -> Result<(), CheckpointError> {
        agent.policy_net.save(self.store, POLICY_NETWORK_KEY)?;
        agent.value_net.save(self.store, VALUE_NETWORK_KEY)?;

        let json = serde_json::to_string_pretty(metadata)?;
        self.store.write(METADATA_KEY, json.as_bytes())?;

        let line = metadata.log_line();
        self.store.append_log(TRAINING_LOG_KEY, &line)?;
        info!(agent = agent.id, step = metadata.step, "{}", line);
        Ok(())
    }

    /// Restore the stored agent. Missing or unreadable weights fall back to
    /// fresh ones; only an invalid `config` is an error.
    pub fn load_agent(
        &self,
        id: usize,
        config: &NetworkConfig,
        seed: u64,
    ) -> Result<Agent, CheckpointError> {
        let agent = Agent::from_store(id, config, self.store, seed)?;
        debug!(agent = id, "agent restored from model store");
        Ok(agent)
    }

    pub fn latest_metadata(&self) -> Result<CheckpointMetadata, CheckpointError> {
        let bytes = self
            .store
            .read(METADATA_KEY)?
            .ok_or(CheckpointError::NoMetadata)?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkpoint::metadata::{CheckpointKind, CheckpointMetrics};
    use crate::checkpoint::{FileModelStore, MemoryModelStore};

    fn config() -> NetworkConfig {
        NetworkConfig {
            layer_sizes: vec![6, 4, 3],
            learning_rate: 0.01,
            seed: 5,
        }
    }

    fn metrics() -> CheckpointMetrics {
        CheckpointMetrics {
            white_win_rate: 0.5,
            black_win_rate: 0.3,
            draw_rate: 0.2,
            average_game_length: 30.0,
            average_loss: 0.1,
        }
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path());
        let manager = CheckpointManager::new(&store);
        let agent = Agent::new(0, &config(), 9).unwrap();

        let meta = CheckpointMetadata::self_play(100, 640, metrics(), agent.policy_net.layer_sizes());
        manager.save(&agent, &meta).unwrap();
        assert!(dir.path().join(POLICY_NETWORK_KEY).exists());
        assert!(dir.path().join(VALUE_NETWORK_KEY).exists());
        assert!(dir.path().join(METADATA_KEY).exists());

        // A different seed proves the weights came from the store.
        let restored = manager.load_agent(3, &config(), 12345).unwrap();
        assert_eq!(restored.id, 3);
        assert_eq!(restored.policy_net, agent.policy_net);
        assert_eq!(restored.value_net, agent.value_net);

        let latest = manager.latest_metadata().unwrap();
        assert_eq!(latest.kind, CheckpointKind::SelfPlay);
        assert_eq!(latest.step, 100);
        assert_eq!(latest.buffer_len, Some(640));
    }

    #[test]
    fn test_log_lines_accumulate() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileModelStore::new(dir.path());
        let manager = CheckpointManager::new(&store);
        let agent = Agent::new(0, &config(), 1).unwrap();

        for games in [100, 200] {
            let meta = CheckpointMetadata::self_play(games, games * 10, metrics(), &[6, 4, 3]);
            manager.save(&agent, &meta).unwrap();
        }
        let log = std::fs::read_to_string(dir.path().join(TRAINING_LOG_KEY)).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Checkpoint at game 100 - Buffer size: 1000",
                "Checkpoint at game 200 - Buffer size: 2000",
            ]
        );
        assert_eq!(manager.latest_metadata().unwrap().step, 200);
    }

    #[test]
    fn test_load_from_empty_store_falls_back() {
        let store = MemoryModelStore::new();
        let manager = CheckpointManager::new(&store);
        let agent = manager.load_agent(0, &config(), 4).unwrap();
        assert_eq!(agent.policy_net.layer_sizes(), &[6, 4, 3]);
        assert!(matches!(
            manager.latest_metadata(),
            Err(CheckpointError::NoMetadata)
        ));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let store = MemoryModelStore::new();
        let manager = CheckpointManager::new(&store);
        let bad = NetworkConfig {
            layer_sizes: vec![6],
            ..config()
        };
        assert!(matches!(
            manager.load_agent(0, &bad, 1),
            Err(CheckpointError::Network(_))
        ));
    }
}
