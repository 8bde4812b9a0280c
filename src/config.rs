use std::path::Path;

use tracing::warn;

use crate::ai::{MctsConfig, NetworkConfig, PolicyConfig, FEATURE_LEN};
use crate::checkpoint::StorageConfig;
use crate::error::ConfigError;
use crate::training::{EvolutionConfig, SelfPlayConfig};

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base seed for every random stream; OS entropy when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub network: NetworkConfig,
    pub mcts: MctsConfig,
    pub policy: PolicyConfig,
    pub evolution: EvolutionConfig,
    pub self_play: SelfPlayConfig,
    pub storage: StorageConfig,
}

fn invalid(msg: &str) -> Result<(), ConfigError> {
    Err(ConfigError::Validation(msg.into()))
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: AppConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the file
    /// does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let layers = &self.network.layer_sizes;
        if layers.len() < 2 {
            return invalid("network.layer_sizes needs at least an input and an output layer");
        }
        if layers.contains(&0) {
            return invalid("network.layer_sizes must not contain zero widths");
        }
        if layers[0] != FEATURE_LEN {
            return Err(ConfigError::Validation(format!(
                "network.layer_sizes[0] must equal the encoder width {}",
                FEATURE_LEN
            )));
        }
        if self.network.learning_rate <= 0.0 {
            return invalid("network.learning_rate must be > 0");
        }

        if self.mcts.exploration < 0.0 {
            return invalid("mcts.exploration must be >= 0");
        }
        if self.mcts.max_iterations == 0 {
            return invalid("mcts.max_iterations must be >= 1");
        }
        if self.mcts.time_check_interval == 0 {
            return invalid("mcts.time_check_interval must be >= 1");
        }
        if self.mcts.max_depth == 0 {
            return invalid("mcts.max_depth must be >= 1");
        }
        if self.mcts.max_children == 0 {
            return invalid("mcts.max_children must be >= 1");
        }

        if self.policy.opening_plies > self.policy.endgame_ply {
            return invalid("policy.opening_plies must be <= policy.endgame_ply");
        }
        if !(0.0..=1.0).contains(&self.policy.mcts_probability) {
            return invalid("policy.mcts_probability must be in [0, 1]");
        }
        if self.policy.temperature <= 0.0 {
            return invalid("policy.temperature must be > 0");
        }

        if self.evolution.population_size == 0 {
            return invalid("evolution.population_size must be >= 1");
        }
        if self.evolution.tournament_size == 0 {
            return invalid("evolution.tournament_size must be >= 1");
        }
        if !(0.0..=1.0).contains(&self.evolution.mutation_rate) {
            return invalid("evolution.mutation_rate must be in [0, 1]");
        }
        if self.evolution.mutation_strength < 0.0 {
            return invalid("evolution.mutation_strength must be >= 0");
        }
        if self.evolution.max_moves == 0 {
            return invalid("evolution.max_moves must be >= 1");
        }

        if self.self_play.max_moves == 0 {
            return invalid("self_play.max_moves must be >= 1");
        }
        if self.self_play.batch_size == 0 {
            return invalid("self_play.batch_size must be > 0");
        }
        if self.self_play.buffer_capacity < self.self_play.batch_size {
            return invalid("self_play.buffer_capacity must be >= self_play.batch_size");
        }
        if !(0.0..=1.0).contains(&self.self_play.discount) {
            return invalid("self_play.discount must be in [0, 1]");
        }

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(&AppConfig::default())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        config.validate().expect("default config should be valid");
        assert_eq!(config.network.layer_sizes, vec![1220, 512, 256, 128, 64]);
        assert!(config.seed.is_none());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let toml_str = r#"
seed = 7

[policy]
temperature = 0.25
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.seed, Some(7));
        assert!((config.policy.temperature - 0.25).abs() < 1e-12);
        // Other fields should be defaults
        assert!((config.policy.mcts_probability - 0.7).abs() < 1e-12);
        assert_eq!(config.self_play.batch_size, 64);
        assert_eq!(config.storage.model_dir, std::path::PathBuf::from("models"));
    }

    #[test]
    fn test_empty_toml_uses_all_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.mcts, MctsConfig::default());
        assert_eq!(config.evolution, EvolutionConfig::default());
    }

    #[test]
    fn test_validation_rejects_wrong_input_width() {
        let mut config = AppConfig::default();
        config.network.layer_sizes = vec![100, 64];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("1220"), "{}", err);
    }

    #[test]
    fn test_validation_rejects_single_layer() {
        let mut config = AppConfig::default();
        config.network.layer_sizes = vec![1220];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_width() {
        let mut config = AppConfig::default();
        config.network.layer_sizes = vec![1220, 0, 64];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_negative_lr() {
        let mut config = AppConfig::default();
        config.network.learning_rate = -0.001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_bad_probability() {
        let mut config = AppConfig::default();
        config.policy.mcts_probability = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_empty_population() {
        let mut config = AppConfig::default();
        config.evolution.population_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_buffer_smaller_than_batch() {
        let mut config = AppConfig::default();
        config.self_play.buffer_capacity = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_zero_time_check_interval() {
        let mut config = AppConfig::default();
        config.mcts.time_check_interval = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = AppConfig::load_or_default(Path::new("nonexistent_config.toml")).unwrap();
        assert_eq!(config.evolution.population_size, 5);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_config.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(
            f,
            r#"
[evolution]
population_size = 12
generations = 3

[storage]
model_dir = "run/models"
"#
        )
        .unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.evolution.population_size, 12);
        assert_eq!(config.evolution.generations, 3);
        assert_eq!(config.storage.model_dir, std::path::PathBuf::from("run/models"));
        // Others are defaults
        assert_eq!(config.evolution.elite_count, 5);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[self_play]\nbatch_size = 0\n").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_default_toml_roundtrips() {
        let toml_str = AppConfig::default_toml().unwrap();
        let config: AppConfig = toml::from_str(&toml_str).unwrap();
        config.validate().expect("roundtripped config should be valid");
        assert_eq!(config.policy, PolicyConfig::default());
    }
}
