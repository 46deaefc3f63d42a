use std::path::Path;

use crate::ai::algorithms::{DqnConfig, ReinforceConfig};
use crate::checkpoint::CheckpointManagerConfig;
use crate::env::CartPoleConfig;
use crate::error::ConfigError;
use crate::training::trainer::TrainerConfig;

/// Top-level application configuration, loadable from TOML.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub env: CartPoleConfig,
    pub dqn: DqnConfig,
    pub reinforce: ReinforceConfig,
    pub training: TrainerConfig,
    pub checkpoint: CheckpointManagerConfig,
}

fn check(ok: bool, msg: &str) -> Result<(), ConfigError> {
    if ok {
        Ok(())
    } else {
        Err(ConfigError::Validation(msg.into()))
    }
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
            log::warn!("config file '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check(
            self.env.max_episode_steps > 0,
            "env.max_episode_steps must be > 0",
        )?;

        let dqn = &self.dqn;
        check(dqn.learning_rate > 0.0, "dqn.learning_rate must be > 0")?;
        check(dqn.weight_decay >= 0.0, "dqn.weight_decay must be >= 0")?;
        check(
            (0.0..=1.0).contains(&dqn.gamma),
            "dqn.gamma must be in [0, 1]",
        )?;
        check(
            (0.0..=1.0).contains(&dqn.epsilon_start),
            "dqn.epsilon_start must be in [0, 1]",
        )?;
        check(
            (0.0..=1.0).contains(&dqn.epsilon_end),
            "dqn.epsilon_end must be in [0, 1]",
        )?;
        check(
            dqn.epsilon_end <= dqn.epsilon_start,
            "dqn.epsilon_end must be <= dqn.epsilon_start",
        )?;
        check(
            dqn.epsilon_decay > 0.0 && dqn.epsilon_decay <= 1.0,
            "dqn.epsilon_decay must be in (0, 1]",
        )?;
        check(dqn.batch_size > 0, "dqn.batch_size must be > 0")?;
        check(
            dqn.replay_capacity > dqn.batch_size,
            "dqn.replay_capacity must be > dqn.batch_size",
        )?;
        check(
            dqn.target_update_interval > 0,
            "dqn.target_update_interval must be > 0",
        )?;
        check(
            dqn.hidden_sizes.iter().all(|&h| h > 0),
            "dqn.hidden_sizes entries must be > 0",
        )?;

        let pg = &self.reinforce;
        check(pg.learning_rate > 0.0, "reinforce.learning_rate must be > 0")?;
        check(pg.weight_decay >= 0.0, "reinforce.weight_decay must be >= 0")?;
        check(
            (0.0..=1.0).contains(&pg.gamma),
            "reinforce.gamma must be in [0, 1]",
        )?;
        check(
            pg.baseline_learning_rate > 0.0,
            "reinforce.baseline_learning_rate must be > 0",
        )?;
        check(
            pg.hidden_sizes.iter().all(|&h| h > 0),
            "reinforce.hidden_sizes entries must be > 0",
        )?;
        check(
            pg.baseline_hidden_sizes.iter().all(|&h| h > 0),
            "reinforce.baseline_hidden_sizes entries must be > 0",
        )?;

        let training = &self.training;
        check(
            training.num_episodes > 0,
            "training.num_episodes must be > 0",
        )?;
        check(
            training.max_steps_per_episode > 0,
            "training.max_steps_per_episode must be > 0",
        )?;
        check(
            training.log_interval > 0,
            "training.log_interval must be > 0",
        )?;
        check(
            training.eval_interval == 0 || training.eval_episodes > 0,
            "training.eval_episodes must be > 0 when evaluation is enabled",
        )?;

        check(
            self.checkpoint.keep_last_n > 0,
            "checkpoint.keep_last_n must be >= 1",
        )?;

        Ok(())
    }

    /// Generate a TOML string with all default values (useful for creating
    /// example config files).
    pub fn default_toml() -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(&AppConfig::default())
    }
}
