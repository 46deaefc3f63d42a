use serde::{Deserialize, Serialize};

use crate::ai::algorithms::{DqnConfig, ReinforceConfig};

/// Metrics snapshot at checkpoint time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    /// Mean reward of greedy evaluation episodes.
    pub eval_reward: f32,
    pub mean_reward: f32,
    pub mean_loss: f32,
    pub mean_episode_length: f32,
    pub training_steps: usize,
}

/// Hyperparameters recorded in checkpoint metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckpointHyperparameters {
    Dqn(DqnConfig),
    Reinforce(ReinforceConfig),
}

impl CheckpointHyperparameters {
    /// Name of the checkpoint series these hyperparameters belong to.
    /// REINFORCE with and without a baseline store different networks, so
    /// they keep separate series.
    pub fn series(&self) -> &'static str {
        match self {
            CheckpointHyperparameters::Dqn(_) => "dqn",
            CheckpointHyperparameters::Reinforce(c) if c.baseline => "reinforce_baseline",
            CheckpointHyperparameters::Reinforce(_) => "reinforce",
        }
    }
}

/// Top-level checkpoint metadata written to metadata.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub episode: usize,
    pub timestamp: u64,
    pub algorithm: String,
    pub metrics: CheckpointMetrics,
    pub hyperparameters: CheckpointHyperparameters,
}

/// DQN-specific training state written to training_state.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DqnTrainingState {
    pub epsilon: f64,
    pub env_steps: usize,
    pub step_count: usize,
    pub episode_count: usize,
}

/// REINFORCE-specific training state written to training_state.json.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReinforceTrainingState {
    pub episode_count: usize,
    pub step_count: usize,
}
