use std::path::Path;

use crate::checkpoint::CheckpointHyperparameters;
use crate::env::Observation;
use crate::error::TrainingError;

/// A single environment step as seen by a learner.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: Observation,
    pub action: usize,
    pub next_state: Observation,
    pub reward: f32,
    /// Episode ended on this step (terminated or truncated).
    pub done: bool,
}

/// Metrics returned from a training update.
#[derive(Debug, Clone, Default)]
pub struct UpdateMetrics {
    pub loss: f32,
    pub value_loss: Option<f32>,
    pub policy_entropy: Option<f32>,
    pub updates: usize,
}

/// Universal interface for all agents.
pub trait Agent {
    /// Select an action given the current observation.
    /// When `training` is true, the agent may explore; otherwise it exploits.
    fn select_action(
        &mut self,
        observation: &[f32],
        training: bool,
    ) -> Result<usize, TrainingError>;

    /// Return the agent's display name.
    fn name(&self) -> &str;
}

/// Extension trait for agents that support the full training lifecycle.
pub trait TrainableAgent: Agent {
    /// Algorithm name for logging ("DQN", "REINFORCE").
    fn algorithm_name(&self) -> &str;
    /// Completed training episodes (for resume offset).
    fn episode_count(&self) -> usize;
    /// Gradient steps taken so far.
    fn step_count(&self) -> usize;

    /// Random-action steps to collect before the first episode.
    fn warmup_steps(&self) -> usize {
        0
    }
    /// Store a transition without learning from it (warm-up).
    fn remember(&mut self, _transition: Transition) {}

    /// Feed one environment step. Returns the loss if a gradient step ran.
    fn observe(&mut self, transition: Transition) -> Result<Option<f32>, TrainingError>;
    /// Close the current episode and run any end-of-episode update.
    fn end_episode(&mut self) -> Result<UpdateMetrics, TrainingError>;

    /// Algorithm-specific metric value (epsilon for DQN).
    fn algorithm_metric_value(&self) -> f32;
    /// Algorithm-specific metric label ("eps" for DQN, "entropy" for REINFORCE).
    fn algorithm_metric_label(&self) -> &str;

    /// Save network weights to a directory.
    fn save_weights_to_dir(&self, dir: &Path) -> Result<(), Box<dyn std::error::Error>>;
    /// Load network weights from a directory.
    fn load_weights_from_dir(&mut self, dir: &Path) -> Result<(), Box<dyn std::error::Error>>;
    /// Serialize training state to JSON.
    fn training_state_json(&self) -> Result<String, serde_json::Error>;
    /// Restore training state from JSON written by `training_state_json`.
    fn restore_training_state_json(&mut self, json: &str) -> Result<(), serde_json::Error>;
    /// Hyperparameters recorded with checkpoints; their kind names the
    /// checkpoint series this agent belongs to.
    fn hyperparameters(&self) -> CheckpointHyperparameters;
}
