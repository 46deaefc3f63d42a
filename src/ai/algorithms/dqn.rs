use std::error::Error;
use std::path::Path;

use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{AdamW, AdamWConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::DefaultRecorder;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::ai::agent::{Agent, TrainableAgent, Transition, UpdateMetrics};
use crate::ai::encoding::{
    action_mask, column, encode_observation, encode_observations, to_scalar, to_vec,
};
use crate::ai::exploration::{argmax, EpsilonGreedy};
use crate::ai::networks::{QNetwork, QNetworkConfig};
use crate::checkpoint::{CheckpointHyperparameters, DqnTrainingState};
use crate::error::TrainingError;
use crate::training::replay_buffer::ReplayBuffer;

type InferBackend = NdArray<f32>;
type TrainBackend = Autodiff<InferBackend>;

/// DQN hyperparameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DqnConfig {
    pub learning_rate: f64,
    pub weight_decay: f32,
    pub gamma: f32,
    pub epsilon_start: f64,
    pub epsilon_end: f64,
    /// Multiplicative decay applied after every action decision.
    pub epsilon_decay: f64,
    /// Environment steps between target network refreshes.
    pub target_update_interval: usize,
    pub batch_size: usize,
    pub replay_capacity: usize,
    /// Random-action transitions collected before training starts.
    pub warmup_steps: usize,
    pub hidden_sizes: Vec<usize>,
}

impl Default for DqnConfig {
    fn default() -> Self {
        DqnConfig {
            learning_rate: 1e-3,
            weight_decay: 0.01,
            gamma: 0.99,
            epsilon_start: 0.99,
            epsilon_end: 0.01,
            epsilon_decay: 0.9998,
            target_update_interval: 300,
            batch_size: 1000,
            replay_capacity: 10_000,
            warmup_steps: 1000,
            hidden_sizes: vec![128, 64, 32, 64, 128],
        }
    }
}

/// DQN agent with online + target networks, replay buffer, and AdamW optimizer.
pub struct DqnAgent {
    q_network: QNetwork<TrainBackend>,
    target_network: QNetwork<InferBackend>,
    optimizer: OptimizerAdaptor<AdamW, QNetwork<TrainBackend>, TrainBackend>,
    net_config: QNetworkConfig,
    replay_buffer: ReplayBuffer,
    exploration: EpsilonGreedy,
    config: DqnConfig,
    device: <TrainBackend as Backend>::Device,
    num_actions: usize,
    env_steps: usize,
    step_count: usize,
    episode_count: usize,
    episode_loss_sum: f32,
    episode_steps: usize,
    episode_updates: usize,
    rng: StdRng,
}

impl DqnAgent {
    pub fn new(config: DqnConfig, observation_size: usize, num_actions: usize) -> Self {
        let replay_buffer = ReplayBuffer::new(config.replay_capacity);
        Self::build(config, observation_size, num_actions, replay_buffer, StdRng::from_os_rng())
    }

    pub fn with_seed(
        config: DqnConfig,
        observation_size: usize,
        num_actions: usize,
        seed: u64,
    ) -> Self {
        let replay_buffer = ReplayBuffer::with_seed(config.replay_capacity, seed);
        Self::build(
            config,
            observation_size,
            num_actions,
            replay_buffer,
            StdRng::seed_from_u64(seed.wrapping_add(1)),
        )
    }

    fn build(
        config: DqnConfig,
        observation_size: usize,
        num_actions: usize,
        replay_buffer: ReplayBuffer,
        rng: StdRng,
    ) -> Self {
        let device = Default::default();
        let net_config = QNetworkConfig::new(observation_size, num_actions)
            .with_hidden_sizes(config.hidden_sizes.clone());
        let q_network: QNetwork<TrainBackend> = net_config.init(&device);
        let target_network = q_network.valid();
        let optimizer = AdamWConfig::new()
            .with_weight_decay(config.weight_decay)
            .init();
        let exploration =
            EpsilonGreedy::new(config.epsilon_start, config.epsilon_decay, config.epsilon_end);

        DqnAgent {
            q_network,
            target_network,
            optimizer,
            net_config,
            replay_buffer,
            exploration,
            config,
            device,
            num_actions,
            env_steps: 0,
            step_count: 0,
            episode_count: 0,
            episode_loss_sum: 0.0,
            episode_steps: 0,
            episode_updates: 0,
            rng,
        }
    }

    /// Q-values of the live network for one observation.
    pub fn q_values(&self, observation: &[f32]) -> Result<Vec<f32>, TrainingError> {
        live_q_values(&self.q_network, observation, &self.device)
    }

    /// Perform one gradient update step from the replay buffer.
    pub fn train_step(&mut self) -> Result<f32, TrainingError> {
        let batch = self.replay_buffer.sample(self.config.batch_size)?;
        let n = self.num_actions;

        let states: Vec<&[f32]> = batch.iter().map(|t| t.state.as_slice()).collect();
        let next_states: Vec<&[f32]> = batch.iter().map(|t| t.next_state.as_slice()).collect();
        let actions: Vec<usize> = batch.iter().map(|t| t.action).collect();

        // Q(s, a) for the actions actually taken: [B, 1]
        let q_all = self
            .q_network
            .forward(encode_observations::<TrainBackend, _>(&states, &self.device));
        let mask = action_mask::<TrainBackend>(&actions, n, &self.device);
        let q_taken = (q_all * mask).sum_dim(1);

        // Bootstrapped targets from the target network (no grad)
        let next_q = to_vec(
            self.target_network
                .forward(encode_observations::<InferBackend, _>(&next_states, &self.device)),
        )?;
        let target_data: Vec<f32> = batch
            .iter()
            .enumerate()
            .map(|(i, t)| {
                if t.done {
                    t.reward
                } else {
                    let max_q = next_q[i * n..(i + 1) * n]
                        .iter()
                        .copied()
                        .fold(f32::NEG_INFINITY, f32::max);
                    t.reward + self.config.gamma * max_q
                }
            })
            .collect();
        let targets = column::<TrainBackend>(&target_data, &self.device);

        // MSE loss
        let diff = q_taken - targets;
        let loss = (diff.clone() * diff).mean();
        let loss_val = to_scalar(loss.clone())?;

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.q_network);
        self.q_network = self
            .optimizer
            .step(self.config.learning_rate, self.q_network.clone(), grads);
        self.step_count += 1;

        Ok(loss_val)
    }

    /// Overwrite the target network with the live network's parameters.
    pub fn sync_target(&mut self) {
        self.target_network = self.q_network.valid();
    }

    /// Live and target parameters, flattened (for inspection).
    pub fn parameter_snapshot(&self) -> (Vec<f32>, Vec<f32>) {
        (
            self.q_network.valid().flat_parameters(),
            self.target_network.flat_parameters(),
        )
    }

    pub fn epsilon(&self) -> f64 {
        self.exploration.epsilon()
    }

    /// Set epsilon directly (e.g. 0.0 for pure greedy inference).
    pub fn set_epsilon(&mut self, eps: f64) {
        self.exploration.set_epsilon(eps);
    }

    pub fn env_steps(&self) -> usize {
        self.env_steps
    }

    pub fn replay_len(&self) -> usize {
        self.replay_buffer.len()
    }

    pub fn config(&self) -> &DqnConfig {
        &self.config
    }

    /// Save network weights to a directory.
    pub fn save_to_dir(&self, dir: &Path) -> Result<(), Box<dyn Error>> {
        let recorder = DefaultRecorder::default();
        self.q_network
            .clone()
            .valid()
            .save_file(dir.join("q_network"), &recorder)?;
        self.target_network
            .clone()
            .save_file(dir.join("target_network"), &recorder)?;
        Ok(())
    }

    /// Load network weights from a directory.
    pub fn load_from_dir(&mut self, dir: &Path) -> Result<(), Box<dyn Error>> {
        let recorder = DefaultRecorder::default();

        let q: QNetwork<TrainBackend> = self
            .net_config
            .init(&self.device)
            .load_file(dir.join("q_network"), &recorder, &self.device)?;
        self.q_network = q;

        let target: QNetwork<InferBackend> = self
            .net_config
            .init(&self.device)
            .load_file(dir.join("target_network"), &recorder, &self.device)?;
        self.target_network = target;
        Ok(())
    }

    /// Export current training state for checkpointing.
    pub fn training_state(&self) -> DqnTrainingState {
        DqnTrainingState {
            epsilon: self.exploration.epsilon(),
            env_steps: self.env_steps,
            step_count: self.step_count,
            episode_count: self.episode_count,
        }
    }

    /// Restore counters and epsilon from a checkpoint. Hyperparameters stay
    /// as this agent was built with.
    pub fn restore_training_state(&mut self, state: &DqnTrainingState) {
        self.env_steps = state.env_steps;
        self.step_count = state.step_count;
        self.episode_count = state.episode_count;
        self.exploration.set_epsilon(state.epsilon);
    }
}

fn live_q_values(
    network: &QNetwork<TrainBackend>,
    observation: &[f32],
    device: &<TrainBackend as Backend>::Device,
) -> Result<Vec<f32>, TrainingError> {
    let input = encode_observation::<InferBackend>(observation, device);
    to_vec(network.valid().forward(input))
}

impl Agent for DqnAgent {
    fn select_action(
        &mut self,
        observation: &[f32],
        training: bool,
    ) -> Result<usize, TrainingError> {
        let q_network = &self.q_network;
        let device = &self.device;
        let q_values = || live_q_values(q_network, observation, device);

        if training {
            self.exploration.select(&mut self.rng, self.num_actions, q_values)
        } else {
            Ok(argmax(&q_values()?))
        }
    }

    fn name(&self) -> &str {
        "DQN"
    }
}

impl TrainableAgent for DqnAgent {
    fn algorithm_name(&self) -> &str {
        "DQN"
    }

    fn episode_count(&self) -> usize {
        self.episode_count
    }

    fn step_count(&self) -> usize {
        self.step_count
    }

    fn warmup_steps(&self) -> usize {
        self.config.warmup_steps
    }

    fn remember(&mut self, transition: Transition) {
        self.replay_buffer.push(transition);
    }

    fn observe(&mut self, transition: Transition) -> Result<Option<f32>, TrainingError> {
        self.replay_buffer.push(transition);
        self.env_steps += 1;
        self.episode_steps += 1;

        if self.replay_buffer.len() <= self.config.batch_size {
            return Ok(None);
        }

        let loss = self.train_step()?;
        self.episode_loss_sum += loss;
        self.episode_updates += 1;

        if self.config.target_update_interval > 0
            && self.env_steps % self.config.target_update_interval == 0
        {
            self.sync_target();
            log::debug!("target network synced at env step {}", self.env_steps);
        }
        Ok(Some(loss))
    }

    fn end_episode(&mut self) -> Result<UpdateMetrics, TrainingError> {
        self.episode_count += 1;
        let metrics = UpdateMetrics {
            loss: self.episode_loss_sum / self.episode_steps.max(1) as f32,
            updates: self.episode_updates,
            ..Default::default()
        };
        self.episode_loss_sum = 0.0;
        self.episode_steps = 0;
        self.episode_updates = 0;
        Ok(metrics)
    }

    fn algorithm_metric_value(&self) -> f32 {
        self.exploration.epsilon() as f32
    }

    fn algorithm_metric_label(&self) -> &str {
        "eps"
    }

    fn save_weights_to_dir(&self, dir: &Path) -> Result<(), Box<dyn Error>> {
        self.save_to_dir(dir)
    }

    fn load_weights_from_dir(&mut self, dir: &Path) -> Result<(), Box<dyn Error>> {
        self.load_from_dir(dir)
    }

    fn training_state_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.training_state())
    }

    fn restore_training_state_json(&mut self, json: &str) -> Result<(), serde_json::Error> {
        let state: DqnTrainingState = serde_json::from_str(json)?;
        self.restore_training_state(&state);
        Ok(())
    }

    fn hyperparameters(&self) -> CheckpointHyperparameters {
        CheckpointHyperparameters::Dqn(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> DqnConfig {
        DqnConfig {
            batch_size: 4,
            replay_capacity: 64,
            warmup_steps: 0,
            target_update_interval: 1000,
            hidden_sizes: vec![8, 8],
            ..Default::default()
        }
    }

    fn transition(i: usize, done: bool) -> Transition {
        let x = i as f32 * 0.01;
        Transition {
            state: vec![x, -x, 0.5 * x, 0.1],
            action: i % 2,
            next_state: vec![x + 0.01, -x, 0.5 * x, 0.2],
            reward: 1.0,
            done,
        }
    }

    #[test]
    fn test_dqn_agent_selects_valid_action() {
        let mut agent = DqnAgent::with_seed(small_config(), 4, 2, 0);
        for _ in 0..10 {
            let action = agent.select_action(&[0.0, 0.1, -0.02, 0.0], false).unwrap();
            assert!(action < 2, "Action {} is not valid", action);
        }
    }

    #[test]
    fn test_greedy_selection_does_not_decay_epsilon() {
        let mut agent = DqnAgent::with_seed(small_config(), 4, 2, 0);
        let before = agent.epsilon();
        for _ in 0..5 {
            agent.select_action(&[0.0; 4], false).unwrap();
        }
        assert_eq!(agent.epsilon(), before);
    }

    #[test]
    fn test_training_selection_decays_every_decision() {
        let config = DqnConfig {
            epsilon_start: 0.9,
            epsilon_end: 0.1,
            epsilon_decay: 0.5,
            ..small_config()
        };
        let mut agent = DqnAgent::with_seed(config, 4, 2, 1);
        for d in 1..=6 {
            agent.select_action(&[0.0; 4], true).unwrap();
            let expected = (0.9 * 0.5f64.powi(d)).max(0.1);
            assert!((agent.epsilon() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_observe_trains_only_past_batch_size() {
        let mut agent = DqnAgent::with_seed(small_config(), 4, 2, 2);
        for i in 0..4 {
            assert!(agent.observe(transition(i, false)).unwrap().is_none());
        }
        let loss = agent.observe(transition(4, true)).unwrap();
        assert!(loss.is_some());
        assert!(loss.unwrap().is_finite());
        assert_eq!(agent.step_count(), 1);
        assert_eq!(agent.env_steps(), 5);
    }

    #[test]
    fn test_warmup_transitions_do_not_count_as_env_steps() {
        let mut agent = DqnAgent::with_seed(small_config(), 4, 2, 3);
        for i in 0..10 {
            agent.remember(transition(i, false));
        }
        assert_eq!(agent.replay_len(), 10);
        assert_eq!(agent.env_steps(), 0);
        assert_eq!(agent.step_count(), 0);
    }

    #[test]
    fn test_target_identical_after_sync_and_diverges_after_update() {
        let mut agent = DqnAgent::with_seed(small_config(), 4, 2, 4);
        for i in 0..8 {
            agent.remember(transition(i, i == 7));
        }

        agent.train_step().unwrap();
        let (live, target) = agent.parameter_snapshot();
        assert_ne!(live, target, "live network should move after an update");

        agent.sync_target();
        let (live, target) = agent.parameter_snapshot();
        assert_eq!(live, target, "target must be bit-identical right after sync");

        agent.train_step().unwrap();
        let (live, target) = agent.parameter_snapshot();
        assert_ne!(live, target, "target must not follow the live network between syncs");
    }

    #[test]
    fn test_target_syncs_on_interval() {
        let config = DqnConfig {
            target_update_interval: 6,
            ..small_config()
        };
        let mut agent = DqnAgent::with_seed(config, 4, 2, 5);
        // Steps 1..=4 fill the buffer, step 5 trains without syncing
        for i in 0..5 {
            agent.observe(transition(i, false)).unwrap();
        }
        let (live, target) = agent.parameter_snapshot();
        assert_ne!(live, target);

        // Step 6 trains and syncs
        agent.observe(transition(5, false)).unwrap();
        let (live, target) = agent.parameter_snapshot();
        assert_eq!(live, target);
    }

    #[test]
    fn test_end_episode_reports_mean_loss_per_step() {
        let mut agent = DqnAgent::with_seed(small_config(), 4, 2, 6);
        let mut total = 0.0;
        for i in 0..6 {
            if let Some(loss) = agent.observe(transition(i, i == 5)).unwrap() {
                total += loss;
            }
        }
        let metrics = agent.end_episode().unwrap();
        assert_eq!(metrics.updates, 2);
        assert!((metrics.loss - total / 6.0).abs() < 1e-6);
        assert_eq!(agent.episode_count(), 1);

        // Accumulators reset for the next episode
        let metrics = agent.end_episode().unwrap();
        assert_eq!(metrics.loss, 0.0);
        assert_eq!(metrics.updates, 0);
    }

    #[test]
    fn test_training_state_roundtrip() {
        let mut agent = DqnAgent::with_seed(
            DqnConfig {
                learning_rate: 0.01,
                gamma: 0.95,
                ..small_config()
            },
            4,
            2,
            7,
        );
        agent.set_epsilon(0.42);
        for i in 0..6 {
            agent.observe(transition(i, false)).unwrap();
        }
        agent.end_episode().unwrap();

        let json = agent.training_state_json().unwrap();
        let mut restored = DqnAgent::with_seed(small_config(), 4, 2, 8);
        restored.restore_training_state_json(&json).unwrap();

        assert!((restored.epsilon() - agent.epsilon()).abs() < 1e-12);
        assert_eq!(restored.env_steps(), 6);
        assert_eq!(restored.step_count(), agent.step_count());
        assert_eq!(restored.episode_count(), 1);
    }

    #[test]
    fn test_restore_keeps_own_hyperparameters() {
        let trained = DqnAgent::with_seed(
            DqnConfig {
                learning_rate: 0.01,
                replay_capacity: 32,
                ..small_config()
            },
            4,
            2,
            11,
        );
        let json = trained.training_state_json().unwrap();

        let mut resumed = DqnAgent::with_seed(
            DqnConfig {
                learning_rate: 5e-4,
                ..small_config()
            },
            4,
            2,
            12,
        );
        resumed.restore_training_state_json(&json).unwrap();
        assert_eq!(resumed.config().learning_rate, 5e-4);
        assert_eq!(resumed.config().replay_capacity, 64);
        assert!((resumed.epsilon() - trained.epsilon()).abs() < 1e-12);
    }

    #[test]
    fn test_weights_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut agent = DqnAgent::with_seed(small_config(), 4, 2, 9);
        for i in 0..6 {
            agent.observe(transition(i, false)).unwrap();
        }
        agent.save_to_dir(dir.path()).unwrap();
        assert!(dir.path().join("q_network.mpk").exists());
        assert!(dir.path().join("target_network.mpk").exists());

        let mut loaded = DqnAgent::with_seed(small_config(), 4, 2, 10);
        loaded.load_from_dir(dir.path()).unwrap();
        assert_eq!(loaded.parameter_snapshot(), agent.parameter_snapshot());
    }
}
