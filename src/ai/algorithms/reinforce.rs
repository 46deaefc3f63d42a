use std::error::Error;
use std::path::Path;

use burn::backend::{Autodiff, NdArray};
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{AdamW, AdamWConfig, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::record::DefaultRecorder;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ai::agent::{Agent, TrainableAgent, Transition, UpdateMetrics};
use crate::ai::encoding::{
    action_mask, column, encode_observation, encode_observations, to_scalar, to_vec,
};
use crate::ai::exploration::argmax;
use crate::ai::networks::{PolicyNetwork, PolicyNetworkConfig, ValueNetwork, ValueNetworkConfig};
use crate::ai::returns::{discounted_returns, normalize_returns};
use crate::checkpoint::{CheckpointHyperparameters, ReinforceTrainingState};
use crate::env::Observation;
use crate::error::TrainingError;

type InferBackend = NdArray<f32>;
type TrainBackend = Autodiff<InferBackend>;

/// REINFORCE hyperparameters.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ReinforceConfig {
    pub learning_rate: f64,
    pub weight_decay: f32,
    pub gamma: f32,
    pub hidden_sizes: Vec<usize>,
    /// Standardize returns within each episode before weighting.
    pub normalize_returns: bool,
    /// Train a value network and subtract its estimate from the returns.
    pub baseline: bool,
    pub baseline_learning_rate: f64,
    pub baseline_hidden_sizes: Vec<usize>,
}

impl Default for ReinforceConfig {
    fn default() -> Self {
        ReinforceConfig {
            learning_rate: 5e-3,
            weight_decay: 0.01,
            gamma: 0.995,
            hidden_sizes: vec![16, 16],
            normalize_returns: false,
            baseline: false,
            baseline_learning_rate: 5e-3,
            baseline_hidden_sizes: vec![16, 16],
        }
    }
}

/// One step of the in-flight episode.
#[derive(Debug, Clone)]
struct TrajectoryStep {
    observation: Observation,
    action: usize,
    reward: f32,
}

struct Baseline {
    network: ValueNetwork<TrainBackend>,
    optimizer: OptimizerAdaptor<AdamW, ValueNetwork<TrainBackend>, TrainBackend>,
    net_config: ValueNetworkConfig,
}

/// Monte-Carlo policy-gradient agent, optionally with a learned value baseline.
pub struct ReinforceAgent {
    policy: PolicyNetwork<TrainBackend>,
    optimizer: OptimizerAdaptor<AdamW, PolicyNetwork<TrainBackend>, TrainBackend>,
    net_config: PolicyNetworkConfig,
    baseline: Option<Baseline>,
    trajectory: Vec<TrajectoryStep>,
    config: ReinforceConfig,
    device: <TrainBackend as Backend>::Device,
    num_actions: usize,
    episode_count: usize,
    step_count: usize,
    last_entropy: f32,
    rng: StdRng,
}

impl ReinforceAgent {
    pub fn new(config: ReinforceConfig, observation_size: usize, num_actions: usize) -> Self {
        Self::build(config, observation_size, num_actions, StdRng::from_os_rng())
    }

    pub fn with_seed(
        config: ReinforceConfig,
        observation_size: usize,
        num_actions: usize,
        seed: u64,
    ) -> Self {
        Self::build(config, observation_size, num_actions, StdRng::seed_from_u64(seed))
    }

    fn build(
        config: ReinforceConfig,
        observation_size: usize,
        num_actions: usize,
        rng: StdRng,
    ) -> Self {
        let device = Default::default();
        let net_config = PolicyNetworkConfig::new(observation_size, num_actions)
            .with_hidden_sizes(config.hidden_sizes.clone());
        let policy = net_config.init(&device);
        let optimizer = AdamWConfig::new()
            .with_weight_decay(config.weight_decay)
            .init();

        let baseline = config.baseline.then(|| {
            let net_config = ValueNetworkConfig::new(observation_size)
                .with_hidden_sizes(config.baseline_hidden_sizes.clone());
            Baseline {
                network: net_config.init(&device),
                optimizer: AdamWConfig::new()
                    .with_weight_decay(config.weight_decay)
                    .init(),
                net_config,
            }
        });

        ReinforceAgent {
            policy,
            optimizer,
            net_config,
            baseline,
            trajectory: Vec::new(),
            config,
            device,
            num_actions,
            episode_count: 0,
            step_count: 0,
            last_entropy: 0.0,
            rng,
        }
    }

    /// Action probabilities of the current policy for one observation.
    pub fn action_probs(&self, observation: &[f32]) -> Result<Vec<f32>, TrainingError> {
        let input = encode_observation::<InferBackend>(observation, &self.device);
        to_vec(self.policy.valid().forward(input))
    }

    /// Value estimate of the baseline, if one is trained.
    pub fn value_estimate(&self, observation: &[f32]) -> Result<Option<f32>, TrainingError> {
        match &self.baseline {
            Some(baseline) => {
                let input = encode_observation::<InferBackend>(observation, &self.device);
                to_scalar(baseline.network.valid().forward(input)).map(Some)
            }
            None => Ok(None),
        }
    }

    pub fn trajectory_len(&self) -> usize {
        self.trajectory.len()
    }

    pub fn has_baseline(&self) -> bool {
        self.baseline.is_some()
    }

    pub fn config(&self) -> &ReinforceConfig {
        &self.config
    }

    /// One policy-gradient step over the finished episode.
    fn update(&mut self) -> Result<UpdateMetrics, TrainingError> {
        if self.trajectory.is_empty() {
            return Err(TrainingError::EmptyTrajectory);
        }

        let rewards: Vec<f32> = self.trajectory.iter().map(|s| s.reward).collect();
        let mut returns = discounted_returns(&rewards, self.config.gamma);
        if self.config.normalize_returns {
            normalize_returns(&mut returns);
        }

        let observations: Vec<&[f32]> = self
            .trajectory
            .iter()
            .map(|s| s.observation.as_slice())
            .collect();
        let actions: Vec<usize> = self.trajectory.iter().map(|s| s.action).collect();
        let inputs = encode_observations::<TrainBackend, _>(&observations, &self.device);

        let (weights, value_loss) = match self.baseline.as_mut() {
            Some(baseline) => {
                let (advantages, loss) =
                    fit_baseline(baseline, inputs.clone(), &returns, &self.device, &self.config)?;
                (advantages, Some(loss))
            }
            None => (returns, None),
        };

        let log_probs = self.policy.log_probs(inputs);
        self.last_entropy = mean_entropy(&to_vec(log_probs.clone())?, self.num_actions);

        let mask = action_mask::<TrainBackend>(&actions, self.num_actions, &self.device);
        let selected = (log_probs * mask).sum_dim(1);
        let weights = column::<TrainBackend>(&weights, &self.device);
        let policy_loss = -(selected * weights).sum();
        let loss_val = to_scalar(policy_loss.clone())?;

        let grads = policy_loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.policy);
        self.policy = self
            .optimizer
            .step(self.config.learning_rate, self.policy.clone(), grads);

        self.step_count += 1;
        Ok(UpdateMetrics {
            loss: loss_val,
            value_loss,
            policy_entropy: Some(self.last_entropy),
            updates: 1,
        })
    }

    /// Save network weights to a directory.
    pub fn save_to_dir(&self, dir: &Path) -> Result<(), Box<dyn Error>> {
        let recorder = DefaultRecorder::default();
        self.policy
            .clone()
            .valid()
            .save_file(dir.join("policy_network"), &recorder)?;
        if let Some(baseline) = &self.baseline {
            baseline
                .network
                .clone()
                .valid()
                .save_file(dir.join("value_network"), &recorder)?;
        }
        Ok(())
    }

    /// Load network weights from a directory.
    pub fn load_from_dir(&mut self, dir: &Path) -> Result<(), Box<dyn Error>> {
        let recorder = DefaultRecorder::default();
        let policy: PolicyNetwork<TrainBackend> = self
            .net_config
            .init(&self.device)
            .load_file(dir.join("policy_network"), &recorder, &self.device)?;
        self.policy = policy;

        if let Some(baseline) = self.baseline.as_mut() {
            let network: ValueNetwork<TrainBackend> = baseline
                .net_config
                .init(&self.device)
                .load_file(dir.join("value_network"), &recorder, &self.device)?;
            baseline.network = network;
        }
        Ok(())
    }

    /// Export current training state for checkpointing.
    pub fn training_state(&self) -> ReinforceTrainingState {
        ReinforceTrainingState {
            episode_count: self.episode_count,
            step_count: self.step_count,
        }
    }

    /// Restore episode and update counters from a checkpoint.
    pub fn restore_training_state(&mut self, state: &ReinforceTrainingState) {
        self.episode_count = state.episode_count;
        self.step_count = state.step_count;
    }
}

/// Regress the value network toward the returns and compute advantages
/// against its (detached) predictions.
fn fit_baseline(
    baseline: &mut Baseline,
    inputs: Tensor<TrainBackend, 2>,
    returns: &[f32],
    device: &<TrainBackend as Backend>::Device,
    config: &ReinforceConfig,
) -> Result<(Vec<f32>, f32), TrainingError> {
    let values = baseline.network.forward(inputs);
    let predicted = to_vec(values.clone())?;

    let diff = values - column::<TrainBackend>(returns, device);
    let loss = (diff.clone() * diff).mean();
    let loss_val = to_scalar(loss.clone())?;

    let grads = loss.backward();
    let grads = GradientsParams::from_grads(grads, &baseline.network);
    baseline.network = baseline.optimizer.step(
        config.baseline_learning_rate,
        baseline.network.clone(),
        grads,
    );

    let advantages = returns
        .iter()
        .zip(&predicted)
        .map(|(g, v)| g - v)
        .collect();
    Ok((advantages, loss_val))
}

/// Mean policy entropy from row-major log-probabilities.
fn mean_entropy(log_probs: &[f32], num_actions: usize) -> f32 {
    let rows = log_probs.len() / num_actions.max(1);
    if rows == 0 {
        return 0.0;
    }
    let total: f32 = log_probs
        .chunks(num_actions.max(1))
        .map(|row| -row.iter().map(|lp| lp.exp() * lp).sum::<f32>())
        .sum();
    total / rows as f32
}

/// Sample an action from a categorical distribution defined by probs.
fn sample_categorical<R: Rng>(probs: &[f32], rng: &mut R) -> usize {
    let r: f32 = rng.random_range(0.0..1.0);
    let mut cumulative = 0.0;
    for (i, &p) in probs.iter().enumerate() {
        cumulative += p;
        if r < cumulative {
            return i;
        }
    }
    // Rounding can leave the cumulative sum just below one
    probs
        .iter()
        .rposition(|&p| p > 0.0)
        .unwrap_or(0)
}

impl Agent for ReinforceAgent {
    fn select_action(
        &mut self,
        observation: &[f32],
        training: bool,
    ) -> Result<usize, TrainingError> {
        let probs = self.action_probs(observation)?;
        Ok(if training {
            sample_categorical(&probs, &mut self.rng)
        } else {
            argmax(&probs)
        })
    }

    fn name(&self) -> &str {
        if self.baseline.is_some() {
            "REINFORCE+baseline"
        } else {
            "REINFORCE"
        }
    }
}

impl TrainableAgent for ReinforceAgent {
    fn algorithm_name(&self) -> &str {
        "REINFORCE"
    }

    fn episode_count(&self) -> usize {
        self.episode_count
    }

    fn step_count(&self) -> usize {
        self.step_count
    }

    fn observe(&mut self, transition: Transition) -> Result<Option<f32>, TrainingError> {
        self.trajectory.push(TrajectoryStep {
            observation: transition.state,
            action: transition.action,
            reward: transition.reward,
        });
        Ok(None)
    }

    fn end_episode(&mut self) -> Result<UpdateMetrics, TrainingError> {
        let result = self.update();
        self.trajectory.clear();
        let metrics = result?;
        self.episode_count += 1;
        Ok(metrics)
    }

    fn algorithm_metric_value(&self) -> f32 {
        self.last_entropy
    }

    fn algorithm_metric_label(&self) -> &str {
        "entropy"
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
        let state: ReinforceTrainingState = serde_json::from_str(json)?;
        self.restore_training_state(&state);
        Ok(())
    }

    fn hyperparameters(&self) -> CheckpointHyperparameters {
        CheckpointHyperparameters::Reinforce(self.config.clone())
    }
}
