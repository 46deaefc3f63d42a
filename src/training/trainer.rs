use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::ai::{RandomAgent, TrainableAgent};
use crate::checkpoint::{CheckpointManager, CheckpointManagerConfig, CheckpointMetrics};
use crate::env::Environment;
use crate::error::TrainingError;
use crate::training::episode::{run_eval_episode, run_training_episode, run_warmup};
use crate::training::metrics::{RunHistory, TrainingMetrics};

/// Trainer configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    pub num_episodes: usize,
    pub max_steps_per_episode: usize,
    /// Episodes between progress lines; also the rolling window size.
    pub log_interval: usize,
    /// Episodes between greedy evaluations (0 disables).
    pub eval_interval: usize,
    pub eval_episodes: usize,
    /// Episodes between checkpoints (0 disables).
    pub checkpoint_interval: usize,
    pub history_path: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            num_episodes: 200,
            max_steps_per_episode: 700,
            log_interval: 10,
            eval_interval: 50,
            eval_episodes: 5,
            checkpoint_interval: 50,
            history_path: Some(PathBuf::from("history.json")),
            seed: None,
        }
    }
}

/// Episode-loop driver shared by every trainable agent.
pub struct Trainer {
    config: TrainerConfig,
    checkpoint_manager: Option<CheckpointManager>,
    rng: StdRng,
}

impl Trainer {
    pub fn new(config: TrainerConfig, checkpoint_config: CheckpointManagerConfig) -> Self {
        let checkpoint_manager =
            (config.checkpoint_interval > 0).then(|| CheckpointManager::new(checkpoint_config));
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Trainer {
            config,
            checkpoint_manager,
            rng,
        }
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Run warm-up then the full training loop, returning every episode's record.
    pub fn train(
        &mut self,
        env: &mut dyn Environment,
        agent: &mut dyn TrainableAgent,
    ) -> Result<RunHistory, TrainingError> {
        let window = self.config.log_interval.max(1);
        let mut metrics = TrainingMetrics::with_capacity(window);
        let mut history = RunHistory::new(agent.name());

        let start_episode = agent.episode_count() + 1;
        let end_episode = agent.episode_count() + self.config.num_episodes;

        let mut random = RandomAgent::with_seed(env.action_space(), self.rng.random());
        let warmup = run_warmup(env, agent, &mut random)?;
        if warmup > 0 {
            log::info!("warm-up collected {} random transitions", warmup);
        }

        log::info!(
            "starting {} training for {} episodes (episodes {}..={})",
            agent.name(),
            self.config.num_episodes,
            start_episode,
            end_episode
        );

        for episode in start_episode..=end_episode {
            let record = run_training_episode(
                env,
                agent,
                self.config.max_steps_per_episode,
                episode,
            )?;
            metrics.record_episode(&record);
            history.push(record);

            if episode % window == 0 {
                log::info!(
                    "episode {}/{} | reward: {:.1} | loss: {:.4} | {}: {:.3} | len: {:.1}",
                    episode,
                    end_episode,
                    metrics.mean_reward(window),
                    metrics.mean_loss(window),
                    agent.algorithm_metric_label(),
                    agent.algorithm_metric_value(),
                    metrics.mean_length(window),
                );
            }

            let eval_due = is_due(episode, self.config.eval_interval);
            let checkpoint_due = self.checkpoint_manager.is_some()
                && is_due(episode, self.config.checkpoint_interval);
            if !(eval_due || checkpoint_due) {
                continue;
            }

            // One greedy evaluation serves both the log line and the checkpoint
            let eval_reward = self.evaluate(env, agent)?;
            if eval_due {
                log::info!(
                    "eval ({} episodes): mean reward {:.1}",
                    self.config.eval_episodes,
                    eval_reward
                );
            }
            if checkpoint_due {
                self.save_checkpoint(agent, &metrics, episode, eval_reward);
            }
        }

        log::info!(
            "training complete: {} episodes, best reward {:.1}",
            metrics.total_episodes(),
            history.best_reward().unwrap_or(0.0)
        );

        if let Some(path) = &self.config.history_path {
            history.save(path)?;
            log::info!("history written to {}", path.display());
        }
        Ok(history)
    }

    /// Mean total reward of `eval_episodes` greedy episodes.
    pub fn evaluate(
        &self,
        env: &mut dyn Environment,
        agent: &mut dyn TrainableAgent,
    ) -> Result<f32, TrainingError> {
        let n = self.config.eval_episodes;
        if n == 0 {
            return Ok(0.0);
        }
        let mut total = 0.0;
        for _ in 0..n {
            total += run_eval_episode(env, agent, self.config.max_steps_per_episode)?;
        }
        Ok(total / n as f32)
    }

    /// Write a checkpoint. A failed save is logged and training continues.
    fn save_checkpoint(
        &self,
        agent: &dyn TrainableAgent,
        metrics: &TrainingMetrics,
        episode: usize,
        eval_reward: f32,
    ) {
        let Some(manager) = &self.checkpoint_manager else {
            return;
        };
        let window = self.config.log_interval.max(1);
        let ckpt_metrics = CheckpointMetrics {
            eval_reward,
            mean_reward: metrics.mean_reward(window),
            mean_loss: metrics.mean_loss(window),
            mean_episode_length: metrics.mean_length(window),
            training_steps: agent.step_count(),
        };
        if let Err(e) = manager.save_agent_checkpoint(agent, &ckpt_metrics, episode) {
            log::warn!("checkpoint at episode {} failed: {}", episode, e);
        }
    }
}

/// True on every `interval`-th episode; an interval of 0 never fires.
fn is_due(episode: usize, interval: usize) -> bool {
    interval > 0 && episode % interval == 0
}
