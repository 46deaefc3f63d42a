use std::collections::VecDeque;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::HistoryError;

/// Outcome of a single training episode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    pub episode: usize,
    pub total_reward: f32,
    pub loss: f32,
    pub length: usize,
}

/// Training metrics tracker with rolling window computations.
pub struct TrainingMetrics {
    rewards: VecDeque<f32>,
    losses: VecDeque<f32>,
    lengths: VecDeque<usize>,
    capacity: usize,
    total_episodes: usize, // lifetime count, never capped
}

impl TrainingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TrainingMetrics {
            rewards: VecDeque::with_capacity(capacity),
            losses: VecDeque::with_capacity(capacity),
            lengths: VecDeque::with_capacity(capacity),
            capacity,
            total_episodes: 0,
        }
    }

    pub fn record_episode(&mut self, record: &EpisodeRecord) {
        self.total_episodes += 1;
        push_capped(&mut self.rewards, record.total_reward, self.capacity);
        push_capped(&mut self.losses, record.loss, self.capacity);
        push_capped(&mut self.lengths, record.length, self.capacity);
    }

    /// Mean episode reward over the last N episodes.
    pub fn mean_reward(&self, last_n: usize) -> f32 {
        mean_of_last(self.rewards.iter().copied(), self.rewards.len(), last_n)
    }

    /// Mean per-episode loss over the last N episodes.
    pub fn mean_loss(&self, last_n: usize) -> f32 {
        mean_of_last(self.losses.iter().copied(), self.losses.len(), last_n)
    }

    /// Mean episode length over the last N episodes.
    pub fn mean_length(&self, last_n: usize) -> f32 {
        mean_of_last(
            self.lengths.iter().map(|&l| l as f32),
            self.lengths.len(),
            last_n,
        )
    }

    pub fn total_episodes(&self) -> usize {
        self.total_episodes
    }
}

fn push_capped<T>(window: &mut VecDeque<T>, value: T, capacity: usize) {
    window.push_back(value);
    if window.len() > capacity {
        window.pop_front();
    }
}

fn mean_of_last<I>(values: I, len: usize, last_n: usize) -> f32
where
    I: DoubleEndedIterator<Item = f32>,
{
    let n = len.min(last_n);
    if n == 0 {
        return 0.0;
    }
    values.rev().take(n).sum::<f32>() / n as f32
}

/// Every episode of one training run, kept for plotting.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunHistory {
    pub algorithm: String,
    pub records: Vec<EpisodeRecord>,
}

impl RunHistory {
    pub fn new(algorithm: impl Into<String>) -> Self {
        RunHistory {
            algorithm: algorithm.into(),
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: EpisodeRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn rewards(&self) -> impl Iterator<Item = f32> + '_ {
        self.records.iter().map(|r| r.total_reward)
    }

    pub fn losses(&self) -> impl Iterator<Item = f32> + '_ {
        self.records.iter().map(|r| r.loss)
    }

    pub fn best_reward(&self) -> Option<f32> {
        self.rewards().reduce(f32::max)
    }

    pub fn save(&self, path: &Path) -> Result<(), HistoryError> {
        let write_err = |source| HistoryError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(write_err)
    }

    pub fn load(path: &Path) -> Result<Self, HistoryError> {
        let json = std::fs::read_to_string(path).map_err(|source| HistoryError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| HistoryError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
