//! Training infrastructure: episode rollouts, the trainer loop, replay
//! buffer, and rolling metrics with the per-run history.

pub mod episode;
pub mod metrics;
pub mod replay_buffer;
pub mod trainer;

pub use metrics::{EpisodeRecord, RunHistory, TrainingMetrics};
pub use trainer::{Trainer, TrainerConfig};
