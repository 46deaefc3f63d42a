mod manager;
mod metadata;

pub use manager::{AgentCheckpointData, CheckpointManager, CheckpointManagerConfig};
pub use metadata::{
    CheckpointHyperparameters, CheckpointMetadata, CheckpointMetrics, DqnTrainingState,
    ReinforceTrainingState,
};
