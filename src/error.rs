use std::path::PathBuf;

/// Errors raised by an environment.
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error("action {action} is outside the action space (n = {num_actions})")]
    InvalidAction { action: usize, num_actions: usize },

    #[error("environment must be reset before stepping")]
    NeedsReset,
}

/// Errors that can occur during checkpoint operations.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("checkpoint directory not found: {0}")]
    DirNotFound(PathBuf),

    #[error("no 'latest' symlink found in {0}")]
    NoLatestSymlink(PathBuf),

    #[error("failed to read metadata from {path}: {source}")]
    MetadataRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse metadata from {path}: {source}")]
    MetadataParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("checkpoint series '{found}' does not match agent series '{expected}'")]
    SeriesMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("failed to save model: {0}")]
    ModelSave(String),

    #[error("failed to load model: {0}")]
    ModelLoad(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors reading or writing a run history file.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("failed to read run history from {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write run history to {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse run history from {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("failed to serialize run history: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Errors that can occur during training.
#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("cannot update policy from an empty trajectory")]
    EmptyTrajectory,

    #[error("requested {requested} transitions but the buffer holds {available}")]
    InsufficientSamples { requested: usize, available: usize },

    #[error("tensor data extraction failed: {0}")]
    TensorData(String),

    #[error("environment error: {0}")]
    Env(#[from] EnvError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("history error: {0}")]
    History(#[from] HistoryError),
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}
