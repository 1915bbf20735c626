//! Error types for the diffusion engine.

use socnet_graph::GraphError;
use thiserror::Error;

/// Malformed or missing mechanism parameters.
///
/// Raised while building a protocol or starting a simulation, never once
/// iterations are running.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("bad configuration: {0}")]
    BadConfiguration(String),

    #[error("missing mechanism: {0}")]
    MissingMechanism(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to load configuration input: {0}")]
    Load(#[from] LoadError),
}

impl ConfigError {
    pub(crate) fn bad(message: impl Into<String>) -> Self {
        ConfigError::BadConfiguration(message.into())
    }
}

/// Failures while reading input files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },
}

/// Errors surfaced by the simulation driver.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("simulation already stopped")]
    AlreadyStopped,

    #[error("invalid checkpoint: {0}")]
    InvalidCheckpoint(String),
}

/// Errors writing or reading simulation checkpoints.
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
