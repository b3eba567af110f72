//! Error types for the simspawn client

use simspawn_core::SimError;
use std::path::PathBuf;
use thiserror::Error;

/// simspawn result type
pub type Result<T> = std::result::Result<T, SpawnerError>;

/// Errors that can occur outside a single service call
#[derive(Error, Debug)]
pub enum SpawnerError {
    /// Model lifecycle error (invalid input, remote failure, timeout)
    #[error(transparent)]
    Sim(#[from] SimError),

    /// WebSocket error while attaching to or leaving the bridge
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Robot description file missing or unreadable
    #[error("Cannot read model description {path}: {source}")]
    Description {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl SpawnerError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
