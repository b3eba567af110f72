//! Error types for simspawn

use std::time::Duration;
use thiserror::Error;

/// Result type for simulator operations
pub type Result<T> = std::result::Result<T, SimError>;

/// Core error type for model lifecycle operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    /// Position did not have exactly three coordinates
    #[error("Invalid position: expected 3 coordinates, got {0}")]
    PositionArity(usize),

    /// A coordinate was NaN or infinite
    #[error("Invalid position: {axis} coordinate is not finite ({value})")]
    NonFiniteCoordinate { axis: char, value: f64 },

    /// Poses only carry identity rotation
    #[error("Unsupported orientation ({x}, {y}, {z}, {w}): only identity is allowed")]
    UnsupportedOrientation { x: f64, y: f64, z: f64, w: f64 },

    /// Model name was empty
    #[error("Invalid model name: {0:?}")]
    InvalidName(String),

    /// Description payload could not be classified
    #[error("Unrecognized model description: {0}")]
    UnknownDescription(String),

    /// The simulator rejected the call or reported an internal error
    #[error("Service call failed: {service}: {message}")]
    Service { service: String, message: String },

    /// The middleware endpoint could not be reached or the link dropped
    #[error("Transport error: {0}")]
    Transport(String),

    /// The peer sent something we could not understand
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Call did not complete in time
    #[error("Service call timed out after {0:?}")]
    Timeout(Duration),
}

impl SimError {
    /// Create a service-level failure
    pub fn service(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Service {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// True for errors raised before any remote call was attempted
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            Self::PositionArity(_)
                | Self::NonFiniteCoordinate { .. }
                | Self::UnsupportedOrientation { .. }
                | Self::InvalidName(_)
                | Self::UnknownDescription(_)
        )
    }
}
