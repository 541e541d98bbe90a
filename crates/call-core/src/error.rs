//! Error types for the call core
//!
//! Ring decisions, route selection and coordinator actions never fail: they
//! always produce a decision, a route or an [`ActionOutcome`]. The errors here
//! only come from the edges of the crate: loading configuration, installing
//! the log subscriber and talking to an event loop that has already stopped.
//!
//! [`ActionOutcome`]: crate::events::ActionOutcome

use thiserror::Error;

/// Result type for call core operations
pub type CallCoreResult<T> = Result<T, CallCoreError>;

/// Errors that can occur at the edges of the call core
#[derive(Debug, Error)]
pub enum CallCoreError {
    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Reading a configuration or scenario file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration or scenario JSON could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The coordinator event loop is no longer running
    #[error("Call event loop has stopped")]
    EventLoopClosed,

    /// The tracing subscriber could not be installed
    #[error("Logging setup failed: {message}")]
    Logging { message: String },
}

impl CallCoreError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a logging setup error
    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }
}
