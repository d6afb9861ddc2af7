//! Error types for the knowledge-store layer

use thiserror::Error;

/// Result type for knowledge-store operations
pub type Result<T> = std::result::Result<T, UksError>;

/// Errors that can occur while configuring the knowledge store
#[derive(Error, Debug)]
pub enum UksError {
    /// Invalid store configuration
    #[error("Invalid knowledge-store configuration: {reason}")]
    InvalidConfiguration {
        /// Reason for invalid configuration
        reason: String,
    },

    /// Engine-level error surfaced during construction
    #[error("Engine error: {source}")]
    Core {
        #[from]
        /// Source engine error
        source: corticon_core::CoreError,
    },
}

impl UksError {
    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}
