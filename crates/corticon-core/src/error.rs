//! Error types for the tick engine

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur while configuring the engine
///
/// The engine itself never fails mid-tick; errors are confined to parameter
/// and configuration validation. Out-of-range ids passed to injection or
/// probe operations degrade silently instead.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Invalid parameter value
    #[error("Invalid parameter {parameter}: {value} (expected {constraint})")]
    InvalidParameter {
        /// Parameter name
        parameter: String,
        /// Invalid value
        value: String,
        /// Constraint description
        constraint: String,
    },

    /// Invalid engine configuration
    #[error("Invalid engine configuration: {reason}")]
    InvalidConfiguration {
        /// Reason for invalid configuration
        reason: String,
    },
}

impl CoreError {
    /// Create an invalid parameter error
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl Into<String>,
        constraint: impl Into<String>,
    ) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
            constraint: constraint.into(),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CoreError::invalid_parameter("threshold", "0", ">= 1");
        assert!(matches!(err, CoreError::InvalidParameter { .. }));

        let err = CoreError::invalid_config("razor cap of zero");
        assert!(matches!(err, CoreError::InvalidConfiguration { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = CoreError::invalid_parameter("leak", "-3", ">= 0");
        let msg = format!("{}", err);
        assert!(msg.contains("leak"));
        assert!(msg.contains(">= 0"));
    }
}
