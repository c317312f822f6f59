//! Error types for verification expectations
//!
//! Every error is fatal for the accessor that raised it: nothing is
//! retried here and no partial values are returned.

use monad_endpoint::EndpointError;
use monad_identity::IdentityError;
use monad_substrate::SubstrateError;
use std::path::PathBuf;

/// Main expectations error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum ExpectError {
    /// A required external input is absent
    #[error("{0} is required")]
    MissingInput(&'static str),

    /// An optional setting has an unusable value
    #[error("invalid value for {name}: '{value}'")]
    InvalidSetting { name: &'static str, value: String },

    /// Substrate resolution failed
    #[error("substrate error: {0}")]
    Substrate(#[from] SubstrateError),

    /// Identity resolution failed
    #[error("identity error: {0}")]
    Identity(#[from] IdentityError),

    /// Endpoint resolution failed
    #[error("endpoint error: {0}")]
    Endpoint(#[from] EndpointError),

    /// Function directory could not be listed
    #[error("io error reading {path}: {message}")]
    Io { path: PathBuf, message: String },

    /// Snapshot could not be rendered
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ExpectError {
    /// Whether the error is a configuration-contract violation rather than
    /// a collaborator failure
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        match self {
            Self::MissingInput(_) | Self::InvalidSetting { .. } => true,
            Self::Substrate(e) => e.is_configuration_error(),
            Self::Identity(e) => e.is_configuration_error(),
            Self::Endpoint(_) | Self::Io { .. } | Self::Serialization(_) => false,
        }
    }
}

/// Result type alias for expectation accessors
pub type ExpectResult<T> = Result<T, ExpectError>;

#[cfg(test)]
mod tests {
    use super::*;
    use monad_substrate::StoreError;

    #[test]
    fn missing_input_display() {
        let err = ExpectError::MissingInput("SUBSTRATE_NAME");
        assert_eq!(err.to_string(), "SUBSTRATE_NAME is required");
        assert!(err.is_configuration_error());
    }

    #[test]
    fn error_conversions() {
        let err: ExpectError = SubstrateError::fetch("/x", StoreError::NotFound).into();
        assert!(matches!(err, ExpectError::Substrate(_)));
        assert!(!err.is_configuration_error());

        let err: ExpectError = IdentityError::metadata_parse("u", "bad").into();
        assert!(err.is_configuration_error());
    }
}
