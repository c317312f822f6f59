//! Error types for endpoint resolution

/// Failure reported by a routing service client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct LookupError {
    /// Service-provided description
    pub message: String,
}

impl LookupError {
    /// Create lookup error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Errors while resolving a gateway endpoint
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    /// A routing description call failed
    #[error("{operation} failed: {source}")]
    Lookup {
        operation: &'static str,
        #[source]
        source: LookupError,
    },

    /// A routing description call did not answer in time
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },
}

impl EndpointError {
    /// Create lookup error for operation
    pub fn lookup(operation: &'static str, source: LookupError) -> Self {
        Self::Lookup { operation, source }
    }
}

/// Result type alias for endpoint operations
pub type EndpointResult<T> = Result<T, EndpointError>;
