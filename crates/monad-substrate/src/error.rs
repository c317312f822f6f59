//! Error types for substrate resolution
//!
//! Provides error handling for:
//! - Parameter store fetches (missing parameter, access denied, decryption)
//! - Document parsing (malformed `KEY=VALUE` text)
//! - Lookups of keys the caller requires

/// Failures reported by a parameter store client
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No parameter exists at the path
    #[error("parameter not found")]
    NotFound,

    /// Caller lacks permission to read the parameter
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// Parameter exists but could not be decrypted
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// Network or service failure
    #[error("transport error: {0}")]
    Transport(String),
}

/// Malformed line in a `KEY=VALUE` document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct DocumentError {
    /// 1-based line number
    pub line: usize,
    /// What was wrong with the line
    pub message: String,
}

impl DocumentError {
    /// Create error for line
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Errors while resolving a substrate
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubstrateError {
    /// Parameter store could not serve the document
    #[error("failed to fetch {path}: {source}")]
    ConfigFetch {
        path: String,
        #[source]
        source: StoreError,
    },

    /// Parameter store did not answer in time
    #[error("timed out fetching {path} after {timeout_ms}ms")]
    FetchTimeout { path: String, timeout_ms: u64 },

    /// Fetched document is not well-formed `KEY=VALUE` text
    #[error("malformed document at {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: DocumentError,
    },

    /// A key the caller depends on is absent from the merged config
    #[error("required key missing from substrate: {0}")]
    MissingKey(String),
}

impl SubstrateError {
    /// Create fetch error for path
    pub fn fetch(path: impl Into<String>, source: StoreError) -> Self {
        Self::ConfigFetch {
            path: path.into(),
            source,
        }
    }

    /// Create parse error for path
    pub fn parse(path: impl Into<String>, source: DocumentError) -> Self {
        Self::ConfigParse {
            path: path.into(),
            source,
        }
    }

    /// Whether the error points at bad configuration rather than an unreachable store
    #[inline]
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Self::ConfigParse { .. } | Self::MissingKey(_))
    }
}

/// Result type alias for substrate operations
pub type SubstrateResult<T> = Result<T, SubstrateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_display() {
        let err = SubstrateError::fetch("/bkeane/substrate/ager", StoreError::NotFound);
        assert_eq!(
            err.to_string(),
            "failed to fetch /bkeane/substrate/ager: parameter not found"
        );
    }

    #[test]
    fn parse_error_display() {
        let err = SubstrateError::parse("/x", DocumentError::new(3, "missing '='"));
        assert_eq!(err.to_string(), "malformed document at /x: line 3: missing '='");
    }

    #[test]
    fn configuration_error_classification() {
        assert!(SubstrateError::MissingKey("A".into()).is_configuration_error());
        assert!(!SubstrateError::fetch("/x", StoreError::AccessDenied("no".into()))
            .is_configuration_error());
    }
}
