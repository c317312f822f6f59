//! Error types for identity resolution

use std::path::{Path, PathBuf};

/// Errors while deriving a resource identity
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityError {
    /// Origin URL does not have the `host/org/repo` shape
    #[error("cannot parse origin url '{url}': {reason}")]
    MetadataParse { url: String, reason: String },

    /// Version control metadata could not be read
    #[error("cannot read git metadata at {path}: {message}")]
    VcsRead { path: PathBuf, message: String },

    /// Function path has no final segment to name resources after
    #[error("function path has no base name: {0}")]
    InvalidFunctionPath(PathBuf),

    /// Caller account lookup failed
    #[error("caller identity lookup failed: {0}")]
    CallerIdentity(String),

    /// Collaborator did not answer in time
    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },
}

impl IdentityError {
    /// Create metadata parse error for url
    pub fn metadata_parse(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MetadataParse {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Create VCS read error for path
    pub fn vcs_read(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::VcsRead {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Whether the error points at bad configuration rather than a failing collaborator
    #[inline]
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::MetadataParse { .. } | Self::InvalidFunctionPath(_)
        )
    }
}

/// Result type alias for identity operations
pub type IdentityResult<T> = Result<T, IdentityError>;
