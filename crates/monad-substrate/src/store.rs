//! Parameter store client contract
//!
//! The resolver only needs `get(path) -> text`. Implementations wrap a
//! hosted parameter service and must return decrypted values.

use crate::error::StoreError;

/// Hierarchical parameter store
///
/// Implement this trait to back substrate resolution with a real service.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ParameterStore: Send + Sync {
    /// Fetch the decrypted value stored at `path`
    async fn get_parameter(&self, path: &str) -> Result<String, StoreError>;
}

/// Conventional parameter paths for substrates and their feature overlays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterLayout {
    prefix: String,
}

impl ParameterLayout {
    /// Default prefix under which substrates are stored
    pub const DEFAULT_PREFIX: &'static str = "/bkeane/substrate";

    /// Create layout rooted at `prefix`; a trailing `/` is ignored
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        let mut prefix = prefix.into();
        while prefix.ends_with('/') {
            prefix.pop();
        }
        Self { prefix }
    }

    /// Path of the substrate baseline document
    #[must_use]
    pub fn substrate_path(&self, substrate: &str) -> String {
        format!("{}/{}", self.prefix, substrate)
    }

    /// Path of a feature overlay document
    #[must_use]
    pub fn feature_path(&self, substrate: &str, feature: &str) -> String {
        format!("{}/{}/{}", self.prefix, substrate, feature)
    }
}

impl Default for ParameterLayout {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PREFIX)
    }
}
