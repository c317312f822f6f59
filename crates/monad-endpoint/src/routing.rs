//! Routing service contract
//!
//! Read-only description calls against the HTTP routing layer. Listings are
//! paginated; callers follow `next_token` until it is `None`.

use crate::error::LookupError;
use serde::Serialize;

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Token for the next page, `None` on the last page
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    /// Single, final page
    #[inline]
    #[must_use]
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }

    /// Page followed by `next_token`
    #[inline]
    #[must_use]
    pub fn with_next(items: Vec<T>, next_token: impl Into<String>) -> Self {
        Self {
            items,
            next_token: Some(next_token.into()),
        }
    }
}

/// Custom domain known to the routing service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainName {
    /// Fully qualified domain name
    pub domain_name: String,
}

/// Binding of a custom domain to an API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiMapping {
    /// API the domain routes to
    pub api_id: String,
}

/// API description
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiDescription {
    /// Human readable API name
    pub name: String,
    /// Generated default endpoint, e.g. `https://abc123.execute-api.us-west-2.amazonaws.com`
    pub api_endpoint: String,
}

/// HTTP routing description service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RoutingService: Send + Sync {
    /// List custom domain names
    async fn list_domain_names(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<DomainName>, LookupError>;

    /// List API mappings of one custom domain
    async fn list_api_mappings(
        &self,
        domain_name: &str,
        next_token: Option<String>,
    ) -> Result<Page<ApiMapping>, LookupError>;

    /// Describe one API
    async fn get_api(&self, api_id: &str) -> Result<ApiDescription, LookupError>;
}
