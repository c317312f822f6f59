//! Gateway endpoint resolution
//!
//! Finds the custom domain bound to an API by walking every domain's
//! mapping list, falling back to the API's generated endpoint:
//!
//! ```text
//! list_domain_names ──▶ for each domain ──▶ list_api_mappings(domain)
//!                                            │ contains api_id?
//!                            yes ◀───────────┤
//!                 https://{domain}           │ no match anywhere
//!                                            ▼
//!                                  get_api(api_id).api_endpoint
//! ```
//!
//! Both listings are drained page by page before concluding there is no
//! match. Resolved endpoints are cached per API id for the life of the
//! resolver since bindings do not change during a run.

use crate::error::{EndpointError, EndpointResult, LookupError};
use crate::routing::{ApiDescription, Page, RoutingService};
use moka::future::Cache;
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Resolves the public URL of a gateway API
#[derive(Clone)]
pub struct EndpointResolver {
    routing: Arc<dyn RoutingService>,
    timeout: Duration,
    cache: Cache<String, String>,
}

impl std::fmt::Debug for EndpointResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointResolver")
            .field("timeout", &self.timeout)
            .field("cached", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl EndpointResolver {
    /// Default bound on a single routing call
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create resolver over a routing service
    #[must_use]
    pub fn new(routing: Arc<dyn RoutingService>) -> Self {
        Self {
            routing,
            timeout: Self::DEFAULT_TIMEOUT,
            cache: Cache::new(64),
        }
    }

    /// Bound each routing call by `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Public base URL of `api_id`, without a trailing slash
    ///
    /// # Errors
    /// Returns `EndpointError` if a routing call fails or times out. Not
    /// finding a custom domain is not an error.
    pub async fn resolve(&self, api_id: &str) -> EndpointResult<String> {
        if let Some(cached) = self.cache.get(api_id).await {
            return Ok(cached);
        }

        let endpoint = match self.find_custom_domain(api_id).await? {
            Some(domain) => format!("https://{domain}"),
            None => {
                tracing::debug!("No custom domain maps to {}, using default endpoint", api_id);
                self.describe(api_id).await?.api_endpoint
            }
        };

        tracing::info!("Resolved endpoint for {}: {}", api_id, endpoint);
        self.cache
            .insert(api_id.to_string(), endpoint.clone())
            .await;
        Ok(endpoint)
    }

    /// Name of `api_id`
    ///
    /// # Errors
    /// Returns `EndpointError` if the describe call fails or times out.
    pub async fn gateway_name(&self, api_id: &str) -> EndpointResult<String> {
        Ok(self.describe(api_id).await?.name)
    }

    async fn find_custom_domain(&self, api_id: &str) -> EndpointResult<Option<String>> {
        let mut next_token = None;
        let mut seen = HashSet::new();

        loop {
            let page = self
                .bounded(
                    "get domain names",
                    self.routing.list_domain_names(next_token.take()),
                )
                .await?;

            for domain in page.items {
                tracing::debug!("Checking mappings of {}", domain.domain_name);
                if self.domain_maps_api(&domain.domain_name, api_id).await? {
                    return Ok(Some(domain.domain_name));
                }
            }

            match page.next_token {
                Some(token) => next_token = Some(advance(&mut seen, "get domain names", token)?),
                None => return Ok(None),
            }
        }
    }

    async fn domain_maps_api(&self, domain_name: &str, api_id: &str) -> EndpointResult<bool> {
        let mut next_token = None;
        let mut seen = HashSet::new();

        loop {
            let Page { items, next_token: next } = self
                .bounded(
                    "get api mappings",
                    self.routing.list_api_mappings(domain_name, next_token.take()),
                )
                .await?;

            if items.iter().any(|mapping| mapping.api_id == api_id) {
                return Ok(true);
            }

            match next {
                Some(token) => next_token = Some(advance(&mut seen, "get api mappings", token)?),
                None => return Ok(false),
            }
        }
    }

    async fn describe(&self, api_id: &str) -> EndpointResult<ApiDescription> {
        self.bounded("get api", self.routing.get_api(api_id)).await
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl Future<Output = Result<T, LookupError>>,
    ) -> EndpointResult<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| EndpointError::Timeout {
                operation,
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })?
            .map_err(|e| EndpointError::lookup(operation, e))
    }
}

/// Accept `token` unless the listing already returned it
fn advance(
    seen: &mut HashSet<String>,
    operation: &'static str,
    token: String,
) -> EndpointResult<String> {
    if seen.insert(token.clone()) {
        Ok(token)
    } else {
        Err(EndpointError::lookup(
            operation,
            LookupError::new(format!("next token '{token}' repeated")),
        ))
    }
}
