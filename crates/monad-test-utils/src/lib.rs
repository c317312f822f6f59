//! Testing utilities for Monad workspace
//!
//! In-memory collaborators with call counters, plus fixture helpers.

#![allow(missing_docs)]

use monad_endpoint::{ApiDescription, ApiMapping, DomainName, LookupError, Page, RoutingService};
use monad_identity::{
    AccountId, CallerIdentity, IdentityError, IdentityResult, VcsReader, VcsSnapshot,
};
use monad_substrate::{ParameterStore, StoreError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Install a fmt subscriber filtered by `RUST_LOG`, defaulting to `warn`
///
/// Safe to call from every test.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Render key/value pairs as a dotenv document, double-quoting every value
pub fn dotenv(pairs: &[(&str, &str)]) -> String {
    pairs
        .iter()
        .map(|(k, v)| format!("{k}=\"{v}\"\n"))
        .collect()
}

#[derive(Debug, Default)]
pub struct InMemoryParameterStore {
    values: HashMap<String, Result<String, StoreError>>,
    delay: Option<Duration>,
    fetched: Mutex<Vec<String>>,
}

impl InMemoryParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parameter(mut self, path: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(path.into(), Ok(value.into()));
        self
    }

    pub fn with_error(mut self, path: impl Into<String>, error: StoreError) -> Self {
        self.values.insert(path.into(), Err(error));
        self
    }

    /// Sleep before answering every fetch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().len()
    }

    /// Paths fetched so far, in call order
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().clone()
    }
}

#[async_trait::async_trait]
impl ParameterStore for InMemoryParameterStore {
    async fn get_parameter(&self, path: &str) -> Result<String, StoreError> {
        self.fetched.lock().push(path.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.values
            .get(path)
            .cloned()
            .unwrap_or(Err(StoreError::NotFound))
    }
}

#[derive(Debug)]
pub struct StaticVcsReader {
    snapshot: Result<VcsSnapshot, IdentityError>,
    opened: Mutex<Vec<PathBuf>>,
}

impl StaticVcsReader {
    pub fn new(snapshot: VcsSnapshot) -> Self {
        Self {
            snapshot: Ok(snapshot),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: IdentityError) -> Self {
        Self {
            snapshot: Err(error),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn open_count(&self) -> usize {
        self.opened.lock().len()
    }
}

#[async_trait::async_trait]
impl VcsReader for StaticVcsReader {
    async fn open(&self, path: &Path) -> IdentityResult<VcsSnapshot> {
        self.opened.lock().push(path.to_path_buf());
        self.snapshot.clone()
    }
}

/// Snapshot of a clean checkout
pub fn snapshot(origin_url: &str, branch: &str, commit: &str) -> VcsSnapshot {
    VcsSnapshot {
        origin_url: origin_url.to_string(),
        branch: branch.to_string(),
        commit: commit.to_string(),
        dirty: false,
    }
}

#[derive(Debug)]
pub struct StaticCallerIdentity {
    account: AccountId,
    calls: AtomicUsize,
}

impl StaticCallerIdentity {
    pub fn new(account: &str) -> Self {
        Self {
            account: AccountId::new(account),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CallerIdentity for StaticCallerIdentity {
    async fn account_id(&self) -> IdentityResult<AccountId> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.account.clone())
    }
}

/// Routing service over a fixed set of domains and APIs
///
/// Listings are split into pages of `page_size`; the continuation token is
/// the offset of the next page.
#[derive(Debug)]
pub struct InMemoryRouting {
    domains: Vec<(String, Vec<String>)>,
    apis: HashMap<String, ApiDescription>,
    page_size: usize,
    domain_listings: AtomicUsize,
    mapping_listings: AtomicUsize,
    describes: AtomicUsize,
}

impl Default for InMemoryRouting {
    fn default() -> Self {
        Self {
            domains: Vec::new(),
            apis: HashMap::new(),
            page_size: 25,
            domain_listings: AtomicUsize::new(0),
            mapping_listings: AtomicUsize::new(0),
            describes: AtomicUsize::new(0),
        }
    }
}

impl InMemoryRouting {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a domain mapped to `api_ids`
    pub fn with_domain(mut self, domain: impl Into<String>, api_ids: &[&str]) -> Self {
        self.domains.push((
            domain.into(),
            api_ids.iter().map(|id| (*id).to_string()).collect(),
        ));
        self
    }

    pub fn with_api(mut self, api_id: &str, name: &str, api_endpoint: &str) -> Self {
        self.apis.insert(
            api_id.to_string(),
            ApiDescription {
                name: name.to_string(),
                api_endpoint: api_endpoint.to_string(),
            },
        );
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn domain_listings(&self) -> usize {
        self.domain_listings.load(Ordering::SeqCst)
    }

    pub fn mapping_listings(&self) -> usize {
        self.mapping_listings.load(Ordering::SeqCst)
    }

    pub fn describes(&self) -> usize {
        self.describes.load(Ordering::SeqCst)
    }

    fn page<T: Clone>(&self, items: &[T], token: Option<String>) -> Result<Page<T>, LookupError> {
        let start = match token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| LookupError::new(format!("invalid next token '{token}'")))?,
            None => 0,
        };
        let end = (start + self.page_size).min(items.len());
        let slice = items.get(start..end).unwrap_or_default().to_vec();
        if end < items.len() {
            Ok(Page::with_next(slice, end.to_string()))
        } else {
            Ok(Page::last(slice))
        }
    }
}

#[async_trait::async_trait]
impl RoutingService for InMemoryRouting {
    async fn list_domain_names(
        &self,
        next_token: Option<String>,
    ) -> Result<Page<DomainName>, LookupError> {
        self.domain_listings.fetch_add(1, Ordering::SeqCst);
        let names: Vec<DomainName> = self
            .domains
            .iter()
            .map(|(domain_name, _)| DomainName {
                domain_name: domain_name.clone(),
            })
            .collect();
        self.page(&names, next_token)
    }

    async fn list_api_mappings(
        &self,
        domain_name: &str,
        next_token: Option<String>,
    ) -> Result<Page<ApiMapping>, LookupError> {
        self.mapping_listings.fetch_add(1, Ordering::SeqCst);
        let mappings: Vec<ApiMapping> = self
            .domains
            .iter()
            .find(|(name, _)| name == domain_name)
            .map(|(_, ids)| {
                ids.iter()
                    .map(|id| ApiMapping { api_id: id.clone() })
                    .collect()
            })
            .ok_or_else(|| LookupError::new(format!("domain {domain_name} not found")))?;
        self.page(&mappings, next_token)
    }

    async fn get_api(&self, api_id: &str) -> Result<ApiDescription, LookupError> {
        self.describes.fetch_add(1, Ordering::SeqCst);
        self.apis
            .get(api_id)
            .cloned()
            .ok_or_else(|| LookupError::new(format!("api {api_id} not found")))
    }
}
