//! Substrate resolution
//!
//! Fetches a substrate baseline plus its feature overlays and folds them
//! left-to-right into one [`SubstrateConfig`]:
//!
//! ```text
//! {prefix}/{substrate} → {prefix}/{substrate}/{f1} → … → {prefix}/{substrate}/{fn}
//!        lowest priority                                  highest priority
//! ```
//!
//! Resolved configs are cached per `(substrate, features)` for the life of
//! the resolver; there is no invalidation.

use crate::capability::{keys, Capabilities};
use crate::document::ConfigDocument;
use crate::error::{SubstrateError, SubstrateResult};
use crate::store::{ParameterLayout, ParameterStore};
use moka::future::Cache;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Merged substrate configuration with its capability set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubstrateConfig {
    name: String,
    features: Vec<String>,
    values: ConfigDocument,
    capabilities: Capabilities,
}

impl SubstrateConfig {
    /// Build from an already merged document
    #[must_use]
    pub fn new(name: impl Into<String>, features: Vec<String>, values: ConfigDocument) -> Self {
        let capabilities = Capabilities::from_document(&values);
        Self {
            name: name.into(),
            features,
            values,
            capabilities,
        }
    }

    /// Substrate name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Feature overlays in the order they were applied
    #[inline]
    #[must_use]
    pub fn features(&self) -> &[String] {
        &self.features
    }

    /// Merged key/value mapping
    #[inline]
    #[must_use]
    pub fn values(&self) -> &ConfigDocument {
        &self.values
    }

    /// Capability gates
    #[inline]
    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Get value by key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key)
    }

    /// Get value by key, failing when absent
    ///
    /// # Errors
    /// Returns `SubstrateError::MissingKey` if the key is not present.
    pub fn require(&self, key: &str) -> SubstrateResult<&str> {
        self.get(key)
            .ok_or_else(|| SubstrateError::MissingKey(key.to_string()))
    }

    /// Gateway API identifier, if configured
    #[inline]
    #[must_use]
    pub fn api_id(&self) -> Option<&str> {
        self.get(keys::APIGATEWAY_ID)
    }

    /// Event bus name, if configured
    #[inline]
    #[must_use]
    pub fn bus_name(&self) -> Option<&str> {
        self.get(keys::EVENTBRIDGE_BUS_NAME)
    }

    /// Subnet ids; empty unless VPC is enabled
    #[must_use]
    pub fn vpc_subnet_ids(&self) -> Vec<String> {
        self.vpc_list(keys::VPC_SUBNET_IDS)
    }

    /// Security group ids; empty unless VPC is enabled
    #[must_use]
    pub fn vpc_security_group_ids(&self) -> Vec<String> {
        self.vpc_list(keys::VPC_SECURITY_GROUP_IDS)
    }

    fn vpc_list(&self, key: &str) -> Vec<String> {
        if !self.capabilities.vpc {
            return Vec::new();
        }
        self.get(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SubstrateKey {
    substrate: String,
    features: Vec<String>,
}

/// Fetches and merges substrate documents from a parameter store
#[derive(Clone)]
pub struct SubstrateResolver {
    store: Arc<dyn ParameterStore>,
    layout: ParameterLayout,
    timeout: Duration,
    cache: Cache<SubstrateKey, Arc<SubstrateConfig>>,
}

impl std::fmt::Debug for SubstrateResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubstrateResolver")
            .field("layout", &self.layout)
            .field("timeout", &self.timeout)
            .field("cached", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl SubstrateResolver {
    /// Default bound on a single parameter fetch
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create resolver with the default layout and timeout
    #[must_use]
    pub fn new(store: Arc<dyn ParameterStore>) -> Self {
        Self {
            store,
            layout: ParameterLayout::default(),
            timeout: Self::DEFAULT_TIMEOUT,
            cache: Cache::new(64),
        }
    }

    /// Use a different parameter layout
    #[must_use]
    pub fn with_layout(mut self, layout: ParameterLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Bound each parameter fetch by `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve a substrate with overlays applied in `features` order
    ///
    /// The first successful resolution for a given substrate and feature list
    /// is cached; later calls return it without touching the store.
    ///
    /// # Errors
    /// - `SubstrateError::ConfigFetch` if any fetch fails
    /// - `SubstrateError::FetchTimeout` if the store does not answer in time
    /// - `SubstrateError::ConfigParse` if a document is malformed
    pub async fn resolve(
        &self,
        substrate: &str,
        features: &[String],
    ) -> SubstrateResult<Arc<SubstrateConfig>> {
        let key = SubstrateKey {
            substrate: substrate.to_string(),
            features: features.to_vec(),
        };

        if let Some(cached) = self.cache.get(&key).await {
            tracing::debug!("Substrate {} served from cache", substrate);
            return Ok(cached);
        }

        tracing::info!("Resolving substrate {} with features {:?}", substrate, features);

        let mut merged = self
            .fetch_document(&self.layout.substrate_path(substrate))
            .await?;

        for feature in features {
            let overlay = self
                .fetch_document(&self.layout.feature_path(substrate, feature))
                .await?;
            merged = merged.merged(&overlay);
        }

        let config = Arc::new(SubstrateConfig::new(substrate, features.to_vec(), merged));
        tracing::info!(
            "Resolved substrate {}: {} keys, capabilities {:?}",
            substrate,
            config.values().len(),
            config.capabilities()
        );

        self.cache.insert(key, Arc::clone(&config)).await;
        Ok(config)
    }

    async fn fetch_document(&self, path: &str) -> SubstrateResult<ConfigDocument> {
        tracing::debug!("Fetching parameter {}", path);

        let text = tokio::time::timeout(self.timeout, self.store.get_parameter(path))
            .await
            .map_err(|_| SubstrateError::FetchTimeout {
                path: path.to_string(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })?
            .map_err(|e| SubstrateError::fetch(path, e))?;

        ConfigDocument::parse(&text).map_err(|e| SubstrateError::parse(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::store::MockParameterStore;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::HashMap;

    struct MapStore(HashMap<String, String>);

    #[async_trait::async_trait]
    impl ParameterStore for MapStore {
        async fn get_parameter(&self, path: &str) -> Result<String, StoreError> {
            self.0.get(path).cloned().ok_or(StoreError::NotFound)
        }
    }

    fn map_store(entries: &[(&str, &str)]) -> Arc<dyn ParameterStore> {
        Arc::new(MapStore(
            entries
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        ))
    }

    fn features(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn later_overlays_win() {
        let store = map_store(&[
            ("/bkeane/substrate/ager", "A=1\nB=2"),
            ("/bkeane/substrate/ager/f1", "B=3\nC=4"),
            ("/bkeane/substrate/ager/f2", "C=5"),
        ]);
        let resolver = SubstrateResolver::new(store);

        let config = resolver
            .resolve("ager", &features(&["f1", "f2"]))
            .await
            .unwrap();

        let expected: ConfigDocument = [("A", "1"), ("B", "3"), ("C", "5")]
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        assert_eq!(config.values(), &expected);
        assert_eq!(config.features(), &["f1".to_string(), "f2".to_string()]);
    }

    #[tokio::test]
    async fn no_features_yields_baseline() {
        let store = map_store(&[("/bkeane/substrate/ager", "A=1")]);
        let config = SubstrateResolver::new(store)
            .resolve("ager", &[])
            .await
            .unwrap();
        assert_eq!(config.get("A"), Some("1"));
        assert_eq!(config.values().len(), 1);
    }

    #[tokio::test]
    async fn second_resolution_issues_no_fetches() {
        let mut store = MockParameterStore::new();
        store
            .expect_get_parameter()
            .times(2)
            .returning(|path| match path {
                "/bkeane/substrate/ager" => Ok("A=1".to_string()),
                _ => Ok("A=2".to_string()),
            });

        let resolver = SubstrateResolver::new(Arc::new(store));
        let first = resolver.resolve("ager", &features(&["api"])).await.unwrap();
        let second = resolver.resolve("ager", &features(&["api"])).await.unwrap();

        assert_eq!(first, second);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.get("A"), Some("2"));
    }

    #[tokio::test]
    async fn missing_feature_is_fetch_error() {
        let store = map_store(&[("/bkeane/substrate/ager", "A=1")]);
        let err = SubstrateResolver::new(store)
            .resolve("ager", &features(&["nope"]))
            .await
            .unwrap_err();

        match err {
            SubstrateError::ConfigFetch { path, source } => {
                assert_eq!(path, "/bkeane/substrate/ager/nope");
                assert_eq!(source, StoreError::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn store_failure_propagates() {
        let mut store = MockParameterStore::new();
        store
            .expect_get_parameter()
            .returning(|_| Err(StoreError::Decryption("kms key disabled".to_string())));

        let err = SubstrateResolver::new(Arc::new(store))
            .resolve("ager", &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubstrateError::ConfigFetch {
                source: StoreError::Decryption(_),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn malformed_document_is_parse_error() {
        let store = map_store(&[("/bkeane/substrate/ager", "A=1\ngarbage")]);
        let err = SubstrateResolver::new(store)
            .resolve("ager", &[])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubstrateError::ConfigParse { ref path, .. } if path == "/bkeane/substrate/ager"
        ));
        assert!(err.is_configuration_error());
    }

    #[tokio::test]
    async fn quoted_and_referencing_values_resolve() {
        let store = map_store(&[(
            "/bkeane/substrate/ager",
            "MONAD_RESOLVER_API_HOST=api.example.com\n\
             SUBSTRATE_API_URL=https://${MONAD_RESOLVER_API_HOST}\n\
             SUBSTRATE_CA=\"-----BEGIN-----\nabc\n-----END-----\"",
        )]);
        let config = SubstrateResolver::new(store)
            .resolve("ager", &[])
            .await
            .unwrap();
        assert_eq!(config.get("SUBSTRATE_API_URL"), Some("https://api.example.com"));
        assert_eq!(config.get("SUBSTRATE_CA"), Some("-----BEGIN-----\nabc\n-----END-----"));
    }

    #[tokio::test]
    async fn failed_resolution_is_not_cached() {
        let store = map_store(&[]);
        let resolver = SubstrateResolver::new(store);
        assert!(resolver.resolve("ager", &[]).await.is_err());
        assert!(resolver.resolve("ager", &[]).await.is_err());
    }

    #[tokio::test]
    async fn custom_layout_is_used() {
        let store = map_store(&[("/team/envs/dev", "A=1"), ("/team/envs/dev/x", "B=2")]);
        let config = SubstrateResolver::new(store)
            .with_layout(ParameterLayout::new("/team/envs"))
            .resolve("dev", &features(&["x"]))
            .await
            .unwrap();
        assert_eq!(config.values().len(), 2);
    }

    struct SlowStore;

    #[async_trait::async_trait]
    impl ParameterStore for SlowStore {
        async fn get_parameter(&self, _path: &str) -> Result<String, StoreError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(String::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn slow_store_times_out() {
        let err = SubstrateResolver::new(Arc::new(SlowStore))
            .with_timeout(Duration::from_millis(50))
            .resolve("ager", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, SubstrateError::FetchTimeout { timeout_ms: 50, .. }));
    }

    #[test]
    fn vpc_lists_empty_unless_enabled() {
        let doc =
            ConfigDocument::parse("SUBSTRATE_VPC_SUBNET_IDS=\"subnet-a, subnet-b\"").unwrap();
        let config = SubstrateConfig::new("ager", Vec::new(), doc);
        assert!(config.vpc_subnet_ids().is_empty());

        let doc = ConfigDocument::parse(
            "SUBSTRATE_VPC_SUBNET_IDS=\"subnet-a, subnet-b\"\nSUBSTRATE_VPC_SECURITY_GROUP_IDS=sg-1",
        )
        .unwrap();
        let config = SubstrateConfig::new("ager", Vec::new(), doc);
        assert_eq!(config.vpc_subnet_ids(), vec!["subnet-a", "subnet-b"]);
        assert_eq!(config.vpc_security_group_ids(), vec!["sg-1"]);
    }

    #[test]
    fn require_reports_missing_key() {
        let config = SubstrateConfig::new("ager", Vec::new(), ConfigDocument::new());
        let err = config.require(keys::APIGATEWAY_ID).unwrap_err();
        assert!(matches!(err, SubstrateError::MissingKey(ref k) if k == keys::APIGATEWAY_ID));
    }

    fn layer() -> impl Strategy<Value = HashMap<String, String>> {
        prop::collection::hash_map("[A-D]", "[a-z0-9]{1,4}", 0..4)
    }

    proptest! {
        #[test]
        fn merge_is_last_write_wins(
            base in layer(),
            overlays in prop::collection::vec(layer(), 0..4),
        ) {
            let render = |m: &HashMap<String, String>| {
                m.iter().map(|(k, v)| format!("{k}={v}\n")).collect::<String>()
            };

            let mut entries = vec![("/bkeane/substrate/s".to_string(), render(&base))];
            let mut names = Vec::new();
            for (i, overlay) in overlays.iter().enumerate() {
                names.push(format!("f{i}"));
                entries.push((format!("/bkeane/substrate/s/f{i}"), render(overlay)));
            }
            let store: Arc<dyn ParameterStore> = Arc::new(MapStore(entries.into_iter().collect()));

            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            let config = runtime
                .block_on(SubstrateResolver::new(store).resolve("s", &names))
                .unwrap();

            let mut expected = base.clone();
            for overlay in &overlays {
                expected.extend(overlay.clone());
            }

            prop_assert_eq!(config.values().len(), expected.len());
            for (key, value) in &expected {
                prop_assert_eq!(config.get(key), Some(value.as_str()));
            }
        }
    }
}
