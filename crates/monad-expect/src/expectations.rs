//! Verification expectations
//!
//! The single object assertions consume. It combines:
//! - Substrate resolution (layered config and capability gates)
//! - Identity resolution (names, paths, route keys, ARNs)
//! - Endpoint resolution (custom domain or default URL)
//!
//! Every value is resolved on first access and memoized, so all assertions
//! in a run observe one consistent snapshot. Construct one instance per
//! process and share it by reference.

use crate::bus;
use crate::error::{ExpectError, ExpectResult};
use crate::settings::{ExpectationInputs, ResolverSettings};
use monad_endpoint::{EndpointResolver, RoutingService};
use monad_identity::{
    AccountId, CallerIdentity, IdentityResolver, NamingPolicy, ResourceArns, ResourceIdentity,
    VcsReader,
};
use monad_substrate::{
    keys, Capabilities, ConfigDocument, ParameterStore, SubstrateConfig, SubstrateResolver,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

/// External services the expectations are resolved against
#[derive(Clone)]
pub struct Collaborators {
    /// Hierarchical parameter store
    pub parameters: Arc<dyn ParameterStore>,
    /// Local version control reader
    pub vcs: Arc<dyn VcsReader>,
    /// Caller account lookup
    pub caller: Arc<dyn CallerIdentity>,
    /// HTTP routing description service
    pub routing: Arc<dyn RoutingService>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// Every expected value, fully resolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectationSnapshot {
    /// Substrate name
    pub substrate: String,
    /// Applied feature overlays
    pub features: Vec<String>,
    /// Capability gates
    pub capabilities: Capabilities,
    /// `host/org/repo`
    pub origin: String,
    /// Branch name
    pub branch: String,
    /// Commit hash
    pub sha: String,
    /// Working tree dirty
    pub dirty: bool,
    /// Dash-joined resource name
    pub resource_name: String,
    /// Slash-joined resource path
    pub resource_path: String,
    /// Gateway route key
    pub route_key: String,
    /// Function, role and policy ARNs
    pub arns: ResourceArns,
    /// Event bus name
    pub bus_name: Option<String>,
    /// Expected subnets
    pub vpc_subnet_ids: Vec<String>,
    /// Expected security groups
    pub vpc_security_group_ids: Vec<String>,
    /// Gateway API name
    pub gateway_name: Option<String>,
    /// Function URL behind the gateway
    pub url: Option<String>,
    /// Expected resource tags
    pub tags: BTreeMap<String, String>,
    /// Expected function environment variables
    pub env_vars: BTreeMap<String, String>,
    /// Expected event bus rule names
    pub rule_names: Vec<String>,
}

/// Expected identity and configuration of the function under test
pub struct VerificationExpectations {
    inputs: ExpectationInputs,
    settings: ResolverSettings,
    substrates: SubstrateResolver,
    identities: IdentityResolver,
    endpoints: EndpointResolver,
    substrate: OnceCell<Arc<SubstrateConfig>>,
    identity: OnceCell<ResourceIdentity>,
    account: OnceCell<AccountId>,
    endpoint: OnceCell<Option<String>>,
    gateway_name: OnceCell<Option<String>>,
}

impl std::fmt::Debug for VerificationExpectations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationExpectations")
            .field("inputs", &self.inputs)
            .field("settings", &self.settings)
            .field("substrate_resolved", &self.substrate.initialized())
            .field("identity_resolved", &self.identity.initialized())
            .finish_non_exhaustive()
    }
}

impl VerificationExpectations {
    /// Create expectations; nothing is resolved until first access
    #[must_use]
    pub fn new(
        inputs: ExpectationInputs,
        settings: ResolverSettings,
        collaborators: Collaborators,
    ) -> Self {
        let timeout = settings.lookup_timeout;
        Self {
            substrates: SubstrateResolver::new(collaborators.parameters)
                .with_layout(settings.layout())
                .with_timeout(timeout),
            identities: IdentityResolver::new(collaborators.vcs, collaborators.caller)
                .with_timeout(timeout),
            endpoints: EndpointResolver::new(collaborators.routing).with_timeout(timeout),
            inputs,
            settings,
            substrate: OnceCell::new(),
            identity: OnceCell::new(),
            account: OnceCell::new(),
            endpoint: OnceCell::new(),
            gateway_name: OnceCell::new(),
        }
    }

    /// Create expectations from the process environment
    ///
    /// # Errors
    /// - `ExpectError::MissingInput` if a required variable is absent
    /// - `ExpectError::InvalidSetting` if an optional variable is malformed
    pub fn from_env(collaborators: Collaborators) -> ExpectResult<Self> {
        let inputs = ExpectationInputs::from_env()?;
        let settings = ResolverSettings::from_env()?;
        Ok(Self::new(inputs, settings, collaborators))
    }

    /// Inputs this instance was built from
    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &ExpectationInputs {
        &self.inputs
    }

    /// Settings this instance was built with
    #[inline]
    #[must_use]
    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Merged substrate configuration
    ///
    /// # Errors
    /// Returns `ExpectError::Substrate` if resolution fails.
    pub async fn substrate(&self) -> ExpectResult<&SubstrateConfig> {
        self.substrate
            .get_or_try_init(|| async {
                self.substrates
                    .resolve(&self.inputs.substrate, &self.inputs.features)
                    .await
                    .map_err(ExpectError::from)
            })
            .await
            .map(AsRef::as_ref)
    }

    /// Capability gates of the substrate
    ///
    /// # Errors
    /// Returns `ExpectError::Substrate` if resolution fails.
    pub async fn capabilities(&self) -> ExpectResult<&Capabilities> {
        Ok(self.substrate().await?.capabilities())
    }

    /// Merged substrate key/value mapping
    ///
    /// # Errors
    /// Returns `ExpectError::Substrate` if resolution fails.
    pub async fn env(&self) -> ExpectResult<&ConfigDocument> {
        Ok(self.substrate().await?.values())
    }

    /// Identity of the function under test
    ///
    /// # Errors
    /// Returns `ExpectError::Substrate` or `ExpectError::Identity`.
    pub async fn identity(&self) -> ExpectResult<&ResourceIdentity> {
        self.identity
            .get_or_try_init(|| self.resolve_identity())
            .await
    }

    /// Account of the current caller
    ///
    /// # Errors
    /// Returns `ExpectError::Identity` if the lookup fails.
    pub async fn account_id(&self) -> ExpectResult<&AccountId> {
        self.account
            .get_or_try_init(|| async {
                self.identities.account_id().await.map_err(ExpectError::from)
            })
            .await
    }

    /// Owning organization
    ///
    /// # Errors
    /// Fails if identity resolution fails.
    pub async fn org(&self) -> ExpectResult<&str> {
        Ok(self.identity().await?.org())
    }

    /// Repository name
    ///
    /// # Errors
    /// Fails if identity resolution fails.
    pub async fn repo(&self) -> ExpectResult<&str> {
        Ok(self.identity().await?.repo())
    }

    /// `host/org/repo`
    ///
    /// # Errors
    /// Fails if identity resolution fails.
    pub async fn origin(&self) -> ExpectResult<String> {
        Ok(self.identity().await?.origin().to_string())
    }

    /// Branch name
    ///
    /// # Errors
    /// Fails if identity resolution fails.
    pub async fn branch(&self) -> ExpectResult<&str> {
        Ok(self.identity().await?.branch())
    }

    /// Commit hash
    ///
    /// # Errors
    /// Fails if identity resolution fails.
    pub async fn sha(&self) -> ExpectResult<&str> {
        Ok(self.identity().await?.commit())
    }

    /// Working tree had uncommitted changes
    ///
    /// # Errors
    /// Fails if identity resolution fails.
    pub async fn dirty(&self) -> ExpectResult<bool> {
        Ok(self.identity().await?.dirty())
    }

    /// Resource name
    ///
    /// # Errors
    /// Fails if identity resolution fails.
    pub async fn resource_name(&self) -> ExpectResult<&str> {
        Ok(self.identity().await?.resource_name())
    }

    /// Resource path
    ///
    /// # Errors
    /// Fails if identity resolution fails.
    pub async fn resource_path(&self) -> ExpectResult<&str> {
        Ok(self.identity().await?.resource_path())
    }

    /// Function name
    ///
    /// # Errors
    /// Fails if identity resolution fails.
    pub async fn function_name(&self) -> ExpectResult<&str> {
        Ok(self.identity().await?.function_name())
    }

    /// Execution role name
    ///
    /// # Errors
    /// Fails if identity resolution fails.
    pub async fn role_name(&self) -> ExpectResult<&str> {
        Ok(self.identity().await?.role_name())
    }

    /// Role policy name
    ///
    /// # Errors
    /// Fails if identity resolution fails.
    pub async fn policy_name(&self) -> ExpectResult<&str> {
        Ok(self.identity().await?.policy_name())
    }

    /// Gateway route key
    ///
    /// # Errors
    /// Fails if identity resolution fails.
    pub async fn route_key(&self) -> ExpectResult<String> {
        Ok(self.identity().await?.route_key())
    }

    /// Function, role and policy ARNs
    ///
    /// # Errors
    /// Fails if identity or account resolution fails.
    pub async fn arns(&self) -> ExpectResult<ResourceArns> {
        let identity = self.identity().await?;
        let account = self.account_id().await?;
        Ok(identity.arns(&self.settings.region, account))
    }

    /// Function ARN
    ///
    /// # Errors
    /// Fails if identity or account resolution fails.
    pub async fn function_arn(&self) -> ExpectResult<String> {
        Ok(self.arns().await?.function)
    }

    /// Execution role ARN
    ///
    /// # Errors
    /// Fails if identity or account resolution fails.
    pub async fn role_arn(&self) -> ExpectResult<String> {
        Ok(self.arns().await?.role)
    }

    /// Role policy ARN
    ///
    /// # Errors
    /// Fails if identity or account resolution fails.
    pub async fn policy_arn(&self) -> ExpectResult<String> {
        Ok(self.arns().await?.policy)
    }

    /// Event bus name from the substrate
    ///
    /// # Errors
    /// Returns `ExpectError::Substrate` if resolution fails.
    pub async fn bus_name(&self) -> ExpectResult<Option<&str>> {
        Ok(self.substrate().await?.bus_name())
    }

    /// Expected subnets; empty unless VPC is enabled
    ///
    /// # Errors
    /// Returns `ExpectError::Substrate` if resolution fails.
    pub async fn vpc_subnet_ids(&self) -> ExpectResult<Vec<String>> {
        Ok(self.substrate().await?.vpc_subnet_ids())
    }

    /// Expected security groups; empty unless VPC is enabled
    ///
    /// # Errors
    /// Returns `ExpectError::Substrate` if resolution fails.
    pub async fn vpc_security_group_ids(&self) -> ExpectResult<Vec<String>> {
        Ok(self.substrate().await?.vpc_security_group_ids())
    }

    /// Gateway API name; `None` when the gateway is disabled
    ///
    /// # Errors
    /// - `ExpectError::Substrate` if the gateway id is missing
    /// - `ExpectError::Endpoint` if the describe call fails
    pub async fn gateway_name(&self) -> ExpectResult<Option<&str>> {
        let name = self
            .gateway_name
            .get_or_try_init(|| self.resolve_gateway_name())
            .await?;
        Ok(name.as_deref())
    }

    /// Public gateway base URL; `None` when the gateway is disabled
    ///
    /// # Errors
    /// - `ExpectError::Substrate` if the gateway id is missing
    /// - `ExpectError::Endpoint` if a routing call fails
    pub async fn gateway_endpoint(&self) -> ExpectResult<Option<&str>> {
        let endpoint = self
            .endpoint
            .get_or_try_init(|| self.resolve_endpoint())
            .await?;
        Ok(endpoint.as_deref())
    }

    /// Function URL: `{endpoint}/{resource_path}/`
    ///
    /// The trailing slash matches the deployed route convention.
    ///
    /// # Errors
    /// Fails if endpoint or identity resolution fails.
    pub async fn url(&self) -> ExpectResult<Option<String>> {
        let Some(endpoint) = self.gateway_endpoint().await? else {
            return Ok(None);
        };
        let path = self.resource_path().await?;
        Ok(Some(format!("{}/{}/", endpoint.trim_end_matches('/'), path)))
    }

    /// Tags every provisioned resource must carry, in assertion order
    ///
    /// # Errors
    /// Fails if identity resolution fails.
    pub async fn expected_tags(&self) -> ExpectResult<Vec<(&'static str, String)>> {
        let identity = self.identity().await?;
        Ok(vec![
            ("Branch", identity.branch().to_string()),
            ("Sha", identity.commit().to_string()),
            ("Origin", identity.origin().to_string()),
            ("Dirty", identity.dirty().to_string()),
        ])
    }

    /// Environment variables the function must be deployed with
    ///
    /// # Errors
    /// Fails if identity resolution fails.
    pub async fn expected_env_vars(&self) -> ExpectResult<Vec<(&'static str, String)>> {
        let identity = self.identity().await?;
        Ok(vec![
            ("GIT_BRANCH", identity.branch().to_string()),
            ("GIT_SHA", identity.commit().to_string()),
            ("GIT_ORIGIN", identity.origin().to_string()),
        ])
    }

    /// Bus rules declared by the function
    ///
    /// # Errors
    /// Returns `ExpectError::Io` if the bus directory cannot be read.
    pub async fn bus_rules(&self) -> ExpectResult<Vec<String>> {
        bus::bus_rules(&self.inputs.function_path).await
    }

    /// Expected event bus rule names: `{resource_name}-{rule}`
    ///
    /// # Errors
    /// Fails if identity resolution or rule discovery fails.
    pub async fn expected_rule_names(&self) -> ExpectResult<Vec<String>> {
        let resource_name = self.resource_name().await?;
        Ok(self
            .bus_rules()
            .await?
            .iter()
            .map(|rule| bus::rule_name(resource_name, rule))
            .collect())
    }

    /// Resolve everything into one serializable snapshot
    ///
    /// # Errors
    /// Fails on the first accessor that fails.
    pub async fn snapshot(&self) -> ExpectResult<ExpectationSnapshot> {
        let substrate = self.substrate().await?;
        let identity = self.identity().await?;

        Ok(ExpectationSnapshot {
            substrate: substrate.name().to_string(),
            features: substrate.features().to_vec(),
            capabilities: substrate.capabilities().clone(),
            origin: identity.origin().to_string(),
            branch: identity.branch().to_string(),
            sha: identity.commit().to_string(),
            dirty: identity.dirty(),
            resource_name: identity.resource_name().to_string(),
            resource_path: identity.resource_path().to_string(),
            route_key: identity.route_key(),
            arns: self.arns().await?,
            bus_name: substrate.bus_name().map(str::to_string),
            vpc_subnet_ids: substrate.vpc_subnet_ids(),
            vpc_security_group_ids: substrate.vpc_security_group_ids(),
            gateway_name: self.gateway_name().await?.map(str::to_string),
            url: self.url().await?,
            tags: into_map(self.expected_tags().await?),
            env_vars: into_map(self.expected_env_vars().await?),
            rule_names: self.expected_rule_names().await?,
        })
    }

    /// Snapshot rendered as pretty JSON
    ///
    /// # Errors
    /// Fails if resolution or serialization fails.
    pub async fn snapshot_json(&self) -> ExpectResult<String> {
        let snapshot = self.snapshot().await?;
        serde_json::to_string_pretty(&snapshot)
            .map_err(|e| ExpectError::Serialization(e.to_string()))
    }

    async fn resolve_identity(&self) -> ExpectResult<ResourceIdentity> {
        let caps = self.capabilities().await?;
        let policy = NamingPolicy::new(caps.prefix_names_with_org, caps.prefix_paths_with_org);
        Ok(self
            .identities
            .resolve(&self.inputs.function_path, policy)
            .await?)
    }

    async fn resolve_gateway_name(&self) -> ExpectResult<Option<String>> {
        match self.gateway_api_id().await? {
            Some(api_id) => Ok(Some(self.endpoints.gateway_name(api_id).await?)),
            None => Ok(None),
        }
    }

    async fn resolve_endpoint(&self) -> ExpectResult<Option<String>> {
        match self.gateway_api_id().await? {
            Some(api_id) => Ok(Some(self.endpoints.resolve(api_id).await?)),
            None => Ok(None),
        }
    }

    async fn gateway_api_id(&self) -> ExpectResult<Option<&str>> {
        let substrate = self.substrate().await?;
        if !substrate.capabilities().apigateway {
            return Ok(None);
        }
        Ok(Some(substrate.require(keys::APIGATEWAY_ID)?))
    }
}

fn into_map(pairs: Vec<(&'static str, String)>) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use monad_test_utils::{
        snapshot, InMemoryParameterStore, InMemoryRouting, StaticCallerIdentity, StaticVcsReader,
    };

    #[test]
    fn construction_is_lazy() {
        let store = Arc::new(InMemoryParameterStore::new());
        let vcs = Arc::new(StaticVcsReader::new(snapshot(
            "https://github.com/acme/svc",
            "main",
            "abc",
        )));
        let expect = VerificationExpectations::new(
            ExpectationInputs::new("ager", ["api"], "/work/svc/echo"),
            ResolverSettings::default(),
            Collaborators {
                parameters: store.clone(),
                vcs: vcs.clone(),
                caller: Arc::new(StaticCallerIdentity::new("123456789012")),
                routing: Arc::new(InMemoryRouting::new()),
            },
        );

        assert_eq!(store.fetch_count(), 0);
        assert_eq!(vcs.open_count(), 0);
        assert!(format!("{expect:?}").contains("substrate_resolved: false"));
    }

    #[test]
    fn pairs_become_sorted_map() {
        let map = into_map(vec![("Sha", "abc".to_string()), ("Branch", "main".to_string())]);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["Branch", "Sha"]);
    }
}
