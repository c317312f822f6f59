//! Resource identity derivation
//!
//! Every deployed resource is named after where its source lives:
//!
//! ```text
//! name: [org-]repo-branch-base        path: [org/]repo/branch/base
//! ```
//!
//! Names and paths carry the org prefix independently, per [`NamingPolicy`].

use crate::account::{AccountId, CallerIdentity, ResourceArns};
use crate::error::{IdentityError, IdentityResult};
use crate::origin::OriginUrl;
use crate::vcs::{function_base_name, VcsReader, VcsSnapshot};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Which identifiers get the org prefix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct NamingPolicy {
    /// Prefix resource names with the org
    pub prefix_names_with_org: bool,
    /// Prefix route paths with the org
    pub prefix_paths_with_org: bool,
}

impl NamingPolicy {
    /// Create policy from the two toggles
    #[inline]
    #[must_use]
    pub fn new(prefix_names_with_org: bool, prefix_paths_with_org: bool) -> Self {
        Self {
            prefix_names_with_org,
            prefix_paths_with_org,
        }
    }
}

/// Resource name: `[org-]repo-branch-base`
#[must_use]
pub fn resource_name(
    origin: &OriginUrl,
    branch: &str,
    base: &str,
    prefix_with_org: bool,
) -> String {
    join_segments(origin, branch, base, prefix_with_org, "-")
}

/// Resource path: `[org/]repo/branch/base`
#[must_use]
pub fn resource_path(
    origin: &OriginUrl,
    branch: &str,
    base: &str,
    prefix_with_org: bool,
) -> String {
    join_segments(origin, branch, base, prefix_with_org, "/")
}

/// Wildcard proxy route for a resource path
#[must_use]
pub fn route_key(resource_path: &str) -> String {
    format!("ANY /{resource_path}/{{proxy+}}")
}

fn join_segments(
    origin: &OriginUrl,
    branch: &str,
    base: &str,
    prefix_with_org: bool,
    separator: &str,
) -> String {
    let mut segments = Vec::with_capacity(4);
    if prefix_with_org {
        segments.push(origin.org());
    }
    segments.extend([origin.repo(), branch, base]);
    segments.join(separator)
}

/// Identity of the function under test
///
/// Derived all at once; a bad origin URL fails the whole derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceIdentity {
    origin: OriginUrl,
    branch: String,
    commit: String,
    dirty: bool,
    base_name: String,
    policy: NamingPolicy,
    resource_name: String,
    resource_path: String,
}

impl ResourceIdentity {
    /// Derive identity from a VCS snapshot
    ///
    /// # Errors
    /// Returns `IdentityError::MetadataParse` if the origin URL is outside
    /// the accepted grammar.
    pub fn derive(
        snapshot: &VcsSnapshot,
        base_name: impl Into<String>,
        policy: NamingPolicy,
    ) -> IdentityResult<Self> {
        let origin = OriginUrl::parse(&snapshot.origin_url)?;
        let base_name = base_name.into();

        let resource_name = resource_name(
            &origin,
            &snapshot.branch,
            &base_name,
            policy.prefix_names_with_org,
        );
        let resource_path = resource_path(
            &origin,
            &snapshot.branch,
            &base_name,
            policy.prefix_paths_with_org,
        );

        // Route keys append "/{proxy+}"; a path already containing it is ambiguous
        if resource_path.contains("{proxy+}") {
            tracing::warn!("Resource path {} contains a proxy segment", resource_path);
        }

        Ok(Self {
            origin,
            branch: snapshot.branch.clone(),
            commit: snapshot.commit.clone(),
            dirty: snapshot.dirty,
            base_name,
            policy,
            resource_name,
            resource_path,
        })
    }

    /// Parsed origin
    #[inline]
    #[must_use]
    pub fn origin(&self) -> &OriginUrl {
        &self.origin
    }

    /// Owning organization
    #[inline]
    #[must_use]
    pub fn org(&self) -> &str {
        self.origin.org()
    }

    /// Repository name
    #[inline]
    #[must_use]
    pub fn repo(&self) -> &str {
        self.origin.repo()
    }

    /// Branch name
    #[inline]
    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }

    /// Commit hash of `HEAD`
    #[inline]
    #[must_use]
    pub fn commit(&self) -> &str {
        &self.commit
    }

    /// Working tree had uncommitted changes
    #[inline]
    #[must_use]
    pub fn dirty(&self) -> bool {
        self.dirty
    }

    /// Final segment of the function directory
    #[inline]
    #[must_use]
    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    /// Naming policy used
    #[inline]
    #[must_use]
    pub fn policy(&self) -> NamingPolicy {
        self.policy
    }

    /// Dash-joined resource name
    #[inline]
    #[must_use]
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    /// Slash-joined resource path
    #[inline]
    #[must_use]
    pub fn resource_path(&self) -> &str {
        &self.resource_path
    }

    /// Gateway route key
    #[inline]
    #[must_use]
    pub fn route_key(&self) -> String {
        route_key(&self.resource_path)
    }

    /// Function name
    #[inline]
    #[must_use]
    pub fn function_name(&self) -> &str {
        &self.resource_name
    }

    /// Execution role name
    #[inline]
    #[must_use]
    pub fn role_name(&self) -> &str {
        &self.resource_name
    }

    /// Role policy name
    #[inline]
    #[must_use]
    pub fn policy_name(&self) -> &str {
        &self.resource_name
    }

    /// ARNs for this identity
    #[must_use]
    pub fn arns(&self, region: &str, account: &AccountId) -> ResourceArns {
        ResourceArns::new(region, account, &self.resource_name)
    }
}

/// Combines VCS metadata and caller identity into resource identities
#[derive(Clone)]
pub struct IdentityResolver {
    vcs: Arc<dyn VcsReader>,
    caller: Arc<dyn CallerIdentity>,
    timeout: Duration,
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl IdentityResolver {
    /// Default bound on a single collaborator call
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create resolver
    #[must_use]
    pub fn new(vcs: Arc<dyn VcsReader>, caller: Arc<dyn CallerIdentity>) -> Self {
        Self {
            vcs,
            caller,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    /// Bound each collaborator call by `timeout`
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolve the identity of the function at `function_path`
    ///
    /// # Errors
    /// - `IdentityError::InvalidFunctionPath` if the path has no base name
    /// - `IdentityError::VcsRead` if the repository cannot be read
    /// - `IdentityError::MetadataParse` if the origin URL is unsupported
    pub async fn resolve(
        &self,
        function_path: &Path,
        policy: NamingPolicy,
    ) -> IdentityResult<ResourceIdentity> {
        let base_name = function_base_name(function_path)?;
        let snapshot = self
            .bounded("git metadata", self.vcs.open(function_path))
            .await?;

        let identity = ResourceIdentity::derive(&snapshot, base_name, policy)?;
        tracing::info!(
            "Resolved identity {} at {} (dirty: {})",
            identity.resource_name(),
            identity.commit(),
            identity.dirty()
        );
        Ok(identity)
    }

    /// Account of the current caller
    ///
    /// # Errors
    /// Returns `IdentityError::CallerIdentity` or `IdentityError::Timeout`.
    pub async fn account_id(&self) -> IdentityResult<AccountId> {
        self.bounded("caller identity", self.caller.account_id())
            .await
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        fut: impl std::future::Future<Output = IdentityResult<T>>,
    ) -> IdentityResult<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| IdentityError::Timeout {
                operation,
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }
}
