//! Caller account lookup and ARN templates

use crate::error::IdentityResult;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// Cloud account identifier of the caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    /// Wrap an account identifier
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for AccountId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity service answering "who am I"
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CallerIdentity: Send + Sync {
    /// Account the current credentials belong to
    async fn account_id(&self) -> IdentityResult<AccountId>;
}

/// ARNs of the function, its execution role and its policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceArns {
    /// Function ARN
    pub function: String,
    /// Execution role ARN
    pub role: String,
    /// Role policy ARN
    pub policy: String,
}

impl ResourceArns {
    /// Build ARNs for `resource_name` in `region` under `account`
    #[must_use]
    pub fn new(region: &str, account: &AccountId, resource_name: &str) -> Self {
        Self {
            function: format!("arn:aws:lambda:{region}:{account}:function:{resource_name}"),
            role: format!("arn:aws:iam::{account}:role/{resource_name}"),
            policy: format!("arn:aws:iam::{account}:policy/{resource_name}"),
        }
    }
}
