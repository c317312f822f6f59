//! Capability gates derived from a merged substrate
//!
//! Computed once when a [`SubstrateConfig`](crate::SubstrateConfig) is built.

use crate::document::ConfigDocument;
use serde::Serialize;

/// Well-known substrate keys
pub mod keys {
    /// `"true"` enables the API gateway integration
    pub const APIGATEWAY_ENABLE: &str = "SUBSTRATE_APIGATEWAY_ENABLE";
    /// Identifier of the substrate's HTTP API
    pub const APIGATEWAY_ID: &str = "SUBSTRATE_APIGATEWAY_ID";
    /// Authorizer kind for gateway routes
    pub const APIGATEWAY_AUTH_TYPE: &str = "SUBSTRATE_APIGATEWAY_AUTH_TYPE";
    /// `"true"` enables event bus rules
    pub const EVENTBRIDGE_ENABLE: &str = "SUBSTRATE_EVENTBRIDGE_ENABLE";
    /// Name of the substrate's event bus
    pub const EVENTBRIDGE_BUS_NAME: &str = "SUBSTRATE_EVENTBRIDGE_BUS_NAME";
    /// Comma separated subnet ids
    pub const VPC_SUBNET_IDS: &str = "SUBSTRATE_VPC_SUBNET_IDS";
    /// Comma separated security group ids
    pub const VPC_SECURITY_GROUP_IDS: &str = "SUBSTRATE_VPC_SECURITY_GROUP_IDS";
    /// `"true"` prefixes resource names with the org
    pub const PREFIX_NAMES_WITH_ORG: &str = "SUBSTRATE_PREFIX_NAMES_WITH_ORG";
    /// `"true"` prefixes route paths with the org
    pub const PREFIX_PATHS_WITH_ORG: &str = "SUBSTRATE_PREFIX_PATHS_WITH_ORG";
}

/// How gateway routes authenticate callers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "value")]
pub enum AuthMode {
    /// No authorizer configured
    None,
    /// Request signing (`AWS_IAM`)
    Signature,
    /// Bearer token (`JWT`)
    Bearer,
    /// Auth type set to a value this crate does not know
    Unrecognized(String),
}

impl AuthMode {
    /// Classify the raw auth-type value; `None` means the key is absent
    #[must_use]
    pub fn from_value(value: Option<&str>) -> Self {
        match value {
            None => Self::None,
            Some("AWS_IAM") => Self::Signature,
            Some("JWT") => Self::Bearer,
            Some(other) => Self::Unrecognized(other.to_string()),
        }
    }
}

/// Resolved capability set of a substrate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// API gateway integration enabled
    pub apigateway: bool,
    /// Event bus integration enabled
    pub eventbridge: bool,
    /// Subnets and security groups both configured
    pub vpc: bool,
    /// Gateway auth mode
    pub auth: AuthMode,
    /// Resource names carry the org prefix
    pub prefix_names_with_org: bool,
    /// Route paths carry the org prefix
    pub prefix_paths_with_org: bool,
}

impl Capabilities {
    /// Derive capabilities from a merged document
    #[must_use]
    pub fn from_document(doc: &ConfigDocument) -> Self {
        let auth = AuthMode::from_value(doc.get(keys::APIGATEWAY_AUTH_TYPE));
        if let AuthMode::Unrecognized(value) = &auth {
            tracing::warn!("Unrecognized gateway auth type: {}", value);
        }

        Self {
            apigateway: is_true(doc, keys::APIGATEWAY_ENABLE),
            eventbridge: is_true(doc, keys::EVENTBRIDGE_ENABLE),
            vpc: doc.contains_key(keys::VPC_SUBNET_IDS)
                && doc.contains_key(keys::VPC_SECURITY_GROUP_IDS),
            auth,
            prefix_names_with_org: is_true(doc, keys::PREFIX_NAMES_WITH_ORG),
            prefix_paths_with_org: is_true(doc, keys::PREFIX_PATHS_WITH_ORG),
        }
    }

    /// No authorizer on gateway routes
    #[inline]
    #[must_use]
    pub fn no_auth(&self) -> bool {
        self.auth == AuthMode::None
    }

    /// Routes expect signed requests
    #[inline]
    #[must_use]
    pub fn signature_auth(&self) -> bool {
        self.auth == AuthMode::Signature
    }

    /// Routes expect a bearer token
    #[inline]
    #[must_use]
    pub fn bearer_auth(&self) -> bool {
        self.auth == AuthMode::Bearer
    }
}

// Exact match only: "True" or "1" do not enable anything.
fn is_true(doc: &ConfigDocument, key: &str) -> bool {
    doc.get(key) == Some("true")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> ConfigDocument {
        ConfigDocument::parse(text).unwrap()
    }

    #[test]
    fn empty_document_enables_nothing() {
        let caps = Capabilities::from_document(&ConfigDocument::new());
        assert!(!caps.apigateway);
        assert!(!caps.eventbridge);
        assert!(!caps.vpc);
        assert!(caps.no_auth());
        assert!(!caps.prefix_names_with_org);
        assert!(!caps.prefix_paths_with_org);
    }

    #[test]
    fn toggles_require_exact_true() {
        let caps = Capabilities::from_document(&doc(
            "SUBSTRATE_APIGATEWAY_ENABLE=True\nSUBSTRATE_EVENTBRIDGE_ENABLE=true\nSUBSTRATE_PREFIX_NAMES_WITH_ORG=1",
        ));
        assert!(!caps.apigateway);
        assert!(caps.eventbridge);
        assert!(!caps.prefix_names_with_org);
    }

    #[test]
    fn vpc_requires_both_keys() {
        let subnets_only = doc("SUBSTRATE_VPC_SUBNET_IDS=subnet-1");
        assert!(!Capabilities::from_document(&subnets_only).vpc);

        let groups_only = doc("SUBSTRATE_VPC_SECURITY_GROUP_IDS=sg-1");
        assert!(!Capabilities::from_document(&groups_only).vpc);

        let both = doc("SUBSTRATE_VPC_SUBNET_IDS=subnet-1\nSUBSTRATE_VPC_SECURITY_GROUP_IDS=sg-1");
        assert!(Capabilities::from_document(&both).vpc);
    }

    #[test]
    fn auth_modes() {
        let iam = Capabilities::from_document(&doc("SUBSTRATE_APIGATEWAY_AUTH_TYPE=AWS_IAM"));
        assert!(iam.signature_auth());
        assert!(!iam.no_auth());

        let jwt = Capabilities::from_document(&doc("SUBSTRATE_APIGATEWAY_AUTH_TYPE=JWT"));
        assert!(jwt.bearer_auth());

        let custom = Capabilities::from_document(&doc("SUBSTRATE_APIGATEWAY_AUTH_TYPE=CUSTOM"));
        assert_eq!(custom.auth, AuthMode::Unrecognized("CUSTOM".to_string()));
        assert!(!custom.no_auth() && !custom.signature_auth() && !custom.bearer_auth());
    }
}
