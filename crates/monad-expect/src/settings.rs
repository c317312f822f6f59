//! External inputs and tuning
//!
//! The test runner hands over exactly three required inputs through the
//! environment:
//!
//! | Variable | Meaning |
//! |---|---|
//! | `SUBSTRATE_NAME` | substrate to resolve |
//! | `SUBSTRATE_FEATURES` | comma separated overlays, may be empty |
//! | `FUNCTION_PATH` | local directory of the function under test |
//!
//! Optional `MONAD_*` variables tune region, parameter prefix and timeouts.

use crate::error::{ExpectError, ExpectResult};
use monad_substrate::ParameterLayout;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// Required inputs describing what is under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpectationInputs {
    /// Substrate name
    pub substrate: String,
    /// Feature overlays, in application order
    pub features: Vec<String>,
    /// Local function directory
    pub function_path: PathBuf,
}

impl ExpectationInputs {
    /// Substrate name variable
    pub const SUBSTRATE_NAME: &'static str = "SUBSTRATE_NAME";
    /// Feature list variable
    pub const SUBSTRATE_FEATURES: &'static str = "SUBSTRATE_FEATURES";
    /// Function path variable
    pub const FUNCTION_PATH: &'static str = "FUNCTION_PATH";

    /// Create inputs directly
    #[must_use]
    pub fn new(
        substrate: impl Into<String>,
        features: impl IntoIterator<Item = impl Into<String>>,
        function_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            substrate: substrate.into(),
            features: features.into_iter().map(Into::into).collect(),
            function_path: function_path.into(),
        }
    }

    /// Read inputs from the process environment
    ///
    /// # Errors
    /// Returns `ExpectError::MissingInput` naming the first absent variable.
    pub fn from_env() -> ExpectResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read inputs through an arbitrary lookup
    ///
    /// # Errors
    /// Returns `ExpectError::MissingInput` naming the first absent variable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ExpectResult<Self> {
        let substrate = lookup(Self::SUBSTRATE_NAME)
            .ok_or(ExpectError::MissingInput(Self::SUBSTRATE_NAME))?;
        let features = lookup(Self::SUBSTRATE_FEATURES)
            .ok_or(ExpectError::MissingInput(Self::SUBSTRATE_FEATURES))?;
        let function_path = lookup(Self::FUNCTION_PATH)
            .ok_or(ExpectError::MissingInput(Self::FUNCTION_PATH))?;

        Ok(Self {
            substrate,
            features: parse_features(&features),
            function_path: PathBuf::from(function_path),
        })
    }
}

/// Split a comma separated feature list, dropping blanks
#[must_use]
pub fn parse_features(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}

/// Optional resolution tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolverSettings {
    /// Region used in ARNs
    pub region: String,
    /// Root of substrate parameters
    pub parameter_prefix: String,
    /// Bound on each collaborator call
    pub lookup_timeout: Duration,
}

impl ResolverSettings {
    /// Region variable
    pub const REGION: &'static str = "MONAD_REGION";
    /// Parameter prefix variable
    pub const PARAMETER_PREFIX: &'static str = "MONAD_PARAMETER_PREFIX";
    /// Timeout variable, in milliseconds
    pub const LOOKUP_TIMEOUT_MS: &'static str = "MONAD_LOOKUP_TIMEOUT_MS";

    /// Create default settings
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With region
    #[inline]
    #[must_use]
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    /// With parameter prefix
    #[inline]
    #[must_use]
    pub fn with_parameter_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.parameter_prefix = prefix.into();
        self
    }

    /// With lookup timeout
    #[inline]
    #[must_use]
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    /// Parameter layout for these settings
    #[must_use]
    pub fn layout(&self) -> ParameterLayout {
        ParameterLayout::new(self.parameter_prefix.clone())
    }

    /// Read settings from the process environment, defaulting what is unset
    ///
    /// # Errors
    /// Returns `ExpectError::InvalidSetting` for an unparsable timeout.
    pub fn from_env() -> ExpectResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary lookup
    ///
    /// # Errors
    /// Returns `ExpectError::InvalidSetting` for an unparsable or zero timeout,
    /// or a blank region or prefix.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ExpectResult<Self> {
        let mut settings = Self::default();

        if let Some(region) = lookup(Self::REGION) {
            if region.trim().is_empty() {
                return Err(ExpectError::InvalidSetting {
                    name: Self::REGION,
                    value: region,
                });
            }
            settings.region = region.trim().to_string();
        }

        if let Some(prefix) = lookup(Self::PARAMETER_PREFIX) {
            if !prefix.starts_with('/') {
                return Err(ExpectError::InvalidSetting {
                    name: Self::PARAMETER_PREFIX,
                    value: prefix,
                });
            }
            settings.parameter_prefix = prefix;
        }

        if let Some(raw) = lookup(Self::LOOKUP_TIMEOUT_MS) {
            let millis = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|ms| *ms > 0)
                .ok_or_else(|| ExpectError::InvalidSetting {
                    name: Self::LOOKUP_TIMEOUT_MS,
                    value: raw.clone(),
                })?;
            settings.lookup_timeout = Duration::from_millis(millis);
        }

        Ok(settings)
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            region: "us-west-2".to_string(),
            parameter_prefix: ParameterLayout::DEFAULT_PREFIX.to_string(),
            lookup_timeout: Duration::from_secs(10),
        }
    }
}
