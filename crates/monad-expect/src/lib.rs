//! Monad Expect
//!
//! The values a deployed serverless function is verified against, derived
//! from the same inputs the deployer used:
//!
//! - **Substrate**: layered configuration and capability gates
//! - **Identity**: resource names, paths, route keys and ARNs from git
//! - **Endpoint**: the public URL of the HTTP API
//!
//! ```text
//! SUBSTRATE_NAME ─┐
//! SUBSTRATE_FEATURES ─┼──▶ VerificationExpectations ──▶ assertions
//! FUNCTION_PATH ──┘         (resolved once, memoized)
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod bus;
pub mod error;
pub mod expectations;
pub mod settings;

// Re-exports for convenience
pub use error::{ExpectError, ExpectResult};
pub use expectations::{Collaborators, ExpectationSnapshot, VerificationExpectations};
pub use settings::{parse_features, ExpectationInputs, ResolverSettings};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
