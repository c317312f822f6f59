//! Monad Identity
//!
//! Derives the deterministic identity of a function under test from where
//! its source lives: repository origin, branch and directory name.
//!
//! # Example
//!
//! ```rust,ignore
//! use monad_identity::{GitCli, IdentityResolver, NamingPolicy};
//!
//! # async fn example(
//! #     caller: std::sync::Arc<dyn monad_identity::CallerIdentity>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = IdentityResolver::new(std::sync::Arc::new(GitCli::new()), caller);
//! let identity = resolver
//!     .resolve("functions/echo".as_ref(), NamingPolicy::new(true, false))
//!     .await?;
//!
//! println!("{} → {}", identity.resource_name(), identity.route_key());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod account;
pub mod error;
pub mod identity;
pub mod origin;
pub mod vcs;

// Re-exports for convenience
pub use account::{AccountId, CallerIdentity, ResourceArns};
pub use error::{IdentityError, IdentityResult};
pub use identity::{
    resource_name, resource_path, route_key, IdentityResolver, NamingPolicy, ResourceIdentity,
};
pub use origin::OriginUrl;
pub use vcs::{function_base_name, has_modified_entries, GitCli, VcsReader, VcsSnapshot};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
