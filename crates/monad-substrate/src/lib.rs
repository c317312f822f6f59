//! Monad Substrate
//!
//! Resolves the configuration a function is deployed against. A substrate
//! is a named environment whose baseline document lives in a hierarchical
//! parameter store; named feature overlays customize it.
//!
//! # Architecture
//!
//! ```text
//! ParameterStore ──get──▶ ConfigDocument (base) ─┐
//!                ──get──▶ ConfigDocument (f1)  ──┤ fold, last write wins
//!                ──get──▶ ConfigDocument (fn)  ──┘
//!                                                 ▼
//!                                  SubstrateConfig + Capabilities
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use monad_substrate::SubstrateResolver;
//!
//! # async fn example(
//! #     store: std::sync::Arc<dyn monad_substrate::ParameterStore>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = SubstrateResolver::new(store);
//! let config = resolver.resolve("ager", &["api".to_string()]).await?;
//!
//! if config.capabilities().apigateway {
//!     println!("gateway {}", config.require("SUBSTRATE_APIGATEWAY_ID")?);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod capability;
pub mod document;
pub mod error;
pub mod resolver;
pub mod store;

// Re-exports for convenience
pub use capability::{keys, AuthMode, Capabilities};
pub use document::ConfigDocument;
pub use error::{DocumentError, StoreError, SubstrateError, SubstrateResult};
pub use resolver::{SubstrateConfig, SubstrateResolver};
pub use store::{ParameterLayout, ParameterStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
