//! Monad Endpoint
//!
//! Resolves the public URL of the substrate's HTTP API: the custom domain
//! mapped to it when one exists, otherwise the generated default endpoint.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod error;
pub mod resolver;
pub mod routing;

// Re-exports for convenience
pub use error::{EndpointError, EndpointResult, LookupError};
pub use resolver::EndpointResolver;
pub use routing::{ApiDescription, ApiMapping, DomainName, Page, RoutingService};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
