//! # nomenclab-gateway
//!
//! Remote gateway for the catalog client.
//!
//! The [`CatalogGateway`] trait is the seam every higher layer depends on;
//! [`HttpCatalogGateway`] is the reqwest-backed implementation. Every
//! remote failure is mapped into the [`nomenclab_core::RemoteError`]
//! taxonomy before it leaves this crate, and every mutating call attaches
//! the user-identity and bearer headers derived from the session context.
//!
//! No call is ever retried automatically.
//!
//! ## Modules
//!
//! - [`gateway`] - The [`CatalogGateway`] trait
//! - [`http`] - reqwest implementation
//! - [`config`] - Client profile configuration (toml file, env override)

pub mod config;
pub mod gateway;
pub mod http;

pub use config::{ConfigError, GatewayConfig};
pub use gateway::CatalogGateway;
pub use http::HttpCatalogGateway;
