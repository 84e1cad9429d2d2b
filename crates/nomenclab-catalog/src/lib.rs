//! # nomenclab-catalog
//!
//! Memoized views of the remotely-owned Analysis aggregate, and the
//! membership-reconciliation engine for the NBU ↔ NomenclatureVersion
//! relationship.
//!
//! The center of the crate is [`CatalogService`]: it owns the single-flight
//! root cache of the full Analysis collection, derives deduplicated entity
//! listings from it, keeps an independent memoized map of version → NBU
//! membership, and turns desired membership sets into minimal pairwise
//! associate/disassociate calls with partial-failure handling.
//!
//! Cache values are immutable snapshots behind `Arc`s; they are replaced
//! wholesale, never patched in place. Every mutation that goes through the
//! service invalidates the root cache, so derived listings never serve
//! stale entities after a write.
//!
//! ## Modules
//!
//! - [`error`] - [`CatalogError`] and outcome reporting
//! - [`single_flight`] - The shared-fetch cell under both caches
//! - [`root_cache`] - Paginated fetch + reassembly of the Analysis collection
//! - [`version_cache`] - Memoized version → NBU membership map
//! - [`fanout`] - Fire-and-collect concurrent call helper
//! - [`reconcile`] - Membership diffing and the reconcile outcome
//! - [`service`] - The [`CatalogService`] facade

pub mod error;
pub mod fanout;
pub mod reconcile;
pub mod root_cache;
pub mod service;
pub mod single_flight;
pub mod version_cache;

pub use error::CatalogError;
pub use reconcile::{ReconcileOutcome, membership_diff};
pub use service::CatalogService;
