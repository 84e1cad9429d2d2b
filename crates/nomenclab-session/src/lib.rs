//! # nomenclab-session
//!
//! Session context for the catalog client.
//!
//! This crate owns the bearer token, decodes its claim set without
//! verifying the signature (the remote store is the authority; the client
//! only needs a normalized view of the claims) and derives:
//!
//! - A normalized role set, whatever shape the `roles` claim takes
//! - A fail-closed expiry view of the `exp` claim
//! - A user-identity header value for mutating remote calls
//!
//! Claim decoding is defensive throughout: a malformed token degrades to an
//! empty role set and an already-expired session, never to an error.
//!
//! ## Modules
//!
//! - [`claims`] - Token payload decoding and role-claim normalization
//! - [`context`] - The [`SessionContext`] state holder and its channels

pub mod claims;
pub mod context;

pub use claims::{RoleClaim, expires_at, normalize_roles, roles_from_token};
pub use context::{RequestIdentity, SessionContext, UserSnapshot};
