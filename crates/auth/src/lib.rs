//! `quotedesk-auth` — authorization boundary for the sales-document engine.
//!
//! This crate is intentionally decoupled from HTTP and storage: it only
//! defines the caller identity (`AuthContext`) and the role set that gates
//! owner-scoping.

pub mod context;
pub mod roles;

pub use context::AuthContext;
pub use roles::Role;
