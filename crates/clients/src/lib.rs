//! Clients domain module.
//!
//! This crate contains the client record and its normalization rules,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage).

pub mod client;

pub use client::{normalize_email, normalize_tax_id, Client, ClientDraft, ClientId};
