//! Jurisdiction-aware tax computation.
//!
//! This crate contains business rules for pricing quotation lines,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). The single entry point is [`TaxCalculator::compute`].

pub mod calculator;

pub use calculator::{ComputedLine, LineFigures, TaxCalculator, TaxConfig, TaxSummary};
