//! Reference-number allocation.
//!
//! References come from a per-purpose sequence stored in the transactional
//! document state, so allocation commits atomically and two calls can never
//! hand out the same value. The per-owner uniqueness check at upsert time
//! remains the authoritative guard; callers are free to submit their own
//! references.

use quotedesk_quotations::{format_reference, REFERENCE_PREFIX};

use crate::unit_of_work::DocumentSet;

/// Sequence purpose for quotation references.
pub const QUOTATION_SEQUENCE: &str = "quotation";

/// Allocate the next quotation reference, e.g. `Q-000042`.
pub fn next_reference(docs: &mut DocumentSet) -> String {
    let n = docs.next_sequence(QUOTATION_SEQUENCE);
    format_reference(REFERENCE_PREFIX, n)
}
