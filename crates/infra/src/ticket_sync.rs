//! Propagation from quotations to their fulfillment tickets.
//!
//! Tickets are linked by the quotation's reference number, not by foreign
//! key, and own their status progression. Synchronization only ever
//! overwrites the fixed field subset on tickets that have not been
//! finalized, and always runs inside the caller's transaction.

use chrono::{DateTime, Utc};

use quotedesk_clients::Client;
use quotedesk_core::{DomainResult, UserId};
use quotedesk_quotations::Quotation;
use quotedesk_tax::TaxCalculator;

use crate::unit_of_work::DocumentSet;

/// Note appended to a ticket's status history when a cascade forces it on
/// hold.
pub const HOLD_NOTE: &str = "quotation deleted; ticket placed on hold";

/// Overwrite the synchronized field subset on every linked, non-finalized
/// ticket and let each ticket recompute its own tax figures.
///
/// Returns how many tickets were synchronized.
pub fn sync_from_quotation(
    docs: &mut DocumentSet,
    quotation: &Quotation,
    client: &Client,
    calc: &TaxCalculator,
    now: DateTime<Utc>,
) -> DomainResult<usize> {
    let ids = docs.ticket_ids_by_reference(quotation.owner_id, &quotation.reference);
    let mut synced = 0;

    for id in ids {
        let Some(ticket) = docs.tickets.get_mut(&id) else {
            continue;
        };
        if !ticket.status.accepts_sync() {
            tracing::debug!(ticket = %id, status = ?ticket.status, "skipping finalized ticket");
            continue;
        }

        ticket.apply_quotation_snapshot(quotation, client, now);
        ticket.recompute_totals(calc);
        synced += 1;
    }

    Ok(synced)
}

/// Cascade a quotation deletion to its linked tickets.
///
/// Every linked ticket gets a tombstoned link key; tickets that are not yet
/// finalized are additionally forced on hold with a history entry.
pub fn cascade_delete(
    docs: &mut DocumentSet,
    owner: UserId,
    reference: &str,
    now: DateTime<Utc>,
) -> usize {
    let ids = docs.ticket_ids_by_reference(owner, reference);
    let touched = ids.len();

    for id in ids {
        let Some(ticket) = docs.tickets.get_mut(&id) else {
            continue;
        };

        ticket.tombstone_link();
        if !ticket.status.is_finalized() {
            ticket.force_hold(HOLD_NOTE, now);
        }
        ticket.updated_at = now;
    }

    touched
}
