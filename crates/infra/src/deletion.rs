//! Delete-with-backup-and-cascade orchestration.

use chrono::{DateTime, Utc};

use quotedesk_auth::AuthContext;
use quotedesk_core::DomainResult;
use quotedesk_quotations::QuotationId;

use crate::backup::{BackupId, BackupRegistry, EntityKind};
use crate::ticket_sync;
use crate::unit_of_work::DocumentSet;

/// Coordinates a quotation deletion: durable backup first, then removal of
/// the live record and the ticket cascade, all inside one transaction.
pub struct DeletionCoordinator {
    registry: BackupRegistry,
}

impl DeletionCoordinator {
    pub fn new(registry: BackupRegistry) -> Self {
        Self { registry }
    }

    pub fn with_defaults() -> Self {
        Self::new(BackupRegistry::with_defaults())
    }

    /// Run the deletion inside the caller's transaction.
    ///
    /// The backup write precedes the live-record removal; if anything after
    /// it fails, the transaction abort rolls the backup back too, so a
    /// committed deletion always has its backup and an aborted one leaves
    /// neither.
    pub fn run(
        &self,
        docs: &mut DocumentSet,
        ctx: &AuthContext,
        id: QuotationId,
        now: DateTime<Utc>,
    ) -> DomainResult<BackupId> {
        let quotation = docs.quotation_scoped(ctx, id)?.clone();

        let backup_id = self.registry.backup(
            docs,
            EntityKind::Quotation,
            quotation.id.0,
            ctx.user_id,
            now,
        )?;

        docs.quotations.remove(&id);

        if let Some(client) = docs.clients.get_mut(&quotation.client_id) {
            client.remove_quotation_ref(quotation.id.0);
        }

        let touched = ticket_sync::cascade_delete(docs, quotation.owner_id, &quotation.reference, now);
        tracing::info!(
            quotation = %quotation.id,
            reference = %quotation.reference,
            tickets = touched,
            "quotation deleted with backup"
        );

        Ok(backup_id)
    }
}

impl Default for DeletionCoordinator {
    fn default() -> Self {
        Self::with_defaults()
    }
}
