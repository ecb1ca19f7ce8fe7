//! Quotation lifecycle orchestration (application-level).
//!
//! `QuotationEngine` is the single entry point for quotation mutations. Every
//! mutation runs this pipeline inside one [`UnitOfWork`] transaction:
//!
//! ```text
//! Upsert payload
//!   ↓
//! 1. Require a reference number
//!   ↓
//! 2. Per-owner reference-uniqueness check (excluding the record under update)
//!   ↓
//! 3. Resolve/create/update the client (ClientResolver)
//!   ↓
//! 4. Validate goods lines, snapshot catalog descriptions
//!   ↓
//! 5. Recompute totals (TaxCalculator); submitted totals are discarded
//!   ↓
//! 6. Enforce the status transition rule, persist
//!   ↓
//! 7. Maintain the client back-reference (idempotent set-add)
//!   ↓
//! 8. Propagate to linked tickets (update flow only)
//! ```
//!
//! Any step's failure aborts the whole transaction: no orphan client, no
//! half-updated quotation, no stale ticket is ever visible. Deletion runs
//! through the [`DeletionCoordinator`] in the same discipline.

use chrono::Utc;

use quotedesk_auth::AuthContext;
use quotedesk_clients::{Client, ClientId};
use quotedesk_core::{DomainError, DomainResult, RecordId};
use quotedesk_quotations::{
    GoodsLine, Quotation, QuotationDraft, QuotationId, QuotationStatus,
};
use quotedesk_tax::{LineFigures, TaxCalculator};
use quotedesk_tickets::{Ticket, TicketId};

use crate::backup::{BackupId, BackupRecord};
use crate::catalog::ItemCatalog;
use crate::client_resolver;
use crate::deletion::DeletionCoordinator;
use crate::query::{PageResult, Pagination, QuotationFilter, Sort, SortDir, SortKey};
use crate::sequence;
use crate::ticket_sync;
use crate::unit_of_work::UnitOfWork;

/// Application service for the quotation lifecycle.
///
/// Generic over the transaction primitive and the catalog so tests can run
/// fully in memory and a persistent backend can be swapped in without
/// touching domain code.
pub struct QuotationEngine<U, C> {
    uow: U,
    catalog: C,
    tax: TaxCalculator,
    deletion: DeletionCoordinator,
}

impl<U, C> QuotationEngine<U, C>
where
    U: UnitOfWork,
    C: ItemCatalog,
{
    pub fn new(uow: U, catalog: C, tax: TaxCalculator) -> Self {
        Self {
            uow,
            catalog,
            tax,
            deletion: DeletionCoordinator::with_defaults(),
        }
    }

    /// Create or fully update a quotation.
    ///
    /// `quotation_id` selects the update path; `None` creates. Aggregate
    /// totals submitted by the caller are always discarded and recomputed
    /// from the goods lines and the billing jurisdiction.
    pub fn upsert(
        &self,
        ctx: &AuthContext,
        quotation_id: Option<QuotationId>,
        draft: &QuotationDraft,
    ) -> DomainResult<Quotation> {
        let now = Utc::now();

        let result = self.uow.transact(|docs| {
            let reference = draft.require_reference()?;

            // Update path loads first: the uniqueness and client scopes
            // belong to the record's owner, not necessarily the caller.
            let existing = match quotation_id {
                Some(id) => Some(docs.quotation_scoped(ctx, id)?.clone()),
                None => None,
            };
            let owner = existing.as_ref().map(|q| q.owner_id).unwrap_or(ctx.user_id);

            if docs.reference_taken(owner, &reference, quotation_id) {
                return Err(DomainError::conflict(format!(
                    "reference number '{reference}' is already in use"
                )));
            }

            let client_id = client_resolver::resolve_for_upsert(docs, owner, &draft.client, now)?;

            // Linking a client owned by another user is a super-admin move.
            let client_owner = docs
                .clients
                .get(&client_id)
                .map(|c| c.owner_id)
                .ok_or_else(|| DomainError::storage("resolved client missing from store"))?;
            if client_owner != owner && !ctx.role.can_cross_owners() {
                return Err(DomainError::Unauthorized);
            }

            if draft.goods.is_empty() {
                return Err(DomainError::invalid_input(
                    "quotation must have at least one goods line",
                ));
            }
            let mut goods = self.resolve_goods(draft)?;

            let figures: Vec<LineFigures> = draft.goods.iter().map(|g| g.figures()).collect();
            let summary = self.tax.compute(&figures, &draft.billing.jurisdiction);
            for (line, computed) in goods.iter_mut().zip(&summary.lines) {
                line.quantity = computed.quantity;
                line.unit_price = computed.unit_price;
                line.tax_rate = computed.tax_rate;
                line.amount = computed.amount;
            }

            let quotation = match &existing {
                None => Quotation {
                    id: QuotationId::new(RecordId::new()),
                    owner_id: owner,
                    client_id,
                    reference: reference.clone(),
                    issued_on: draft.issued_on.unwrap_or_else(|| now.date_naive()),
                    valid_until: draft.valid_until,
                    status: QuotationStatus::initial(draft.status)?,
                    billing: draft.billing.clone(),
                    goods,
                    totals: (&summary).into(),
                    terms: draft.terms.clone(),
                    dispatch_through: draft.dispatch_through.clone(),
                    created_at: now,
                    updated_at: now,
                },
                Some(prev) => Quotation {
                    id: prev.id,
                    owner_id: prev.owner_id,
                    client_id,
                    reference: reference.clone(),
                    issued_on: draft.issued_on.unwrap_or(prev.issued_on),
                    valid_until: draft.valid_until,
                    status: prev.status.transition(draft.status)?,
                    billing: draft.billing.clone(),
                    goods,
                    totals: (&summary).into(),
                    terms: draft.terms.clone(),
                    dispatch_through: draft.dispatch_through.clone(),
                    created_at: prev.created_at,
                    updated_at: now,
                },
            };

            docs.quotations.insert(quotation.id, quotation.clone());

            let client = docs
                .clients
                .get_mut(&client_id)
                .ok_or_else(|| DomainError::storage("resolved client missing from store"))?;
            client.add_quotation_ref(quotation.id.0);
            let client = client.clone();

            if existing.is_some() {
                ticket_sync::sync_from_quotation(docs, &quotation, &client, &self.tax, now)?;
            }

            Ok(quotation)
        });

        match &result {
            Ok(q) => tracing::info!(
                quotation = %q.id,
                reference = %q.reference,
                owner = %q.owner_id,
                created = quotation_id.is_none(),
                "quotation upserted"
            ),
            Err(e) => tracing::debug!(error = %e, "quotation upsert rejected"),
        }

        result
    }

    /// Delete a quotation after writing its backup, cascading to linked
    /// tickets. Returns the backup id.
    pub fn delete(&self, ctx: &AuthContext, id: QuotationId) -> DomainResult<BackupId> {
        let now = Utc::now();
        self.uow.transact(|docs| self.deletion.run(docs, ctx, id, now))
    }

    /// Allocate the next quotation reference from the per-purpose sequence.
    pub fn allocate_reference(&self) -> DomainResult<String> {
        self.uow.transact(|docs| Ok(sequence::next_reference(docs)))
    }

    /// Whether `reference` is free for the caller's owner scope.
    pub fn check_reference_available(
        &self,
        ctx: &AuthContext,
        reference: &str,
    ) -> DomainResult<bool> {
        let reference = reference.trim().to_string();
        self.uow
            .read(|docs| !docs.reference_taken(ctx.user_id, &reference, None))
    }

    pub fn get(&self, ctx: &AuthContext, id: QuotationId) -> DomainResult<Quotation> {
        self.uow
            .read(|docs| docs.quotation_scoped(ctx, id).cloned())?
    }

    pub fn find_by_reference(&self, ctx: &AuthContext, reference: &str) -> DomainResult<Quotation> {
        let reference = reference.trim().to_string();
        self.uow.read(|docs| {
            if ctx.role.can_cross_owners() {
                let mut matches: Vec<&Quotation> = docs
                    .quotations
                    .values()
                    .filter(|q| q.reference == reference)
                    .collect();
                matches.sort_by_key(|q| (q.owner_id, q.id));
                matches
                    .first()
                    .map(|q| (*q).clone())
                    .ok_or(DomainError::NotFound)
            } else {
                docs.quotation_by_reference(ctx.user_id, &reference)
                    .cloned()
                    .ok_or(DomainError::NotFound)
            }
        })?
    }

    /// List quotations visible to the caller, filtered, sorted and paginated.
    pub fn list(
        &self,
        ctx: &AuthContext,
        filter: &QuotationFilter,
        pagination: Pagination,
        sort: Sort,
    ) -> DomainResult<PageResult<Quotation>> {
        self.uow.read(|docs| {
            let needle = filter
                .search
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_lowercase);

            let mut items: Vec<Quotation> = docs
                .quotations
                .values()
                .filter(|q| ctx.can_access(q.owner_id))
                .filter(|q| filter.status.is_none_or(|s| q.status == s))
                .filter(|q| match &needle {
                    None => true,
                    Some(n) => {
                        q.reference.to_lowercase().contains(n)
                            || docs.clients.get(&q.client_id).is_some_and(|c| {
                                c.company.to_lowercase().contains(n) || c.email.contains(n)
                            })
                    }
                })
                .cloned()
                .collect();

            items.sort_by(|a, b| {
                let ord = match sort.key {
                    SortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                    SortKey::IssuedOn => a.issued_on.cmp(&b.issued_on),
                    SortKey::Reference => a.reference.cmp(&b.reference),
                };
                let ord = ord.then_with(|| a.id.cmp(&b.id));
                match sort.dir {
                    SortDir::Asc => ord,
                    SortDir::Desc => ord.reverse(),
                }
            });

            let total = items.len() as u64;
            let start = (pagination.offset as usize).min(items.len());
            let end = start
                .saturating_add(pagination.limit as usize)
                .min(items.len());
            let has_more = end < items.len();

            PageResult {
                items: items[start..end].to_vec(),
                total,
                pagination,
                has_more,
            }
        })
    }

    /// Open a fulfillment ticket for an owned quotation, snapshotting its
    /// current fields and recomputing the ticket's own tax figures.
    pub fn open_ticket(&self, ctx: &AuthContext, reference: &str) -> DomainResult<Ticket> {
        let now = Utc::now();
        let reference = reference.trim().to_string();

        self.uow.transact(|docs| {
            let quotation = docs
                .quotation_by_reference(ctx.user_id, &reference)
                .cloned()
                .ok_or(DomainError::NotFound)?;
            let client = docs
                .clients
                .get(&quotation.client_id)
                .cloned()
                .ok_or(DomainError::NotFound)?;

            let ticket = Ticket::from_quotation(
                TicketId::new(RecordId::new()),
                &quotation,
                &client,
                &self.tax,
                now,
            );
            docs.tickets.insert(ticket.id, ticket.clone());
            Ok(ticket)
        })
    }

    /// Tickets linked to `reference` that are visible to the caller.
    pub fn tickets_for_reference(
        &self,
        ctx: &AuthContext,
        reference: &str,
    ) -> DomainResult<Vec<Ticket>> {
        let reference = reference.trim().to_string();
        self.uow.read(|docs| {
            let mut tickets: Vec<Ticket> = docs
                .tickets
                .values()
                .filter(|t| t.reference_key == reference && ctx.can_access(t.owner_id))
                .cloned()
                .collect();
            tickets.sort_by_key(|t| t.id);
            tickets
        })
    }

    pub fn get_client(&self, ctx: &AuthContext, id: ClientId) -> DomainResult<Client> {
        self.uow.read(|docs| {
            docs.clients
                .get(&id)
                .filter(|c| ctx.can_access(c.owner_id))
                .cloned()
                .ok_or(DomainError::NotFound)
        })?
    }

    pub fn list_clients(&self, ctx: &AuthContext) -> DomainResult<Vec<Client>> {
        self.uow.read(|docs| {
            let mut clients: Vec<Client> = docs
                .clients
                .values()
                .filter(|c| ctx.can_access(c.owner_id))
                .cloned()
                .collect();
            clients.sort_by(|a, b| a.company.cmp(&b.company).then_with(|| a.id.cmp(&b.id)));
            clients
        })
    }

    /// Backup records visible to the caller (own deletions, or everything
    /// for a super-admin).
    pub fn list_backups(&self, ctx: &AuthContext) -> DomainResult<Vec<BackupRecord>> {
        self.uow.read(|docs| {
            let mut backups: Vec<BackupRecord> = docs
                .backups
                .values()
                .filter(|b| ctx.role.can_cross_owners() || b.deleted_by == ctx.user_id)
                .cloned()
                .collect();
            backups.sort_by_key(|b| (b.deleted_at, b.id));
            backups
        })
    }

    fn resolve_goods(&self, draft: &QuotationDraft) -> DomainResult<Vec<GoodsLine>> {
        let mut goods = Vec::with_capacity(draft.goods.len());

        for (idx, line) in draft.goods.iter().enumerate() {
            line.validate(idx + 1)?;

            let catalog_item = line.item_id.and_then(|id| self.catalog.lookup(&id));

            let description = match line
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
            {
                Some(d) => d.to_string(),
                // validate() guarantees item_id is present here.
                None => catalog_item
                    .as_ref()
                    .map(|i| i.name.clone())
                    .ok_or_else(|| {
                        DomainError::invalid_input(format!(
                            "goods line {}: catalog item not found",
                            idx + 1
                        ))
                    })?,
            };

            let unit = line
                .unit
                .as_deref()
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string)
                .or_else(|| catalog_item.as_ref().map(|i| i.unit.clone()))
                .unwrap_or_default();

            goods.push(GoodsLine {
                item_id: line.item_id,
                description,
                quantity: 0.0,
                unit,
                unit_price: 0.0,
                tax_rate: 0.0,
                amount: 0.0,
            });
        }

        Ok(goods)
    }
}
