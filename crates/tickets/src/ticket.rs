use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quotedesk_clients::{Client, ClientId};
use quotedesk_core::{Entity, RecordId, UserId, ValueObject};
use quotedesk_quotations::{tombstone_key, GoodsLine, Quotation};
use quotedesk_tax::TaxCalculator;

/// Ticket identifier (owner-scoped via the `owner_id` field on the record).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub RecordId);

impl TicketId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for TicketId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Ticket status lifecycle, owned by the fulfillment workflow.
///
/// A ticket accepts synchronized overwrites from its quotation only while it
/// has not reached a finalized state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Open,
    InProgress,
    Hold,
    Invoiced,
    Closed,
}

impl TicketStatus {
    /// Late-stage statuses: the ticket's figures are settled and must not be
    /// overwritten by quotation edits.
    pub fn is_finalized(self) -> bool {
        matches!(self, TicketStatus::Invoiced | TicketStatus::Closed)
    }

    pub fn accepts_sync(self) -> bool {
        !self.is_finalized()
    }
}

/// One entry in a ticket's status history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: TicketStatus,
    pub to: TicketStatus,
    pub note: String,
    pub changed_at: DateTime<Utc>,
}

/// Shipping address. When `mirrors_billing` is set, synchronization
/// overwrites these fields from the quotation's billing address.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShippingAddress {
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub postal_code: String,
    pub jurisdiction: String,
    pub mirrors_billing: bool,
}

impl ValueObject for ShippingAddress {}

/// A fulfillment record derived from exactly one quotation.
///
/// The link is the denormalized `reference_key` (the quotation's reference
/// number), not a foreign key; `client_id` is a direct relational pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub owner_id: UserId,
    pub reference_key: String,
    pub client_id: ClientId,
    pub client_company: String,
    pub client_email: String,
    pub shipping: ShippingAddress,
    pub goods: Vec<GoodsLine>,
    pub total_quantity: f64,
    pub total_amount: f64,
    pub cgst: f64,
    pub sgst: f64,
    pub igst: f64,
    pub tax_amount: f64,
    pub grand_total: f64,
    pub terms: Option<String>,
    pub status: TicketStatus,
    pub status_history: Vec<StatusChange>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Create a ticket from an accepted quotation.
    pub fn from_quotation(
        id: TicketId,
        quotation: &Quotation,
        client: &Client,
        calc: &TaxCalculator,
        now: DateTime<Utc>,
    ) -> Self {
        let mut ticket = Self {
            id,
            owner_id: quotation.owner_id,
            reference_key: quotation.reference.clone(),
            client_id: client.id,
            client_company: client.company.clone(),
            client_email: client.email.clone(),
            shipping: ShippingAddress {
                line1: quotation.billing.line1.clone(),
                line2: quotation.billing.line2.clone(),
                city: quotation.billing.city.clone(),
                postal_code: quotation.billing.postal_code.clone(),
                jurisdiction: quotation.billing.jurisdiction.clone(),
                mirrors_billing: true,
            },
            goods: quotation.goods.clone(),
            total_quantity: 0.0,
            total_amount: 0.0,
            cgst: 0.0,
            sgst: 0.0,
            igst: 0.0,
            tax_amount: 0.0,
            grand_total: 0.0,
            terms: quotation.terms.clone(),
            status: TicketStatus::Open,
            status_history: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        ticket.recompute_totals(calc);
        ticket
    }

    /// Overwrite the synchronized field subset from the quotation: client
    /// identity, billing-derived shipping fields (only when this ticket
    /// mirrors billing), goods snapshot and terms. Callers must check
    /// [`TicketStatus::accepts_sync`] first and recompute totals after.
    pub fn apply_quotation_snapshot(
        &mut self,
        quotation: &Quotation,
        client: &Client,
        now: DateTime<Utc>,
    ) {
        self.client_id = client.id;
        self.client_company = client.company.clone();
        self.client_email = client.email.clone();

        if self.shipping.mirrors_billing {
            self.shipping.line1 = quotation.billing.line1.clone();
            self.shipping.line2 = quotation.billing.line2.clone();
            self.shipping.city = quotation.billing.city.clone();
            self.shipping.postal_code = quotation.billing.postal_code.clone();
            self.shipping.jurisdiction = quotation.billing.jurisdiction.clone();
        }

        self.goods = quotation.goods.clone();
        self.terms = quotation.terms.clone();
        self.updated_at = now;
    }

    /// Recompute this ticket's own tax figures from its goods snapshot and
    /// its own shipping jurisdiction. Synchronization always calls this
    /// after overwriting fields so the stored totals never go stale.
    pub fn recompute_totals(&mut self, calc: &TaxCalculator) {
        let figures: Vec<_> = self.goods.iter().map(|g| g.figures()).collect();
        let summary = calc.compute(&figures, &self.shipping.jurisdiction);

        self.total_quantity = summary.total_quantity;
        self.total_amount = summary.total_amount;
        self.cgst = summary.cgst;
        self.sgst = summary.sgst;
        self.igst = summary.igst;
        self.tax_amount = summary.tax_amount;
        self.grand_total = summary.grand_total;
    }

    /// Record a status change in the ticket's own lifecycle.
    pub fn set_status(&mut self, to: TicketStatus, note: &str, now: DateTime<Utc>) {
        if to == self.status {
            return;
        }
        self.status_history.push(StatusChange {
            from: self.status,
            to,
            note: note.to_string(),
            changed_at: now,
        });
        self.status = to;
        self.updated_at = now;
    }

    /// Force the ticket on hold (cascade from a quotation deletion).
    pub fn force_hold(&mut self, note: &str, now: DateTime<Utc>) {
        self.set_status(TicketStatus::Hold, note, now);
    }

    /// Tombstone the link key so lookups never resolve to a deleted
    /// quotation.
    pub fn tombstone_link(&mut self) {
        self.reference_key = tombstone_key(&self.reference_key);
    }
}

impl Entity for Ticket {
    type Id = TicketId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn owner_id(&self) -> UserId {
        self.owner_id
    }
}
