use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use quotedesk_clients::{ClientDraft, ClientId};
use quotedesk_core::{DomainError, DomainResult, Entity, RecordId, UserId, ValueObject};
use quotedesk_tax::{LineFigures, TaxSummary};

/// Quotation identifier (owner-scoped via the `owner_id` field on the record).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuotationId(pub RecordId);

impl QuotationId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for QuotationId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Catalog item identifier. The catalog itself is an external collaborator;
/// goods lines only carry the link.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub RecordId);

impl ItemId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ItemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Quotation status lifecycle.
///
/// Manual transitions only move between `Open` and `Hold`. Progression to
/// `Running` and `Closed` is driven by the fulfillment workflow, and once a
/// quotation reaches either of those states no manual change is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotationStatus {
    Open,
    Hold,
    Running,
    Closed,
}

impl QuotationStatus {
    /// States in which manual status edits are rejected.
    pub fn is_locked(self) -> bool {
        matches!(self, QuotationStatus::Running | QuotationStatus::Closed)
    }

    /// Status for a newly created quotation.
    ///
    /// `None` defaults to `Open`. Requesting `Running`/`Closed` at creation
    /// is rejected: those states are reached through fulfillment, and
    /// accepting them here would bypass the manual-transition rule.
    pub fn initial(requested: Option<QuotationStatus>) -> DomainResult<QuotationStatus> {
        match requested {
            None => Ok(QuotationStatus::Open),
            Some(s @ (QuotationStatus::Open | QuotationStatus::Hold)) => Ok(s),
            Some(s) => Err(DomainError::conflict(format!(
                "a new quotation cannot start as '{s:?}'"
            ))),
        }
    }

    /// Apply a requested manual transition on update.
    ///
    /// An omitted status preserves the current one; unrelated field edits
    /// never advance the state machine. An explicit no-op request is
    /// accepted. Everything else is rejected rather than silently ignored.
    pub fn transition(self, requested: Option<QuotationStatus>) -> DomainResult<QuotationStatus> {
        let Some(next) = requested else {
            return Ok(self);
        };

        if next == self {
            return Ok(self);
        }

        if self.is_locked() {
            return Err(DomainError::conflict(format!(
                "quotation status '{self:?}' cannot be changed manually"
            )));
        }

        match (self, next) {
            (QuotationStatus::Open, QuotationStatus::Hold)
            | (QuotationStatus::Hold, QuotationStatus::Open) => Ok(next),
            _ => Err(DomainError::conflict(format!(
                "illegal status transition '{self:?}' -> '{next:?}'"
            ))),
        }
    }
}

/// Billing address: four free-text fields plus the jurisdiction that drives
/// the tax split. Never validated against a postal authority.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BillingAddress {
    pub line1: String,
    pub line2: String,
    pub city: String,
    pub postal_code: String,
    pub jurisdiction: String,
}

impl ValueObject for BillingAddress {}

/// One priced entry within a quotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoodsLine {
    pub item_id: Option<ItemId>,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
    pub unit_price: f64,
    pub tax_rate: f64,
    /// quantity × unit_price, always recomputed server-side.
    pub amount: f64,
}

impl ValueObject for GoodsLine {}

impl GoodsLine {
    pub fn figures(&self) -> LineFigures {
        LineFigures::new(self.quantity, self.unit_price, self.tax_rate)
    }
}

/// Goods line as submitted by a caller, before validation and pricing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GoodsLineDraft {
    #[serde(default)]
    pub item_id: Option<ItemId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub tax_rate: Option<f64>,
}

impl GoodsLineDraft {
    /// Structural validation before pricing: quantity must be present and
    /// positive, unit price present and non-negative, and the line needs
    /// either a description or a catalog item to describe it.
    pub fn validate(&self, line_no: usize) -> DomainResult<()> {
        match self.quantity {
            Some(q) if q.is_finite() && q > 0.0 => {}
            _ => {
                return Err(DomainError::invalid_input(format!(
                    "goods line {line_no}: quantity must be positive"
                )));
            }
        }
        match self.unit_price {
            Some(p) if p.is_finite() && p >= 0.0 => {}
            _ => {
                return Err(DomainError::invalid_input(format!(
                    "goods line {line_no}: unit price must be non-negative"
                )));
            }
        }
        let has_description = self
            .description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty());
        if !has_description && self.item_id.is_none() {
            return Err(DomainError::invalid_input(format!(
                "goods line {line_no}: description or catalog item is required"
            )));
        }
        Ok(())
    }

    pub fn figures(&self) -> LineFigures {
        LineFigures {
            quantity: self.quantity,
            unit_price: self.unit_price,
            tax_rate: self.tax_rate,
        }
    }
}

/// Aggregate totals, always derived from goods lines and the billing
/// jurisdiction, never accepted verbatim from a caller.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct QuotationTotals {
    pub total_quantity: f64,
    pub total_amount: f64,
    pub tax_amount: f64,
    pub grand_total: f64,
}

impl ValueObject for QuotationTotals {}

impl From<&TaxSummary> for QuotationTotals {
    fn from(summary: &TaxSummary) -> Self {
        Self {
            total_quantity: summary.total_quantity,
            total_amount: summary.total_amount,
            tax_amount: summary.tax_amount,
            grand_total: summary.grand_total,
        }
    }
}

/// A priced offer document issued to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quotation {
    pub id: QuotationId,
    pub owner_id: UserId,
    pub client_id: ClientId,
    /// Human-readable reference, unique per owner.
    pub reference: String,
    pub issued_on: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub status: QuotationStatus,
    pub billing: BillingAddress,
    pub goods: Vec<GoodsLine>,
    pub totals: QuotationTotals,
    pub terms: Option<String>,
    pub dispatch_through: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Quotation {
    type Id = QuotationId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn owner_id(&self) -> UserId {
        self.owner_id
    }
}

/// Upsert payload for a quotation. Totals are deliberately absent: they are
/// always recomputed from `goods` and `billing`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct QuotationDraft {
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub client: ClientDraft,
    #[serde(default)]
    pub issued_on: Option<NaiveDate>,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default)]
    pub status: Option<QuotationStatus>,
    #[serde(default)]
    pub billing: BillingAddress,
    #[serde(default)]
    pub goods: Vec<GoodsLineDraft>,
    #[serde(default)]
    pub terms: Option<String>,
    #[serde(default)]
    pub dispatch_through: Option<String>,
}

impl QuotationDraft {
    /// The reference number is mandatory on every upsert.
    pub fn require_reference(&self) -> DomainResult<String> {
        self.reference
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .ok_or_else(|| DomainError::invalid_input("reference number is required"))
    }
}
