//! Backup-before-delete catalog.
//!
//! A deletion is only allowed once the full document has been written to
//! the backup table inside the same transaction. Capture handlers are
//! registered per entity kind at startup in an explicit registry; storage
//! collections are never resolved by runtime name.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use quotedesk_clients::ClientId;
use quotedesk_core::{DomainError, DomainResult, RecordId, UserId};
use quotedesk_quotations::QuotationId;
use quotedesk_tickets::TicketId;

use crate::unit_of_work::DocumentSet;

/// Backup record identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BackupId(pub RecordId);

impl BackupId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for BackupId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Entity kinds the backup catalog knows how to capture.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Quotation,
    Client,
    Ticket,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Quotation => "quotation",
            EntityKind::Client => "client",
            EntityKind::Ticket => "ticket",
        }
    }
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A durably captured copy of a deleted document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub id: BackupId,
    pub entity_kind: EntityKind,
    pub entity_id: RecordId,
    pub document: JsonValue,
    pub deleted_by: UserId,
    pub deleted_at: DateTime<Utc>,
}

/// Captures the full JSON document of one entity kind.
pub trait BackupSource: Send + Sync {
    fn capture(&self, docs: &DocumentSet, entity_id: RecordId) -> DomainResult<JsonValue>;
}

fn to_document<T: Serialize>(value: &T) -> DomainResult<JsonValue> {
    serde_json::to_value(value).map_err(|e| DomainError::storage(e.to_string()))
}

struct QuotationSource;

impl BackupSource for QuotationSource {
    fn capture(&self, docs: &DocumentSet, entity_id: RecordId) -> DomainResult<JsonValue> {
        let quotation = docs
            .quotations
            .get(&QuotationId::new(entity_id))
            .ok_or(DomainError::NotFound)?;
        to_document(quotation)
    }
}

struct ClientSource;

impl BackupSource for ClientSource {
    fn capture(&self, docs: &DocumentSet, entity_id: RecordId) -> DomainResult<JsonValue> {
        let client = docs
            .clients
            .get(&ClientId::new(entity_id))
            .ok_or(DomainError::NotFound)?;
        to_document(client)
    }
}

struct TicketSource;

impl BackupSource for TicketSource {
    fn capture(&self, docs: &DocumentSet, entity_id: RecordId) -> DomainResult<JsonValue> {
        let ticket = docs
            .tickets
            .get(&TicketId::new(entity_id))
            .ok_or(DomainError::NotFound)?;
        to_document(ticket)
    }
}

/// Explicit entity-kind → capture-handler map, populated at startup.
pub struct BackupRegistry {
    handlers: HashMap<EntityKind, Box<dyn BackupSource>>,
}

impl BackupRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with the built-in handlers for every known entity kind.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(EntityKind::Quotation, Box::new(QuotationSource));
        registry.register(EntityKind::Client, Box::new(ClientSource));
        registry.register(EntityKind::Ticket, Box::new(TicketSource));
        registry
    }

    pub fn register(&mut self, kind: EntityKind, handler: Box<dyn BackupSource>) {
        self.handlers.insert(kind, handler);
    }

    /// Capture the entity's full document and append a backup record.
    ///
    /// Runs inside the caller's transaction: if the capture or anything
    /// after it fails, the backup write is rolled back with the rest.
    pub fn backup(
        &self,
        docs: &mut DocumentSet,
        kind: EntityKind,
        entity_id: RecordId,
        deleted_by: UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<BackupId> {
        let handler = self.handlers.get(&kind).ok_or_else(|| {
            DomainError::storage(format!("no backup handler registered for '{kind}'"))
        })?;
        let document = handler.capture(docs, entity_id)?;

        let id = BackupId::new(RecordId::new());
        docs.backups.insert(
            id,
            BackupRecord {
                id,
                entity_kind: kind,
                entity_id,
                document,
                deleted_by,
                deleted_at: now,
            },
        );
        Ok(id)
    }
}

impl Default for BackupRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
