//! Client resolution for the upsert path.
//!
//! A quotation upsert carries either an existing client id or a full client
//! payload. Resolution runs inside the caller's transaction: a conflict
//! raised here aborts the whole upsert.

use chrono::{DateTime, Utc};

use quotedesk_clients::{Client, ClientDraft, ClientId};
use quotedesk_core::{DomainError, DomainResult, RecordId, UserId};

use crate::unit_of_work::DocumentSet;

/// Resolve the client a quotation should point at, creating or updating the
/// record as needed. `owner` is the quotation's owning user, which scopes
/// the email/tax-id uniqueness checks.
pub fn resolve_for_upsert(
    docs: &mut DocumentSet,
    owner: UserId,
    draft: &ClientDraft,
    now: DateTime<Utc>,
) -> DomainResult<ClientId> {
    match draft.id {
        Some(id) => resolve_existing(docs, id, draft, now),
        None => resolve_by_fields(docs, owner, draft, now),
    }
}

/// By-id path: the id is trusted regardless of owner (administrators may
/// re-link clients across owners); fields act as a partial update and are
/// persisted only when something actually changed.
fn resolve_existing(
    docs: &mut DocumentSet,
    id: ClientId,
    draft: &ClientDraft,
    now: DateTime<Utc>,
) -> DomainResult<ClientId> {
    let stored = docs.clients.get(&id).ok_or(DomainError::NotFound)?;

    let mut updated = stored.clone();
    if !updated.merge(draft) {
        return Ok(id);
    }

    ensure_unique(docs, &updated)?;
    updated.updated_at = now;
    docs.clients.insert(id, updated);
    Ok(id)
}

/// Field path: look up by normalized `(email, owner)`; update in place if
/// found, otherwise verify the tax id is free and create a new client.
fn resolve_by_fields(
    docs: &mut DocumentSet,
    owner: UserId,
    draft: &ClientDraft,
    now: DateTime<Utc>,
) -> DomainResult<ClientId> {
    let (email, company, tax_id) = draft.require_create_fields()?;

    if let Some(existing) = docs.client_by_email(owner, &email) {
        let id = existing.id;
        let mut updated = existing.clone();
        if updated.merge(draft) {
            ensure_unique(docs, &updated)?;
            updated.updated_at = now;
            docs.clients.insert(id, updated);
        }
        return Ok(id);
    }

    if docs.client_by_tax_id(owner, &tax_id).is_some() {
        return Err(DomainError::conflict(format!(
            "a client with tax id '{tax_id}' already exists"
        )));
    }

    let mut client = Client::new(ClientId::new(RecordId::new()), owner, &email, &company, &tax_id, now);
    client.contact_name = draft.contact_name.clone();
    client.phone = draft.phone.clone();

    let id = client.id;
    docs.clients.insert(id, client);
    Ok(id)
}

/// Per-owner uniqueness of email and tax id against every *other* client.
fn ensure_unique(docs: &DocumentSet, candidate: &Client) -> DomainResult<()> {
    if let Some(other) = docs.client_by_email(candidate.owner_id, &candidate.email) {
        if other.id != candidate.id {
            return Err(DomainError::conflict(format!(
                "a client with email '{}' already exists",
                candidate.email
            )));
        }
    }
    if let Some(other) = docs.client_by_tax_id(candidate.owner_id, &candidate.tax_id) {
        if other.id != candidate.id {
            return Err(DomainError::conflict(format!(
                "a client with tax id '{}' already exists",
                candidate.tax_id
            )));
        }
    }
    Ok(())
}
