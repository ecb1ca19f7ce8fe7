//! Transactional storage abstraction.
//!
//! Every multi-step mutation in the engine runs inside one
//! [`UnitOfWork::transact`] call: the closure receives a working
//! [`DocumentSet`], a returned `Ok` commits it atomically, any `Err` aborts
//! and discards every change. Concurrent readers never observe partial
//! state.
//!
//! The in-memory implementation is the reference implementation used by
//! tests and dev; a persistent backend implements the same trait against
//! its own session/transaction primitive.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use quotedesk_auth::AuthContext;
use quotedesk_clients::{Client, ClientId};
use quotedesk_core::{DomainError, DomainResult, UserId};
use quotedesk_quotations::{Quotation, QuotationId};
use quotedesk_tickets::{Ticket, TicketId};

use crate::backup::{BackupId, BackupRecord};

/// The full document state visible to one transaction.
///
/// Tables are plain maps; scoped lookups go through the helper methods so
/// owner-scoping rules live in one place.
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    pub quotations: HashMap<QuotationId, Quotation>,
    pub clients: HashMap<ClientId, Client>,
    pub tickets: HashMap<TicketId, Ticket>,
    pub backups: HashMap<BackupId, BackupRecord>,
    /// Monotonic counters keyed by purpose (e.g. "quotation").
    pub sequences: HashMap<String, u64>,
}

impl DocumentSet {
    /// Whether `reference` is already used by a quotation of `owner`,
    /// excluding the record being updated.
    pub fn reference_taken(
        &self,
        owner: UserId,
        reference: &str,
        exclude: Option<QuotationId>,
    ) -> bool {
        self.quotations.values().any(|q| {
            q.owner_id == owner && q.reference == reference && Some(q.id) != exclude
        })
    }

    /// Load a quotation visible to the caller.
    ///
    /// Owner-scoped: a record owned by someone else is `NotFound` for an
    /// ordinary caller, visible to a super-admin.
    pub fn quotation_scoped(
        &self,
        ctx: &AuthContext,
        id: QuotationId,
    ) -> DomainResult<&Quotation> {
        self.quotations
            .get(&id)
            .filter(|q| ctx.can_access(q.owner_id))
            .ok_or(DomainError::NotFound)
    }

    pub fn quotation_by_reference(&self, owner: UserId, reference: &str) -> Option<&Quotation> {
        self.quotations
            .values()
            .find(|q| q.owner_id == owner && q.reference == reference)
    }

    pub fn client_by_email(&self, owner: UserId, email: &str) -> Option<&Client> {
        self.clients
            .values()
            .find(|c| c.owner_id == owner && c.email == email)
    }

    pub fn client_by_tax_id(&self, owner: UserId, tax_id: &str) -> Option<&Client> {
        self.clients
            .values()
            .find(|c| c.owner_id == owner && c.tax_id == tax_id)
    }

    /// Ids of tickets linked to `reference` for `owner`, in a deterministic
    /// order.
    pub fn ticket_ids_by_reference(&self, owner: UserId, reference: &str) -> Vec<TicketId> {
        let mut ids: Vec<TicketId> = self
            .tickets
            .values()
            .filter(|t| t.owner_id == owner && t.reference_key == reference)
            .map(|t| t.id)
            .collect();
        ids.sort();
        ids
    }

    /// Next value of the named sequence (starts at 1).
    pub fn next_sequence(&mut self, purpose: &str) -> u64 {
        let counter = self.sequences.entry(purpose.to_string()).or_insert(0);
        *counter += 1;
        *counter
    }
}

/// Atomic transaction scope over the document state.
pub trait UnitOfWork: Send + Sync {
    /// Run `f` inside one transaction: begin on entry, commit when `f`
    /// returns `Ok`, abort (discarding every change) when it returns `Err`.
    fn transact<T, F>(&self, f: F) -> DomainResult<T>
    where
        F: FnOnce(&mut DocumentSet) -> DomainResult<T>;

    /// Run a read-only closure over the committed state.
    fn read<T, F>(&self, f: F) -> DomainResult<T>
    where
        F: FnOnce(&DocumentSet) -> T;
}

impl<U> UnitOfWork for Arc<U>
where
    U: UnitOfWork + ?Sized,
{
    fn transact<T, F>(&self, f: F) -> DomainResult<T>
    where
        F: FnOnce(&mut DocumentSet) -> DomainResult<T>,
    {
        (**self).transact(f)
    }

    fn read<T, F>(&self, f: F) -> DomainResult<T>
    where
        F: FnOnce(&DocumentSet) -> T,
    {
        (**self).read(f)
    }
}

/// In-memory unit of work.
///
/// Intended for tests/dev. Writers are serialized through the lock; a
/// transaction works on a cloned snapshot that replaces the committed state
/// only on success, so aborts leave no trace and readers never see a
/// half-applied transaction.
#[derive(Debug, Default)]
pub struct InMemoryUnitOfWork {
    state: RwLock<DocumentSet>,
}

impl InMemoryUnitOfWork {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UnitOfWork for InMemoryUnitOfWork {
    fn transact<T, F>(&self, f: F) -> DomainResult<T>
    where
        F: FnOnce(&mut DocumentSet) -> DomainResult<T>,
    {
        let mut guard = self
            .state
            .write()
            .map_err(|_| DomainError::storage("lock poisoned"))?;

        // Begin: snapshot the committed state.
        let mut working = guard.clone();

        match f(&mut working) {
            Ok(value) => {
                // Commit: publish the working copy.
                *guard = working;
                Ok(value)
            }
            // Abort: drop the working copy untouched.
            Err(err) => Err(err),
        }
    }

    fn read<T, F>(&self, f: F) -> DomainResult<T>
    where
        F: FnOnce(&DocumentSet) -> T,
    {
        let guard = self
            .state
            .read()
            .map_err(|_| DomainError::storage("lock poisoned"))?;
        Ok(f(&guard))
    }
}
