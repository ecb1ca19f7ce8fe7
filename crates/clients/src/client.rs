use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quotedesk_core::{DomainError, DomainResult, Entity, RecordId, UserId};

/// Client identifier (owner-scoped via the `owner_id` field on the record).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub RecordId);

impl ClientId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ClientId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Lowercase + trim. Applied before every comparison and every write so
/// case-variant inputs never create duplicate clients.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Uppercase + trim, same discipline as [`normalize_email`].
pub fn normalize_tax_id(tax_id: &str) -> String {
    tax_id.trim().to_uppercase()
}

/// A client record.
///
/// `(email, owner_id)` and `(tax_id, owner_id)` are each unique; the store
/// layer enforces this. `quotation_refs` is the denormalized back-reference
/// set of quotations pointing at this client, maintained additively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub owner_id: UserId,
    pub email: String,
    pub tax_id: String,
    pub company: String,
    pub contact_name: Option<String>,
    pub phone: Option<String>,
    pub quotation_refs: BTreeSet<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub fn new(
        id: ClientId,
        owner_id: UserId,
        email: &str,
        company: &str,
        tax_id: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id,
            email: normalize_email(email),
            tax_id: normalize_tax_id(tax_id),
            company: company.trim().to_string(),
            contact_name: None,
            phone: None,
            quotation_refs: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply the draft's present fields after normalization.
    ///
    /// Returns whether anything actually changed, so callers can skip the
    /// write (and the updated_at bump) for a no-op resolution.
    pub fn merge(&mut self, draft: &ClientDraft) -> bool {
        let mut changed = false;

        if let Some(email) = &draft.email {
            let email = normalize_email(email);
            if !email.is_empty() && email != self.email {
                self.email = email;
                changed = true;
            }
        }
        if let Some(tax_id) = &draft.tax_id {
            let tax_id = normalize_tax_id(tax_id);
            if !tax_id.is_empty() && tax_id != self.tax_id {
                self.tax_id = tax_id;
                changed = true;
            }
        }
        if let Some(company) = &draft.company {
            let company = company.trim();
            if !company.is_empty() && company != self.company {
                self.company = company.to_string();
                changed = true;
            }
        }
        if let Some(contact_name) = &draft.contact_name {
            if Some(contact_name) != self.contact_name.as_ref() {
                self.contact_name = Some(contact_name.clone());
                changed = true;
            }
        }
        if let Some(phone) = &draft.phone {
            if Some(phone) != self.phone.as_ref() {
                self.phone = Some(phone.clone());
                changed = true;
            }
        }

        changed
    }

    /// Idempotent set-add of a quotation back-reference.
    pub fn add_quotation_ref(&mut self, quotation: RecordId) -> bool {
        self.quotation_refs.insert(quotation)
    }

    /// Targeted set-remove of a quotation back-reference.
    pub fn remove_quotation_ref(&mut self, quotation: RecordId) -> bool {
        self.quotation_refs.remove(&quotation)
    }
}

impl Entity for Client {
    type Id = ClientId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn owner_id(&self) -> UserId {
        self.owner_id
    }
}

/// Client payload carried by an upsert request.
///
/// Either `id` points at an existing client (fields then act as a partial
/// update), or the draft must carry enough to create one: email, company
/// and tax id.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClientDraft {
    #[serde(default)]
    pub id: Option<ClientId>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl ClientDraft {
    pub fn for_existing(id: ClientId) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    /// Validate the fields required to create a new client, returning them
    /// normalized as `(email, company, tax_id)`.
    pub fn require_create_fields(&self) -> DomainResult<(String, String, String)> {
        let email = self
            .email
            .as_deref()
            .map(normalize_email)
            .filter(|e| !e.is_empty())
            .ok_or_else(|| DomainError::invalid_input("client email is required"))?;
        let company = self
            .company
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .ok_or_else(|| DomainError::invalid_input("client company name is required"))?;
        let tax_id = self
            .tax_id
            .as_deref()
            .map(normalize_tax_id)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| DomainError::invalid_input("client tax id is required"))?;

        Ok((email, company, tax_id))
    }
}
