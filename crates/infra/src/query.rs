//! Read-side query types for quotation listings.
//!
//! All listings are owner-scoped and paginated by default.

use serde::{Deserialize, Serialize};

use quotedesk_quotations::QuotationStatus;

/// Pagination parameters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of records to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(1000), // Cap at 1000 for safety
            offset: offset.unwrap_or(0),
        }
    }
}

/// Filter criteria for quotation listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotationFilter {
    /// Filter by status (optional).
    pub status: Option<QuotationStatus>,
    /// Case-insensitive free-text search across the reference number and the
    /// resolved client's company name and email (optional).
    pub search: Option<String>,
}

/// Sort key for quotation listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    CreatedAt,
    IssuedOn,
    Reference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDir {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Sort {
    pub key: SortKey,
    pub dir: SortDir,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            key: SortKey::CreatedAt,
            dir: SortDir::Desc,
        }
    }
}

/// Paginated listing result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult<T> {
    /// The records on this page.
    pub items: Vec<T>,
    /// Total number of records matching the filter (across all pages).
    pub total: u64,
    /// Pagination parameters used.
    pub pagination: Pagination,
    /// Whether there are more records available.
    pub has_more: bool,
}
