//! Read-only item catalog interface.
//!
//! The catalog itself is managed elsewhere; the engine only looks items up
//! to snapshot a line's name/unit when a goods line references a catalog
//! item without carrying its own description.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use quotedesk_quotations::ItemId;

/// Catalog entry as seen by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub unit: String,
    pub unit_price: f64,
    pub tax_rate: f64,
}

/// Read-only lookup into the item catalog.
pub trait ItemCatalog: Send + Sync {
    fn lookup(&self, id: &ItemId) -> Option<CatalogItem>;
}

impl<C> ItemCatalog for Arc<C>
where
    C: ItemCatalog + ?Sized,
{
    fn lookup(&self, id: &ItemId) -> Option<CatalogItem> {
        (**self).lookup(id)
    }
}

/// In-memory catalog for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryItemCatalog {
    items: RwLock<HashMap<ItemId, CatalogItem>>,
}

impl InMemoryItemCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, item: CatalogItem) {
        if let Ok(mut items) = self.items.write() {
            items.insert(item.id, item);
        }
    }
}

impl ItemCatalog for InMemoryItemCatalog {
    fn lookup(&self, id: &ItemId) -> Option<CatalogItem> {
        let items = self.items.read().ok()?;
        items.get(id).cloned()
    }
}
