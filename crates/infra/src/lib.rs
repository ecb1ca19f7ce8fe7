//! Infrastructure layer: transactional storage, orchestration, external
//! collaborator interfaces.

pub mod backup;
pub mod catalog;
pub mod client_resolver;
pub mod deletion;
pub mod engine;
pub mod query;
pub mod sequence;
pub mod ticket_sync;
pub mod unit_of_work;

#[cfg(test)]
mod integration_tests;

pub use backup::{BackupId, BackupRecord, BackupRegistry, BackupSource, EntityKind};
pub use catalog::{CatalogItem, InMemoryItemCatalog, ItemCatalog};
pub use deletion::DeletionCoordinator;
pub use engine::QuotationEngine;
pub use query::{PageResult, Pagination, QuotationFilter, Sort, SortDir, SortKey};
pub use unit_of_work::{DocumentSet, InMemoryUnitOfWork, UnitOfWork};
