//! Infrastructure layer: catalog stores (in-memory, Postgres) and the service that
//! publishes change events after each committed mutation.

pub mod service;
pub mod store;


pub use service::{CatalogEnvelope, CatalogService, MoveOutcome};
pub use store::{CatalogStore, InMemoryCatalogStore, PostgresCatalogStore, StoreError, StoreResult};
