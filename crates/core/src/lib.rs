//! `citycat-core`: shared building blocks for the city catalog overlay.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers, the error taxonomy every layer maps to, and the
//! optimistic-concurrency expectation used by the category ordering.

pub mod entity;
pub mod error;
pub mod id;
pub mod validate;
pub mod version;

pub use entity::Entity;
pub use error::{CatalogError, CatalogResult};
pub use id::{CarouselItemId, CategoryId, CityId, ProductId, SubCategoryId};
pub use validate::required;
pub use version::ExpectedVersion;
