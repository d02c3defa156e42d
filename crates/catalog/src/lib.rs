//! Catalog domain module: the city-scoped overlay over one shared catalog.
//!
//! This crate contains the catalog entities and every rule that decides how a city's
//! view of them changes, implemented purely as deterministic domain logic (no IO, no
//! HTTP, no storage). Stores load a [`CatalogView`], ask a planner what to write, and
//! apply the returned plan inside their own transaction.

pub mod assignment;
pub mod carousel;
pub mod category;
pub mod entity_type;
pub mod event;
pub mod fields;
pub mod import;
pub mod ordering;
pub mod overlay;
pub mod product;
pub mod view;

pub use assignment::{
    AssignOutcome, AssignPlan, Assignment, UnassignOutcome, UnassignPlan, plan_assign, plan_unassign,
};
pub use carousel::{CarouselItem, CarouselUpdate, NewCarouselItem};
pub use category::{Category, CategoryUpdate, NewCategory, NewSubCategory, SubCategory, SubCategoryUpdate};
pub use entity_type::EntityType;
pub use event::{CatalogEvent, CityChange, EntityChange};
pub use import::{ImportOutcome, ImportPlan, ImportScope, plan_import};
pub use ordering::{CategoryOrder, MoveDirection};
pub use overlay::{EditOutcome, EditPlan, plan_edit};
pub use product::{NewProduct, Product, ProductPatch};
pub use view::{CatalogEntity, CatalogView, SnapshotView};
