//! Catalog persistence boundary.
//!
//! A [`CatalogStore`] owns the catalog entities, the market registry, the assignment
//! index and the category order. Every mutation runs as one transaction: the store
//! reads what it needs into a [`citycat_catalog::CatalogView`], asks the domain planner
//! what to write, and applies the plan before committing. A rejected plan leaves nothing
//! behind.
//!
//! Two implementations ship:
//! - [`InMemoryCatalogStore`]: a single `RwLock` over all tables (tests/dev).
//! - [`PostgresCatalogStore`]: row-locking transactions over the schema in `schema.sql`.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use thiserror::Error;
use uuid::Uuid;

use citycat_catalog::{
    AssignPlan, CarouselItem, CarouselUpdate, CatalogEntity, Category, CategoryOrder, CategoryUpdate, EditPlan,
    EntityType, ImportPlan, ImportScope, MoveDirection, NewCarouselItem, NewCategory, NewProduct, NewSubCategory,
    Product, ProductPatch, SubCategory, SubCategoryUpdate, UnassignPlan,
};
use citycat_core::{CarouselItemId, CatalogError, CategoryId, CityId, ExpectedVersion, ProductId, SubCategoryId};
use citycat_markets::{City, CityUpdate, NewCity};

pub use in_memory::InMemoryCatalogStore;
pub use postgres::PostgresCatalogStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Store operation error.
///
/// Domain rejections pass through unchanged; everything else is a backend failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] CatalogError),

    /// A concurrent writer won a uniqueness race; the operation can be retried.
    #[error("write conflict: {0}")]
    Conflict(String),

    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    pub fn domain(&self) -> Option<&CatalogError> {
        match self {
            StoreError::Domain(e) => Some(e),
            _ => None,
        }
    }

    /// Stable machine-readable code (used in API error bodies and logs).
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Domain(e) => e.code(),
            StoreError::Conflict(_) => "conflict",
            StoreError::Backend(_) => "backend_error",
        }
    }
}

/// The catalog, market registry, assignment index and category order behind one
/// transactional boundary.
///
/// Reads of missing cities in city-scoped operations fail with `InvalidCity`; plain
/// entity lookups fail with `NotFound`.
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    // Market registry

    async fn create_city(&self, new: NewCity) -> StoreResult<City>;
    async fn get_city(&self, id: CityId) -> StoreResult<City>;
    /// Cities by `sortOrder`, then name.
    async fn list_cities(&self) -> StoreResult<Vec<City>>;
    async fn update_city(&self, id: CityId, update: CityUpdate) -> StoreResult<City>;
    /// Returns the city and whether the flag actually changed.
    async fn set_city_active(&self, id: CityId, active: bool) -> StoreResult<(City, bool)>;
    /// Hard delete. Returns the number of assignment rows removed with it.
    async fn delete_city(&self, id: CityId) -> StoreResult<usize>;

    // Categories and the global order

    /// Appends the category at the end of the order.
    async fn create_category(&self, new: NewCategory) -> StoreResult<Category>;
    async fn get_category(&self, id: CategoryId) -> StoreResult<Category>;
    /// Categories in global order.
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn update_category(&self, id: CategoryId, update: CategoryUpdate) -> StoreResult<Category>;
    /// Removes the category, its subcategories and all of their assignments, then closes
    /// the gap in the order. Fails while products still reference the category.
    async fn delete_category(&self, id: CategoryId) -> StoreResult<()>;
    async fn category_order(&self) -> StoreResult<CategoryOrder>;
    async fn reorder_categories(
        &self,
        category_ids: Vec<CategoryId>,
        expected: ExpectedVersion,
    ) -> StoreResult<CategoryOrder>;
    /// Returns the resulting order and whether anything moved.
    async fn move_category(
        &self,
        id: CategoryId,
        direction: MoveDirection,
        expected: ExpectedVersion,
    ) -> StoreResult<(CategoryOrder, bool)>;

    // Subcategories

    /// Creates the subcategory and assigns it to every city its parent is assigned to.
    /// Returns those cities alongside the record.
    async fn create_sub_category(&self, new: NewSubCategory) -> StoreResult<(SubCategory, Vec<CityId>)>;
    async fn get_sub_category(&self, id: SubCategoryId) -> StoreResult<SubCategory>;
    async fn list_sub_categories(&self, parent: Option<CategoryId>) -> StoreResult<Vec<SubCategory>>;
    async fn update_sub_category(&self, id: SubCategoryId, update: SubCategoryUpdate) -> StoreResult<SubCategory>;
    /// Fails while products still reference the subcategory.
    async fn delete_sub_category(&self, id: SubCategoryId) -> StoreResult<()>;

    // Products

    async fn create_product(&self, new: NewProduct) -> StoreResult<Product>;
    async fn get_product(&self, id: ProductId) -> StoreResult<Product>;
    async fn list_products(&self, category: Option<CategoryId>) -> StoreResult<Vec<Product>>;
    /// Removes the product and its assignments; its forks become originals.
    async fn delete_product(&self, id: ProductId) -> StoreResult<()>;
    /// Every city the product is assigned to, in id order.
    async fn cities_assigned_to(&self, id: ProductId) -> StoreResult<Vec<CityId>>;
    /// The product as `city` sees it: the exact record if assigned, otherwise the city's
    /// member of the same lineage.
    async fn product_in_city(&self, city: CityId, id: ProductId) -> StoreResult<Product>;
    /// Clone-on-write edit. The sharing check and the write happen in one transaction.
    async fn edit_product_in_city(&self, city: CityId, id: ProductId, patch: ProductPatch) -> StoreResult<EditPlan>;

    // Carousel

    async fn create_carousel_item(&self, new: NewCarouselItem) -> StoreResult<CarouselItem>;
    async fn get_carousel_item(&self, id: CarouselItemId) -> StoreResult<CarouselItem>;
    async fn list_carousel_items(&self) -> StoreResult<Vec<CarouselItem>>;
    async fn update_carousel_item(&self, id: CarouselItemId, update: CarouselUpdate) -> StoreResult<CarouselItem>;
    async fn delete_carousel_item(&self, id: CarouselItemId) -> StoreResult<()>;

    // Assignment index

    /// Applies and returns the assign plan (empty when everything was already assigned).
    async fn assign(&self, city: CityId, entity_type: EntityType, ids: Vec<Uuid>) -> StoreResult<AssignPlan>;
    async fn unassign(&self, city: CityId, entity_type: EntityType, ids: Vec<Uuid>) -> StoreResult<UnassignPlan>;
    async fn list_assigned(&self, city: CityId, entity_type: EntityType) -> StoreResult<Vec<CatalogEntity>>;
    /// Entities of `entity_type` not assigned to `city`, optionally filtered by name.
    async fn list_assignable(
        &self,
        city: CityId,
        entity_type: EntityType,
        query: Option<String>,
    ) -> StoreResult<Vec<CatalogEntity>>;
    async fn import(&self, target: CityId, source: CityId, scope: ImportScope) -> StoreResult<ImportPlan>;
}

macro_rules! forward_store {
    ($( async fn $name:ident(&self $(, $arg:ident : $ty:ty)* ) -> $ret:ty; )*) => {
        #[async_trait::async_trait]
        impl<S> CatalogStore for Arc<S>
        where
            S: CatalogStore + ?Sized,
        {
            $(
                async fn $name(&self $(, $arg: $ty)*) -> $ret {
                    (**self).$name($($arg),*).await
                }
            )*
        }
    };
}

forward_store! {
    async fn create_city(&self, new: NewCity) -> StoreResult<City>;
    async fn get_city(&self, id: CityId) -> StoreResult<City>;
    async fn list_cities(&self) -> StoreResult<Vec<City>>;
    async fn update_city(&self, id: CityId, update: CityUpdate) -> StoreResult<City>;
    async fn set_city_active(&self, id: CityId, active: bool) -> StoreResult<(City, bool)>;
    async fn delete_city(&self, id: CityId) -> StoreResult<usize>;
    async fn create_category(&self, new: NewCategory) -> StoreResult<Category>;
    async fn get_category(&self, id: CategoryId) -> StoreResult<Category>;
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;
    async fn update_category(&self, id: CategoryId, update: CategoryUpdate) -> StoreResult<Category>;
    async fn delete_category(&self, id: CategoryId) -> StoreResult<()>;
    async fn category_order(&self) -> StoreResult<CategoryOrder>;
    async fn reorder_categories(&self, category_ids: Vec<CategoryId>, expected: ExpectedVersion) -> StoreResult<CategoryOrder>;
    async fn move_category(&self, id: CategoryId, direction: MoveDirection, expected: ExpectedVersion) -> StoreResult<(CategoryOrder, bool)>;
    async fn create_sub_category(&self, new: NewSubCategory) -> StoreResult<(SubCategory, Vec<CityId>)>;
    async fn get_sub_category(&self, id: SubCategoryId) -> StoreResult<SubCategory>;
    async fn list_sub_categories(&self, parent: Option<CategoryId>) -> StoreResult<Vec<SubCategory>>;
    async fn update_sub_category(&self, id: SubCategoryId, update: SubCategoryUpdate) -> StoreResult<SubCategory>;
    async fn delete_sub_category(&self, id: SubCategoryId) -> StoreResult<()>;
    async fn create_product(&self, new: NewProduct) -> StoreResult<Product>;
    async fn get_product(&self, id: ProductId) -> StoreResult<Product>;
    async fn list_products(&self, category: Option<CategoryId>) -> StoreResult<Vec<Product>>;
    async fn delete_product(&self, id: ProductId) -> StoreResult<()>;
    async fn cities_assigned_to(&self, id: ProductId) -> StoreResult<Vec<CityId>>;
    async fn product_in_city(&self, city: CityId, id: ProductId) -> StoreResult<Product>;
    async fn edit_product_in_city(&self, city: CityId, id: ProductId, patch: ProductPatch) -> StoreResult<EditPlan>;
    async fn create_carousel_item(&self, new: NewCarouselItem) -> StoreResult<CarouselItem>;
    async fn get_carousel_item(&self, id: CarouselItemId) -> StoreResult<CarouselItem>;
    async fn list_carousel_items(&self) -> StoreResult<Vec<CarouselItem>>;
    async fn update_carousel_item(&self, id: CarouselItemId, update: CarouselUpdate) -> StoreResult<CarouselItem>;
    async fn delete_carousel_item(&self, id: CarouselItemId) -> StoreResult<()>;
    async fn assign(&self, city: CityId, entity_type: EntityType, ids: Vec<Uuid>) -> StoreResult<AssignPlan>;
    async fn unassign(&self, city: CityId, entity_type: EntityType, ids: Vec<Uuid>) -> StoreResult<UnassignPlan>;
    async fn list_assigned(&self, city: CityId, entity_type: EntityType) -> StoreResult<Vec<CatalogEntity>>;
    async fn list_assignable(&self, city: CityId, entity_type: EntityType, query: Option<String>) -> StoreResult<Vec<CatalogEntity>>;
    async fn import(&self, target: CityId, source: CityId, scope: ImportScope) -> StoreResult<ImportPlan>;
}
