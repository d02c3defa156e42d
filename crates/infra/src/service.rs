//! Application-level orchestration of catalog operations.
//!
//! ```text
//! Request
//!   ↓
//! 1. Store call (one transaction: load view, plan, apply, commit)
//!   ↓
//! 2. Build a CatalogEvent from the committed plan
//!   ↓
//! 3. Publish the enveloped event to the bus (SSE fan-out, caches)
//! ```
//!
//! The service owns no state besides the publication sequence. Publication happens
//! strictly after commit; a failed publish is logged and does not fail the call, since
//! the change is already durable.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use citycat_catalog::{
    AssignOutcome, CarouselItem, CarouselUpdate, CatalogEntity, CatalogEvent, Category, CategoryOrder,
    CategoryUpdate, CityChange, EditOutcome, EditPlan, EntityChange, EntityType, ImportOutcome, ImportScope,
    MoveDirection, NewCarouselItem, NewCategory, NewProduct, NewSubCategory, Product, ProductPatch, SubCategory,
    SubCategoryUpdate, UnassignOutcome,
};
use citycat_core::{CarouselItemId, CatalogError, CategoryId, CityId, ExpectedVersion, ProductId, SubCategoryId};
use citycat_events::{EventBus, EventEnvelope};
use citycat_markets::{City, CityUpdate, NewCity};

use crate::store::{CatalogStore, StoreError, StoreResult};

/// Envelope type carried on the catalog bus.
pub type CatalogEnvelope = EventEnvelope<CatalogEvent>;

/// Result of moving a category one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    pub order: CategoryOrder,
    /// `false` when the category was already at the boundary.
    pub moved: bool,
}

/// Catalog operations over any [`CatalogStore`], publishing a [`CatalogEvent`] for every
/// committed change.
///
/// ## Generic Parameters
///
/// - `S`: store implementation ([`crate::store::InMemoryCatalogStore`] in tests,
///   [`crate::store::PostgresCatalogStore`] in production)
/// - `B`: event bus implementation
#[derive(Debug)]
pub struct CatalogService<S, B> {
    store: S,
    bus: B,
    sequence: AtomicU64,
}

impl<S, B> CatalogService<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self {
            store,
            bus,
            sequence: AtomicU64::new(0),
        }
    }
}

impl<S, B> CatalogService<S, B>
where
    S: CatalogStore,
    B: EventBus<CatalogEnvelope>,
{
    fn publish(&self, event: CatalogEvent) {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let envelope = EventEnvelope::wrap(event, sequence);
        let event_type = envelope.event_type().to_string();
        if let Err(e) = self.bus.publish(envelope) {
            warn!(error = ?e, event_type, sequence, "event publication failed after commit");
        }
    }

    fn entity_changed(&self, entity_type: EntityType, entity_id: Uuid, change: EntityChange) {
        self.publish(CatalogEvent::CatalogEntityChanged {
            entity_type,
            entity_id,
            change,
            occurred_at: Utc::now(),
        });
    }

    fn city_changed(&self, city_id: CityId, change: CityChange) {
        self.publish(CatalogEvent::CityChanged {
            city_id,
            change,
            occurred_at: Utc::now(),
        });
    }

    // Market registry

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_city(&self, new: NewCity) -> StoreResult<City> {
        let city = observe(self.store.create_city(new).await)?;
        self.city_changed(city.id, CityChange::Created);
        Ok(city)
    }

    pub async fn get_city(&self, id: CityId) -> StoreResult<City> {
        self.store.get_city(id).await
    }

    pub async fn list_cities(&self) -> StoreResult<Vec<City>> {
        self.store.list_cities().await
    }

    #[instrument(skip(self, update), fields(city_id = %id))]
    pub async fn update_city(&self, id: CityId, update: CityUpdate) -> StoreResult<City> {
        let city = observe(self.store.update_city(id, update).await)?;
        self.city_changed(id, CityChange::Updated);
        Ok(city)
    }

    /// Deactivate a city. Its assignments stay in place; it just stops accepting new
    /// ones until reactivated.
    #[instrument(skip(self), fields(city_id = %id))]
    pub async fn deactivate_city(&self, id: CityId) -> StoreResult<City> {
        let (city, changed) = observe(self.store.set_city_active(id, false).await)?;
        if changed {
            self.city_changed(id, CityChange::Deactivated);
        }
        Ok(city)
    }

    #[instrument(skip(self), fields(city_id = %id))]
    pub async fn activate_city(&self, id: CityId) -> StoreResult<City> {
        let (city, changed) = observe(self.store.set_city_active(id, true).await)?;
        if changed {
            self.city_changed(id, CityChange::Activated);
        }
        Ok(city)
    }

    /// Hard-delete a city and every assignment row it owned. Returns the number of
    /// assignment rows removed.
    #[instrument(skip(self), fields(city_id = %id))]
    pub async fn delete_city(&self, id: CityId) -> StoreResult<usize> {
        let removed = observe(self.store.delete_city(id).await)?;
        info!(removed, "city deleted");
        self.city_changed(id, CityChange::Deleted);
        Ok(removed)
    }

    // Categories

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_category(&self, new: NewCategory) -> StoreResult<Category> {
        let category = observe(self.store.create_category(new).await)?;
        self.entity_changed(EntityType::Category, *category.id.as_uuid(), EntityChange::Created);
        Ok(category)
    }

    pub async fn get_category(&self, id: CategoryId) -> StoreResult<Category> {
        self.store.get_category(id).await
    }

    pub async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        self.store.list_categories().await
    }

    #[instrument(skip(self, update), fields(category_id = %id))]
    pub async fn update_category(&self, id: CategoryId, update: CategoryUpdate) -> StoreResult<Category> {
        let category = observe(self.store.update_category(id, update).await)?;
        self.entity_changed(EntityType::Category, *id.as_uuid(), EntityChange::Updated);
        Ok(category)
    }

    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        observe(self.store.delete_category(id).await)?;
        self.entity_changed(EntityType::Category, *id.as_uuid(), EntityChange::Deleted);
        Ok(())
    }

    pub async fn category_order(&self) -> StoreResult<CategoryOrder> {
        self.store.category_order().await
    }

    /// Replace the whole category order. `OrderConflict` is returned to the caller, who
    /// must re-read the order before resubmitting.
    #[instrument(skip(self, category_ids), fields(count = category_ids.len(), expected = ?expected))]
    pub async fn reorder_categories(
        &self,
        category_ids: Vec<CategoryId>,
        expected: ExpectedVersion,
    ) -> StoreResult<CategoryOrder> {
        let order = observe(self.store.reorder_categories(category_ids, expected).await)?;
        info!(version = order.version(), "categories reordered");
        self.publish(CatalogEvent::CategoriesReordered {
            category_ids: order.ids().to_vec(),
            version: order.version(),
            occurred_at: Utc::now(),
        });
        Ok(order)
    }

    /// Swap a category with its neighbour. Reads the current version first and retries
    /// once if another writer changed the order in between.
    #[instrument(skip(self), fields(category_id = %id, direction = ?direction))]
    pub async fn move_category(&self, id: CategoryId, direction: MoveDirection) -> StoreResult<MoveOutcome> {
        let mut attempts = 0;
        let (order, moved) = loop {
            attempts += 1;
            let version = self.store.category_order().await?.version();
            match self.store.move_category(id, direction, ExpectedVersion::Exact(version)).await {
                Err(StoreError::Domain(CatalogError::OrderConflict { expected, actual })) if attempts < 2 => {
                    debug!(expected, actual, "category order changed during move, retrying");
                }
                other => break observe(other)?,
            }
        };

        if moved {
            info!(version = order.version(), "category moved");
            self.publish(CatalogEvent::CategoriesReordered {
                category_ids: order.ids().to_vec(),
                version: order.version(),
                occurred_at: Utc::now(),
            });
        }
        Ok(MoveOutcome { order, moved })
    }

    // Subcategories

    /// Create a subcategory. Every city that already shows the parent category gets the
    /// new subcategory too.
    #[instrument(skip(self, new), fields(name = %new.name, parent_category_id = %new.parent_category_id))]
    pub async fn create_sub_category(&self, new: NewSubCategory) -> StoreResult<SubCategory> {
        let (sub, cities) = observe(self.store.create_sub_category(new).await)?;
        let sub_id = *sub.id.as_uuid();
        self.entity_changed(EntityType::Subcategory, sub_id, EntityChange::Created);
        for city_id in cities {
            self.publish(CatalogEvent::EntitiesAssigned {
                city_id,
                entity_type: EntityType::Subcategory,
                entity_ids: Vec::new(),
                cascaded_ids: vec![sub_id],
                occurred_at: Utc::now(),
            });
        }
        Ok(sub)
    }

    pub async fn get_sub_category(&self, id: SubCategoryId) -> StoreResult<SubCategory> {
        self.store.get_sub_category(id).await
    }

    pub async fn list_sub_categories(&self, parent: Option<CategoryId>) -> StoreResult<Vec<SubCategory>> {
        self.store.list_sub_categories(parent).await
    }

    #[instrument(skip(self, update), fields(sub_category_id = %id))]
    pub async fn update_sub_category(&self, id: SubCategoryId, update: SubCategoryUpdate) -> StoreResult<SubCategory> {
        let sub = observe(self.store.update_sub_category(id, update).await)?;
        self.entity_changed(EntityType::Subcategory, *id.as_uuid(), EntityChange::Updated);
        Ok(sub)
    }

    #[instrument(skip(self), fields(sub_category_id = %id))]
    pub async fn delete_sub_category(&self, id: SubCategoryId) -> StoreResult<()> {
        observe(self.store.delete_sub_category(id).await)?;
        self.entity_changed(EntityType::Subcategory, *id.as_uuid(), EntityChange::Deleted);
        Ok(())
    }

    // Products

    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_product(&self, new: NewProduct) -> StoreResult<Product> {
        let product = observe(self.store.create_product(new).await)?;
        self.entity_changed(EntityType::Product, *product.id.as_uuid(), EntityChange::Created);
        Ok(product)
    }

    pub async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        self.store.get_product(id).await
    }

    pub async fn list_products(&self, category: Option<CategoryId>) -> StoreResult<Vec<Product>> {
        self.store.list_products(category).await
    }

    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        observe(self.store.delete_product(id).await)?;
        self.entity_changed(EntityType::Product, *id.as_uuid(), EntityChange::Deleted);
        Ok(())
    }

    pub async fn cities_assigned_to(&self, id: ProductId) -> StoreResult<Vec<CityId>> {
        self.store.cities_assigned_to(id).await
    }

    /// What `city` sees for `id`: the product itself, or the city's member of the same
    /// lineage (a fork or the original).
    pub async fn product_in_city(&self, city: CityId, id: ProductId) -> StoreResult<Product> {
        self.store.product_in_city(city, id).await
    }

    /// Edit a product from one city's point of view, forking it when other cities share
    /// it.
    #[instrument(skip(self, patch), fields(city_id = %city, product_id = %id))]
    pub async fn edit_product_in_city(&self, city: CityId, id: ProductId, patch: ProductPatch) -> StoreResult<EditOutcome> {
        let plan = observe(self.store.edit_product_in_city(city, id, patch).await)?;
        let outcome = plan.outcome();
        let occurred_at = Utc::now();
        match plan {
            EditPlan::InPlace(_) => {
                debug!("product patched in place");
                self.publish(CatalogEvent::ProductEdited {
                    city_id: city,
                    product_id: id,
                    occurred_at,
                });
            }
            EditPlan::Fork { fork, replaces } => {
                info!(fork_product_id = %fork.id, origin_product_id = ?fork.origin_product_id, "product forked for city");
                self.publish(CatalogEvent::ProductForked {
                    city_id: city,
                    replaced_product_id: replaces,
                    fork_product_id: fork.id,
                    occurred_at,
                });
            }
        }
        Ok(outcome)
    }

    // Carousel

    #[instrument(skip(self, new), fields(title = %new.title))]
    pub async fn create_carousel_item(&self, new: NewCarouselItem) -> StoreResult<CarouselItem> {
        let item = observe(self.store.create_carousel_item(new).await)?;
        self.entity_changed(EntityType::Carousel, *item.id.as_uuid(), EntityChange::Created);
        Ok(item)
    }

    pub async fn get_carousel_item(&self, id: CarouselItemId) -> StoreResult<CarouselItem> {
        self.store.get_carousel_item(id).await
    }

    pub async fn list_carousel_items(&self) -> StoreResult<Vec<CarouselItem>> {
        self.store.list_carousel_items().await
    }

    #[instrument(skip(self, update), fields(carousel_item_id = %id))]
    pub async fn update_carousel_item(&self, id: CarouselItemId, update: CarouselUpdate) -> StoreResult<CarouselItem> {
        let item = observe(self.store.update_carousel_item(id, update).await)?;
        self.entity_changed(EntityType::Carousel, *id.as_uuid(), EntityChange::Updated);
        Ok(item)
    }

    #[instrument(skip(self), fields(carousel_item_id = %id))]
    pub async fn delete_carousel_item(&self, id: CarouselItemId) -> StoreResult<()> {
        observe(self.store.delete_carousel_item(id).await)?;
        self.entity_changed(EntityType::Carousel, *id.as_uuid(), EntityChange::Deleted);
        Ok(())
    }

    // Assignment index

    #[instrument(skip(self, ids), fields(city_id = %city, entity_type = %entity_type, requested = ids.len()))]
    pub async fn assign(&self, city: CityId, entity_type: EntityType, ids: Vec<Uuid>) -> StoreResult<AssignOutcome> {
        let plan = observe(self.store.assign(city, entity_type, ids).await)?;
        let outcome = plan.outcome();
        if !plan.is_empty() {
            self.publish(CatalogEvent::EntitiesAssigned {
                city_id: city,
                entity_type,
                entity_ids: plan.direct.iter().map(|a| a.entity_id).collect(),
                cascaded_ids: plan.cascaded.iter().map(|a| a.entity_id).collect(),
                occurred_at: Utc::now(),
            });
        }
        Ok(outcome)
    }

    #[instrument(skip(self, ids), fields(city_id = %city, entity_type = %entity_type, requested = ids.len()))]
    pub async fn unassign(&self, city: CityId, entity_type: EntityType, ids: Vec<Uuid>) -> StoreResult<UnassignOutcome> {
        let plan = observe(self.store.unassign(city, entity_type, ids).await)?;
        let outcome = plan.outcome();
        if !plan.is_empty() {
            self.publish(CatalogEvent::EntitiesUnassigned {
                city_id: city,
                entity_type,
                entity_ids: plan.direct.iter().map(|a| a.entity_id).collect(),
                cascaded_ids: plan.cascaded.iter().map(|a| a.entity_id).collect(),
                occurred_at: Utc::now(),
            });
        }
        Ok(outcome)
    }

    pub async fn list_assigned(&self, city: CityId, entity_type: EntityType) -> StoreResult<Vec<CatalogEntity>> {
        self.store.list_assigned(city, entity_type).await
    }

    pub async fn list_assignable(
        &self,
        city: CityId,
        entity_type: EntityType,
        query: Option<String>,
    ) -> StoreResult<Vec<CatalogEntity>> {
        self.store.list_assignable(city, entity_type, query).await
    }

    /// Copy what `source` shows into `target`. Never forks; running it twice adds
    /// nothing the second time.
    #[instrument(skip(self), fields(target_city_id = %target, source_city_id = %source, scope = ?scope))]
    pub async fn import(&self, target: CityId, source: CityId, scope: ImportScope) -> StoreResult<ImportOutcome> {
        let plan = observe(self.store.import(target, source, scope).await)?;
        let outcome = plan.outcome();
        info!(
            products_added = outcome.products_added,
            categories_added = outcome.categories_added,
            sub_categories_added = outcome.sub_categories_added,
            carousel_added = outcome.carousel_added,
            "city import finished"
        );
        if !plan.is_empty() {
            self.publish(CatalogEvent::CityImported {
                city_id: target,
                source_city_id: source,
                scope,
                outcome,
                occurred_at: Utc::now(),
            });
        }
        Ok(outcome)
    }
}

/// Log a failed operation at a level matching its cause.
fn observe<T>(result: StoreResult<T>) -> StoreResult<T> {
    if let Err(e) = &result {
        match e {
            StoreError::Domain(domain) => debug!(code = domain.code(), error = %domain, "operation rejected"),
            StoreError::Conflict(msg) => warn!(error = %msg, "write conflict"),
            StoreError::Backend(msg) => error!(error = %msg, "storage backend failure"),
        }
    }
    result
}
