//! In-memory catalog store for tests/dev.
//!
//! All tables live behind one `RwLock`, so every mutation is trivially serializable.
//! Mutations validate against the locked tables and only then write, which makes each
//! one all-or-nothing.

use std::collections::{BTreeSet, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;
use uuid::Uuid;

use citycat_catalog::{
    AssignPlan, Assignment, CarouselItem, CarouselUpdate, CatalogEntity, CatalogView, Category, CategoryOrder,
    CategoryUpdate, EditPlan, EntityType, ImportPlan, ImportScope, MoveDirection, NewCarouselItem, NewCategory,
    NewProduct, NewSubCategory, Product, ProductPatch, SubCategory, SubCategoryUpdate, UnassignPlan, plan_assign,
    plan_edit, plan_import, plan_unassign,
};
use citycat_core::{CarouselItemId, CatalogError, CategoryId, CityId, ExpectedVersion, ProductId, SubCategoryId};
use citycat_markets::{City, CityUpdate, NewCity};

use super::{CatalogStore, StoreError, StoreResult};

#[derive(Debug, Default)]
struct CatalogTables {
    cities: HashMap<CityId, City>,
    categories: HashMap<CategoryId, Category>,
    order: CategoryOrder,
    sub_categories: HashMap<SubCategoryId, SubCategory>,
    products: HashMap<ProductId, Product>,
    carousel: HashMap<CarouselItemId, CarouselItem>,
    assignments: BTreeSet<Assignment>,
}

impl CatalogTables {
    fn city(&self, id: CityId) -> StoreResult<&City> {
        self.cities
            .get(&id)
            .ok_or_else(|| CatalogError::not_found(format!("city {id}")).into())
    }

    /// City lookup for city-scoped operations, where a missing city is `InvalidCity`.
    fn scoped_city(&self, id: CityId) -> StoreResult<&City> {
        self.cities
            .get(&id)
            .ok_or_else(|| CatalogError::invalid_city(format!("city {id} does not exist")).into())
    }

    fn active_city(&self, id: CityId) -> StoreResult<&City> {
        let city = self.scoped_city(id)?;
        city.ensure_active()?;
        Ok(city)
    }

    fn product(&self, id: ProductId) -> StoreResult<&Product> {
        self.products
            .get(&id)
            .ok_or_else(|| CatalogError::not_found(format!("product {id}")).into())
    }

    fn sync_sort_orders(&mut self) {
        let positions: Vec<(CategoryId, i32)> = self.order.positions().collect();
        for (id, position) in positions {
            if let Some(category) = self.categories.get_mut(&id) {
                category.sort_order = position;
            }
        }
    }

    fn cities_assigned_to(&self, product: ProductId) -> Vec<CityId> {
        let mut cities: Vec<CityId> = self
            .assignments
            .iter()
            .filter(|a| a.entity_type == EntityType::Product && a.entity_id == *product.as_uuid())
            .map(|a| a.city_id)
            .collect();
        cities.sort();
        cities
    }

    fn remove_entity_assignments(&mut self, entity_type: EntityType, id: Uuid) -> usize {
        let before = self.assignments.len();
        self.assignments
            .retain(|a| !(a.entity_type == entity_type && a.entity_id == id));
        before - self.assignments.len()
    }

    /// Every entity of a type, in listing order.
    fn entities(&self, entity_type: EntityType) -> Vec<CatalogEntity> {
        match entity_type {
            EntityType::Category => self
                .order
                .ids()
                .iter()
                .filter_map(|id| self.categories.get(id).cloned())
                .map(CatalogEntity::Category)
                .collect(),
            EntityType::Subcategory => {
                let mut subs: Vec<&SubCategory> = self.sub_categories.values().collect();
                subs.sort_by(|a, b| {
                    let pa = self.order.position(a.parent_category_id);
                    let pb = self.order.position(b.parent_category_id);
                    pa.cmp(&pb).then_with(|| a.name.cmp(&b.name)).then_with(|| a.id.cmp(&b.id))
                });
                subs.into_iter().cloned().map(CatalogEntity::SubCategory).collect()
            }
            EntityType::Product => {
                let mut products: Vec<&Product> = self.products.values().collect();
                products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
                products.into_iter().cloned().map(CatalogEntity::Product).collect()
            }
            EntityType::Carousel => {
                let mut items: Vec<&CarouselItem> = self.carousel.values().collect();
                items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
                items.into_iter().cloned().map(CatalogEntity::Carousel).collect()
            }
        }
    }

    fn apply_rows<'a>(&mut self, rows: impl Iterator<Item = &'a Assignment>) {
        for row in rows {
            self.assignments.insert(*row);
        }
    }
}

impl CatalogView for CatalogTables {
    fn entity_exists(&self, entity_type: EntityType, id: Uuid) -> bool {
        match entity_type {
            EntityType::Product => self.products.contains_key(&ProductId::from_uuid(id)),
            EntityType::Category => self.categories.contains_key(&CategoryId::from_uuid(id)),
            EntityType::Subcategory => self.sub_categories.contains_key(&SubCategoryId::from_uuid(id)),
            EntityType::Carousel => self.carousel.contains_key(&CarouselItemId::from_uuid(id)),
        }
    }

    fn is_assigned(&self, city: CityId, entity_type: EntityType, id: Uuid) -> bool {
        self.assignments.contains(&Assignment::new(city, entity_type, id))
    }

    fn assigned_ids(&self, city: CityId, entity_type: EntityType) -> Vec<Uuid> {
        self.assignments
            .range(Assignment::slice(city, entity_type))
            .map(|a| a.entity_id)
            .collect()
    }

    fn subcategories_of(&self, category: CategoryId) -> Vec<SubCategoryId> {
        let mut subs: Vec<SubCategoryId> = self
            .sub_categories
            .values()
            .filter(|s| s.parent_category_id == category)
            .map(|s| s.id)
            .collect();
        subs.sort();
        subs
    }

    fn parent_of(&self, sub: SubCategoryId) -> Option<CategoryId> {
        self.sub_categories.get(&sub).map(|s| s.parent_category_id)
    }
}

/// In-memory [`CatalogStore`].
#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    inner: RwLock<CatalogTables>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, CatalogTables>> {
        self.inner
            .read()
            .map_err(|_| StoreError::backend("catalog lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, CatalogTables>> {
        self.inner
            .write()
            .map_err(|_| StoreError::backend("catalog lock poisoned"))
    }
}

fn not_found(what: impl Into<String>) -> StoreError {
    CatalogError::not_found(what).into()
}

#[async_trait::async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn create_city(&self, new: NewCity) -> StoreResult<City> {
        let mut tables = self.write()?;
        let next = tables.cities.values().map(|c| c.sort_order + 1).max().unwrap_or(0);
        let city = new.into_city(CityId::new(), next, Utc::now())?;
        tables.cities.insert(city.id, city.clone());
        Ok(city)
    }

    async fn get_city(&self, id: CityId) -> StoreResult<City> {
        self.read()?.city(id).cloned()
    }

    async fn list_cities(&self) -> StoreResult<Vec<City>> {
        let tables = self.read()?;
        let mut cities: Vec<City> = tables.cities.values().cloned().collect();
        cities.sort_by(|a, b| a.sort_order.cmp(&b.sort_order).then_with(|| a.name.cmp(&b.name)));
        Ok(cities)
    }

    async fn update_city(&self, id: CityId, update: CityUpdate) -> StoreResult<City> {
        let mut tables = self.write()?;
        let city = tables
            .cities
            .get_mut(&id)
            .ok_or_else(|| not_found(format!("city {id}")))?;
        city.apply_update(update, Utc::now())?;
        Ok(city.clone())
    }

    async fn set_city_active(&self, id: CityId, active: bool) -> StoreResult<(City, bool)> {
        let mut tables = self.write()?;
        let city = tables
            .cities
            .get_mut(&id)
            .ok_or_else(|| not_found(format!("city {id}")))?;
        let now = Utc::now();
        let changed = if active { city.activate(now) } else { city.deactivate(now) };
        Ok((city.clone(), changed))
    }

    async fn delete_city(&self, id: CityId) -> StoreResult<usize> {
        let mut tables = self.write()?;
        if tables.cities.remove(&id).is_none() {
            return Err(not_found(format!("city {id}")));
        }
        let before = tables.assignments.len();
        tables.assignments.retain(|a| a.city_id != id);
        Ok(before - tables.assignments.len())
    }

    async fn create_category(&self, new: NewCategory) -> StoreResult<Category> {
        let mut tables = self.write()?;
        let id = CategoryId::new();
        let category = new.into_category(id, tables.order.len() as i32, Utc::now())?;
        tables.order.append(id);
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Category> {
        self.read()?
            .categories
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(format!("category {id}")))
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let tables = self.read()?;
        Ok(tables
            .order
            .ids()
            .iter()
            .filter_map(|id| tables.categories.get(id).cloned())
            .collect())
    }

    async fn update_category(&self, id: CategoryId, update: CategoryUpdate) -> StoreResult<Category> {
        let mut tables = self.write()?;
        let category = tables
            .categories
            .get_mut(&id)
            .ok_or_else(|| not_found(format!("category {id}")))?;
        category.apply_update(update, Utc::now())?;
        Ok(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.categories.contains_key(&id) {
            return Err(not_found(format!("category {id}")));
        }
        if let Some(p) = tables.products.values().find(|p| p.category_id == id) {
            return Err(CatalogError::validation(format!(
                "category {id} is still used by product {}",
                p.id
            ))
            .into());
        }

        for sub in tables.subcategories_of(id) {
            tables.sub_categories.remove(&sub);
            tables.remove_entity_assignments(EntityType::Subcategory, *sub.as_uuid());
        }
        tables.remove_entity_assignments(EntityType::Category, *id.as_uuid());
        tables.categories.remove(&id);
        tables.order.remove(id);
        tables.sync_sort_orders();
        Ok(())
    }

    async fn category_order(&self) -> StoreResult<CategoryOrder> {
        Ok(self.read()?.order.clone())
    }

    async fn reorder_categories(
        &self,
        category_ids: Vec<CategoryId>,
        expected: ExpectedVersion,
    ) -> StoreResult<CategoryOrder> {
        let mut tables = self.write()?;
        tables.order.reorder(&category_ids, expected)?;
        tables.sync_sort_orders();
        Ok(tables.order.clone())
    }

    async fn move_category(
        &self,
        id: CategoryId,
        direction: MoveDirection,
        expected: ExpectedVersion,
    ) -> StoreResult<(CategoryOrder, bool)> {
        let mut tables = self.write()?;
        let moved = tables.order.move_adjacent(id, direction, expected)?;
        if moved {
            tables.sync_sort_orders();
        }
        Ok((tables.order.clone(), moved))
    }

    async fn create_sub_category(&self, new: NewSubCategory) -> StoreResult<(SubCategory, Vec<CityId>)> {
        let mut tables = self.write()?;
        let parent = new.parent_category_id;
        if !tables.categories.contains_key(&parent) {
            return Err(not_found(format!("category {parent}")));
        }
        let sub = new.into_sub_category(SubCategoryId::new(), Utc::now())?;

        let cities: Vec<CityId> = tables
            .assignments
            .iter()
            .filter(|a| a.entity_type == EntityType::Category && a.entity_id == *parent.as_uuid())
            .map(|a| a.city_id)
            .collect();
        for city in &cities {
            tables
                .assignments
                .insert(Assignment::new(*city, EntityType::Subcategory, *sub.id.as_uuid()));
        }
        tables.sub_categories.insert(sub.id, sub.clone());
        Ok((sub, cities))
    }

    async fn get_sub_category(&self, id: SubCategoryId) -> StoreResult<SubCategory> {
        self.read()?
            .sub_categories
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(format!("subcategory {id}")))
    }

    async fn list_sub_categories(&self, parent: Option<CategoryId>) -> StoreResult<Vec<SubCategory>> {
        let tables = self.read()?;
        Ok(tables
            .entities(EntityType::Subcategory)
            .into_iter()
            .filter_map(|e| match e {
                CatalogEntity::SubCategory(s) if parent.is_none_or(|p| p == s.parent_category_id) => Some(s),
                _ => None,
            })
            .collect())
    }

    async fn update_sub_category(&self, id: SubCategoryId, update: SubCategoryUpdate) -> StoreResult<SubCategory> {
        let mut tables = self.write()?;
        let sub = tables
            .sub_categories
            .get_mut(&id)
            .ok_or_else(|| not_found(format!("subcategory {id}")))?;
        sub.apply_update(update, Utc::now())?;
        Ok(sub.clone())
    }

    async fn delete_sub_category(&self, id: SubCategoryId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if !tables.sub_categories.contains_key(&id) {
            return Err(not_found(format!("subcategory {id}")));
        }
        if let Some(p) = tables.products.values().find(|p| p.sub_category_id == Some(id)) {
            return Err(CatalogError::validation(format!(
                "subcategory {id} is still used by product {}",
                p.id
            ))
            .into());
        }
        tables.remove_entity_assignments(EntityType::Subcategory, *id.as_uuid());
        tables.sub_categories.remove(&id);
        Ok(())
    }

    async fn create_product(&self, new: NewProduct) -> StoreResult<Product> {
        let mut tables = self.write()?;
        let product = new.into_product(ProductId::new(), Utc::now())?;
        product.validate_links(&*tables)?;
        tables.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        self.read()?.product(id).cloned()
    }

    async fn list_products(&self, category: Option<CategoryId>) -> StoreResult<Vec<Product>> {
        let tables = self.read()?;
        Ok(tables
            .entities(EntityType::Product)
            .into_iter()
            .filter_map(|e| match e {
                CatalogEntity::Product(p) if category.is_none_or(|c| c == p.category_id) => Some(p),
                _ => None,
            })
            .collect())
    }

    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.products.remove(&id).is_none() {
            return Err(not_found(format!("product {id}")));
        }
        tables.remove_entity_assignments(EntityType::Product, *id.as_uuid());
        for product in tables.products.values_mut() {
            if product.origin_product_id == Some(id) {
                product.origin_product_id = None;
            }
        }
        Ok(())
    }

    async fn cities_assigned_to(&self, id: ProductId) -> StoreResult<Vec<CityId>> {
        let tables = self.read()?;
        tables.product(id)?;
        Ok(tables.cities_assigned_to(id))
    }

    async fn product_in_city(&self, city: CityId, id: ProductId) -> StoreResult<Product> {
        let tables = self.read()?;
        tables.scoped_city(city)?;
        let product = tables.product(id)?;
        if tables.is_assigned(city, EntityType::Product, *id.as_uuid()) {
            return Ok(product.clone());
        }

        let root = product.lineage_root();
        tables
            .assigned_ids(city, EntityType::Product)
            .into_iter()
            .filter_map(|pid| tables.products.get(&ProductId::from_uuid(pid)))
            .find(|p| p.lineage_root() == root)
            .cloned()
            .ok_or_else(|| CatalogError::not_assigned(format!("product {id} is not visible in city {city}")).into())
    }

    async fn edit_product_in_city(&self, city: CityId, id: ProductId, patch: ProductPatch) -> StoreResult<EditPlan> {
        let mut tables = self.write()?;
        tables.scoped_city(city)?;
        let product = tables.product(id)?.clone();
        let assigned = tables.cities_assigned_to(id);
        let plan = plan_edit(&*tables, city, &product, &assigned, &patch, ProductId::new(), Utc::now())?;

        match &plan {
            EditPlan::InPlace(updated) => {
                tables.products.insert(updated.id, updated.clone());
            }
            EditPlan::Fork { fork, .. } => {
                if let Some((old, new)) = plan.assignment_swap(city) {
                    tables.assignments.remove(&old);
                    tables.assignments.insert(new);
                }
                tables.products.insert(fork.id, fork.clone());
            }
        }
        Ok(plan)
    }

    async fn create_carousel_item(&self, new: NewCarouselItem) -> StoreResult<CarouselItem> {
        let mut tables = self.write()?;
        let item = new.into_item(CarouselItemId::new(), Utc::now())?;
        tables.carousel.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get_carousel_item(&self, id: CarouselItemId) -> StoreResult<CarouselItem> {
        self.read()?
            .carousel
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found(format!("carousel item {id}")))
    }

    async fn list_carousel_items(&self) -> StoreResult<Vec<CarouselItem>> {
        let tables = self.read()?;
        Ok(tables
            .entities(EntityType::Carousel)
            .into_iter()
            .filter_map(|e| match e {
                CatalogEntity::Carousel(c) => Some(c),
                _ => None,
            })
            .collect())
    }

    async fn update_carousel_item(&self, id: CarouselItemId, update: CarouselUpdate) -> StoreResult<CarouselItem> {
        let mut tables = self.write()?;
        let item = tables
            .carousel
            .get_mut(&id)
            .ok_or_else(|| not_found(format!("carousel item {id}")))?;
        item.apply_update(update, Utc::now())?;
        Ok(item.clone())
    }

    async fn delete_carousel_item(&self, id: CarouselItemId) -> StoreResult<()> {
        let mut tables = self.write()?;
        if tables.carousel.remove(&id).is_none() {
            return Err(not_found(format!("carousel item {id}")));
        }
        tables.remove_entity_assignments(EntityType::Carousel, *id.as_uuid());
        Ok(())
    }

    async fn assign(&self, city: CityId, entity_type: EntityType, ids: Vec<Uuid>) -> StoreResult<AssignPlan> {
        let mut tables = self.write()?;
        tables.active_city(city)?;
        let plan = plan_assign(&*tables, city, entity_type, &ids)?;
        tables.apply_rows(plan.rows());
        Ok(plan)
    }

    async fn unassign(&self, city: CityId, entity_type: EntityType, ids: Vec<Uuid>) -> StoreResult<UnassignPlan> {
        let mut tables = self.write()?;
        tables.scoped_city(city)?;
        let plan = plan_unassign(&*tables, city, entity_type, &ids)?;
        for row in plan.rows() {
            tables.assignments.remove(row);
        }
        Ok(plan)
    }

    async fn list_assigned(&self, city: CityId, entity_type: EntityType) -> StoreResult<Vec<CatalogEntity>> {
        let tables = self.read()?;
        tables.scoped_city(city)?;
        Ok(tables
            .entities(entity_type)
            .into_iter()
            .filter(|e| tables.is_assigned(city, entity_type, e.entity_id()))
            .collect())
    }

    async fn list_assignable(
        &self,
        city: CityId,
        entity_type: EntityType,
        query: Option<String>,
    ) -> StoreResult<Vec<CatalogEntity>> {
        let tables = self.read()?;
        tables.scoped_city(city)?;
        let query = query.unwrap_or_default();
        Ok(tables
            .entities(entity_type)
            .into_iter()
            .filter(|e| !tables.is_assigned(city, entity_type, e.entity_id()) && e.matches_query(&query))
            .collect())
    }

    async fn import(&self, target: CityId, source: CityId, scope: ImportScope) -> StoreResult<ImportPlan> {
        let mut tables = self.write()?;
        if target == source {
            return Err(CatalogError::SameCity.into());
        }
        tables.active_city(target)?;
        tables.scoped_city(source)?;
        let plan = plan_import(&*tables, target, source, scope)?;
        tables.apply_rows(plan.rows());
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(f)
    }

    fn new_city(name: &str) -> NewCity {
        NewCity {
            name: name.to_string(),
            state: "Bihar".to_string(),
            contact_number: "+91 612 555 0100".to_string(),
            sort_order: None,
            is_active: None,
        }
    }

    fn new_category(name: &str) -> NewCategory {
        NewCategory {
            name: name.to_string(),
            description: String::new(),
            media: Vec::new(),
        }
    }

    #[test]
    fn categories_append_and_delete_keeps_order_dense() {
        block_on(async {
            let store = InMemoryCatalogStore::new();
            let a = store.create_category(new_category("Birthday")).await.unwrap();
            let b = store.create_category(new_category("Wedding")).await.unwrap();
            let c = store.create_category(new_category("Anniversary")).await.unwrap();
            assert_eq!((a.sort_order, b.sort_order, c.sort_order), (0, 1, 2));

            store.delete_category(b.id).await.unwrap();
            let listed = store.list_categories().await.unwrap();
            let orders: Vec<(CategoryId, i32)> = listed.iter().map(|c| (c.id, c.sort_order)).collect();
            assert_eq!(orders, vec![(a.id, 0), (c.id, 1)]);
            assert_eq!(store.category_order().await.unwrap().version(), 4);
        });
    }

    #[test]
    fn subcategory_created_under_assigned_category_follows_it() {
        block_on(async {
            let store = InMemoryCatalogStore::new();
            let patna = store.create_city(new_city("Patna")).await.unwrap();
            let birthday = store.create_category(new_category("Birthday")).await.unwrap();
            store
                .assign(patna.id, EntityType::Category, vec![*birthday.id.as_uuid()])
                .await
                .unwrap();

            let (sub, cities) = store
                .create_sub_category(NewSubCategory {
                    name: "Balloon Decor".to_string(),
                    description: String::new(),
                    media: Vec::new(),
                    parent_category_id: birthday.id,
                })
                .await
                .unwrap();
            assert_eq!(cities, vec![patna.id]);
            let assigned = store.list_assigned(patna.id, EntityType::Subcategory).await.unwrap();
            assert_eq!(assigned.len(), 1);
            assert_eq!(assigned[0].entity_id(), *sub.id.as_uuid());
        });
    }

    #[test]
    fn assign_to_deactivated_or_missing_city_is_invalid_city() {
        block_on(async {
            let store = InMemoryCatalogStore::new();
            let patna = store.create_city(new_city("Patna")).await.unwrap();
            let birthday = store.create_category(new_category("Birthday")).await.unwrap();
            store.set_city_active(patna.id, false).await.unwrap();

            let err = store
                .assign(patna.id, EntityType::Category, vec![*birthday.id.as_uuid()])
                .await
                .unwrap_err();
            assert!(matches!(err.domain(), Some(CatalogError::InvalidCity(_))));

            let err = store
                .assign(CityId::new(), EntityType::Category, vec![*birthday.id.as_uuid()])
                .await
                .unwrap_err();
            assert!(matches!(err.domain(), Some(CatalogError::InvalidCity(_))));
        });
    }

    #[test]
    fn failed_assign_writes_nothing() {
        block_on(async {
            let store = InMemoryCatalogStore::new();
            let patna = store.create_city(new_city("Patna")).await.unwrap();
            let birthday = store.create_category(new_category("Birthday")).await.unwrap();

            let err = store
                .assign(patna.id, EntityType::Category, vec![*birthday.id.as_uuid(), Uuid::now_v7()])
                .await
                .unwrap_err();
            assert!(matches!(err.domain(), Some(CatalogError::NotFound(_))));
            assert!(store.list_assigned(patna.id, EntityType::Category).await.unwrap().is_empty());
        });
    }

    #[test]
    fn deleting_a_city_drops_its_assignments() {
        block_on(async {
            let store = InMemoryCatalogStore::new();
            let patna = store.create_city(new_city("Patna")).await.unwrap();
            let item = store
                .create_carousel_item(NewCarouselItem {
                    title: "Diwali".to_string(),
                    image: "https://cdn.example.com/diwali.jpg".to_string(),
                    is_mobile: false,
                })
                .await
                .unwrap();
            store
                .assign(patna.id, EntityType::Carousel, vec![*item.id.as_uuid()])
                .await
                .unwrap();

            assert_eq!(store.delete_city(patna.id).await.unwrap(), 1);
            let err = store.get_city(patna.id).await.unwrap_err();
            assert!(matches!(err.domain(), Some(CatalogError::NotFound(_))));
        });
    }

    #[test]
    fn assignable_is_the_complement_filtered_by_name() {
        block_on(async {
            let store = InMemoryCatalogStore::new();
            let patna = store.create_city(new_city("Patna")).await.unwrap();
            let birthday = store.create_category(new_category("Birthday")).await.unwrap();
            store.create_category(new_category("Wedding")).await.unwrap();
            store.create_category(new_category("Baby Shower")).await.unwrap();
            store
                .assign(patna.id, EntityType::Category, vec![*birthday.id.as_uuid()])
                .await
                .unwrap();

            let all = store
                .list_assignable(patna.id, EntityType::Category, None)
                .await
                .unwrap();
            let labels: Vec<&str> = all.iter().map(|e| e.label()).collect();
            assert_eq!(labels, vec!["Wedding", "Baby Shower"]);

            let filtered = store
                .list_assignable(patna.id, EntityType::Category, Some("wed".to_string()))
                .await
                .unwrap();
            assert_eq!(filtered.len(), 1);
            assert_eq!(filtered[0].label(), "Wedding");
        });
    }
}
