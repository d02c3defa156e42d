//! Postgres-backed catalog store.
//!
//! Every mutation is one transaction that locks only the rows it touches, then plans
//! against a [`SnapshotView`] loaded inside that transaction.
//!
//! ## Lock order
//!
//! Transactions always lock in this order, so they cannot deadlock against each other:
//!
//! 1. `category_order_state` (category create/delete/reorder only)
//! 2. city rows, in id order (`FOR UPDATE`; this serializes writers to one city's overlay)
//! 3. entity rows (`FOR SHARE` when assigning, `FOR UPDATE` when editing/deleting)
//!
//! A product edit locks the product `FOR UPDATE` before reading `CitiesAssignedTo`,
//! while assigning a product to any city takes `FOR SHARE` on it. Import does the same
//! for every product the source city shows, after both city locks and in id order. The
//! fork decision therefore cannot race a concurrent assignment or import of the same
//! product, even when neither city of the import is the one being edited.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `Domain(Validation)` |
//! | Database (check constraint violation) | `23514` | `Domain(Validation)` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / RowNotFound / other | N/A | `Backend` |

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Row, Transaction};
use tracing::{Span, debug, info, instrument};
use uuid::Uuid;

use citycat_catalog::{
    AssignPlan, Assignment, CarouselItem, CarouselUpdate, CatalogEntity, CatalogView, Category, CategoryOrder,
    CategoryUpdate, EditPlan, EntityType, ImportPlan, ImportScope, MoveDirection, NewCarouselItem, NewCategory,
    NewProduct, NewSubCategory, Product, ProductPatch, SnapshotView, SubCategory, SubCategoryUpdate, UnassignPlan,
    plan_assign, plan_edit, plan_import, plan_unassign,
};
use citycat_core::{CarouselItemId, CatalogError, CategoryId, CityId, ExpectedVersion, ProductId, SubCategoryId};
use citycat_markets::{City, CityUpdate, NewCity};

use super::{CatalogStore, StoreError, StoreResult};

const SCHEMA: &str = include_str!("schema.sql");

/// Postgres-backed [`CatalogStore`].
///
/// Uses the SQLx connection pool, which is `Send + Sync`; the store can be shared
/// across request handlers behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PostgresCatalogStore {
    pool: Arc<PgPool>,
}

impl PostgresCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Connect with a small default pool.
    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create tables and the order-version row if they do not exist yet.
    #[instrument(skip(self), err)]
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }

    async fn fetch_city(&self, id: CityId) -> StoreResult<Option<City>> {
        let row = sqlx::query_as::<_, CityRow>("SELECT * FROM cities WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("fetch_city", e))?;
        Ok(row.map(City::from))
    }

    /// Assigned or assignable entities of one type for a city, in listing order.
    async fn list_membership(
        &self,
        city: CityId,
        entity_type: EntityType,
        assigned: bool,
        query: Option<String>,
    ) -> StoreResult<Vec<CatalogEntity>> {
        if self.fetch_city(city).await?.is_none() {
            return Err(CatalogError::invalid_city(format!("city {city} does not exist")).into());
        }

        let needle = query.map(|q| q.trim().to_string()).filter(|q| !q.is_empty());
        let membership = format!(
            "{} EXISTS (SELECT 1 FROM city_assignments a \
             WHERE a.city_id = $1 AND a.entity_type = '{}' AND a.entity_id = x.id)",
            if assigned { "" } else { "NOT" },
            entity_type.as_str()
        );
        let filter = format!(
            "($2::text IS NULL OR strpos(lower(x.{}), lower($2::text)) > 0)",
            label_column(entity_type)
        );
        let sql = match entity_type {
            EntityType::Subcategory => format!(
                "SELECT x.* FROM sub_categories x JOIN categories parent ON parent.id = x.parent_category_id \
                 WHERE {membership} AND {filter} ORDER BY parent.sort_order, x.name, x.id"
            ),
            other => format!(
                "SELECT x.* FROM {} x WHERE {membership} AND {filter} ORDER BY {}",
                table(other),
                listing_order(other)
            ),
        };

        let rows = sqlx::query(&sql)
            .bind(city.as_uuid())
            .bind(needle)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_membership", e))?;

        rows.iter()
            .map(|row| entity_from_row(entity_type, row))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("decode_entity", e))
    }
}

#[async_trait::async_trait]
impl CatalogStore for PostgresCatalogStore {
    #[instrument(skip(self, new), fields(name = %new.name, city_id = tracing::field::Empty), err)]
    async fn create_city(&self, new: NewCity) -> StoreResult<City> {
        let mut tx = self.begin().await?;
        let next: i32 = sqlx::query_scalar("SELECT COALESCE(MAX(sort_order) + 1, 0) FROM cities")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("next_city_sort_order", e))?;
        let city = new.into_city(CityId::new(), next, Utc::now())?;

        sqlx::query(
            r#"
            INSERT INTO cities (id, name, state, contact_number, is_active, sort_order, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(city.id.as_uuid())
        .bind(&city.name)
        .bind(&city.state)
        .bind(&city.contact_number)
        .bind(city.is_active)
        .bind(city.sort_order)
        .bind(city.created_at)
        .bind(city.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_city", e))?;

        commit(tx).await?;
        Span::current().record("city_id", tracing::field::display(city.id));
        Ok(city)
    }

    async fn get_city(&self, id: CityId) -> StoreResult<City> {
        self.fetch_city(id)
            .await?
            .ok_or_else(|| CatalogError::not_found(format!("city {id}")).into())
    }

    async fn list_cities(&self) -> StoreResult<Vec<City>> {
        let rows = sqlx::query_as::<_, CityRow>("SELECT * FROM cities ORDER BY sort_order, name, id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_cities", e))?;
        Ok(rows.into_iter().map(City::from).collect())
    }

    #[instrument(skip(self, update), fields(city_id = %id), err)]
    async fn update_city(&self, id: CityId, update: CityUpdate) -> StoreResult<City> {
        let mut tx = self.begin().await?;
        let mut city = lock_city(&mut tx, id)
            .await?
            .ok_or_else(|| CatalogError::not_found(format!("city {id}")))?;
        city.apply_update(update, Utc::now())?;
        save_city(&mut tx, &city).await?;
        commit(tx).await?;
        Ok(city)
    }

    #[instrument(skip(self), fields(city_id = %id), err)]
    async fn set_city_active(&self, id: CityId, active: bool) -> StoreResult<(City, bool)> {
        let mut tx = self.begin().await?;
        let mut city = lock_city(&mut tx, id)
            .await?
            .ok_or_else(|| CatalogError::not_found(format!("city {id}")))?;
        let now = Utc::now();
        let changed = if active { city.activate(now) } else { city.deactivate(now) };
        if changed {
            save_city(&mut tx, &city).await?;
        }
        commit(tx).await?;
        Ok((city, changed))
    }

    #[instrument(skip(self), fields(city_id = %id), err)]
    async fn delete_city(&self, id: CityId) -> StoreResult<usize> {
        let mut tx = self.begin().await?;
        if lock_city(&mut tx, id).await?.is_none() {
            return Err(CatalogError::not_found(format!("city {id}")).into());
        }
        let removed = sqlx::query("DELETE FROM city_assignments WHERE city_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_city_assignments", e))?
            .rows_affected();
        sqlx::query("DELETE FROM cities WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_city", e))?;
        commit(tx).await?;
        Ok(removed as usize)
    }

    #[instrument(skip(self, new), fields(name = %new.name), err)]
    async fn create_category(&self, new: NewCategory) -> StoreResult<Category> {
        let mut tx = self.begin().await?;
        let mut order = lock_order(&mut tx).await?;
        let id = CategoryId::new();
        let category = new.into_category(id, order.len() as i32, Utc::now())?;

        sqlx::query(
            r#"
            INSERT INTO categories (id, name, description, media, sort_order, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(category.id.as_uuid())
        .bind(&category.name)
        .bind(&category.description)
        .bind(Json(&category.media))
        .bind(category.sort_order)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_category", e))?;

        order.append(id);
        write_order(&mut tx, &order).await?;
        commit(tx).await?;
        Ok(category)
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Category> {
        sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?
            .map(Category::from)
            .ok_or_else(|| CatalogError::not_found(format!("category {id}")).into())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories ORDER BY sort_order, id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    #[instrument(skip(self, update), fields(category_id = %id), err)]
    async fn update_category(&self, id: CategoryId, update: CategoryUpdate) -> StoreResult<Category> {
        let mut tx = self.begin().await?;
        let mut category = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_category", e))?
            .map(Category::from)
            .ok_or_else(|| CatalogError::not_found(format!("category {id}")))?;
        category.apply_update(update, Utc::now())?;

        sqlx::query("UPDATE categories SET name = $2, description = $3, media = $4, updated_at = $5 WHERE id = $1")
            .bind(category.id.as_uuid())
            .bind(&category.name)
            .bind(&category.description)
            .bind(Json(&category.media))
            .bind(category.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_category", e))?;
        commit(tx).await?;
        Ok(category)
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        let mut order = lock_order(&mut tx).await?;
        if order.position(id).is_none() {
            return Err(CatalogError::not_found(format!("category {id}")).into());
        }

        let in_use: Option<Uuid> = sqlx::query_scalar("SELECT id FROM products WHERE category_id = $1 LIMIT 1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("category_in_use", e))?;
        if let Some(product) = in_use {
            return Err(CatalogError::validation(format!("category {id} is still used by product {product}")).into());
        }

        sqlx::query(
            r#"
            DELETE FROM city_assignments
            WHERE (entity_type = 'subcategory'
                   AND entity_id IN (SELECT id FROM sub_categories WHERE parent_category_id = $1))
               OR (entity_type = 'category' AND entity_id = $1)
            "#,
        )
        .bind(id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("delete_category_assignments", e))?;

        sqlx::query("DELETE FROM sub_categories WHERE parent_category_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_sub_categories", e))?;
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_category", e))?;

        order.remove(id);
        write_order(&mut tx, &order).await?;
        commit(tx).await
    }

    async fn category_order(&self) -> StoreResult<CategoryOrder> {
        let version: i64 = sqlx::query_scalar("SELECT version FROM category_order_state WHERE id")
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("order_version", e))?;
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM categories ORDER BY sort_order, id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("order_ids", e))?;
        Ok(CategoryOrder::new(
            ids.into_iter().map(CategoryId::from_uuid).collect(),
            version as u64,
        ))
    }

    #[instrument(skip(self, category_ids), fields(count = category_ids.len(), expected = ?expected), err)]
    async fn reorder_categories(
        &self,
        category_ids: Vec<CategoryId>,
        expected: ExpectedVersion,
    ) -> StoreResult<CategoryOrder> {
        let mut tx = self.begin().await?;
        let mut order = lock_order(&mut tx).await?;
        order.reorder(&category_ids, expected)?;
        write_order(&mut tx, &order).await?;
        commit(tx).await?;
        Ok(order)
    }

    #[instrument(skip(self), fields(category_id = %id, expected = ?expected), err)]
    async fn move_category(
        &self,
        id: CategoryId,
        direction: MoveDirection,
        expected: ExpectedVersion,
    ) -> StoreResult<(CategoryOrder, bool)> {
        let mut tx = self.begin().await?;
        let mut order = lock_order(&mut tx).await?;
        let moved = order.move_adjacent(id, direction, expected)?;
        if moved {
            write_order(&mut tx, &order).await?;
        }
        commit(tx).await?;
        Ok((order, moved))
    }

    #[instrument(skip(self, new), fields(parent_category_id = %new.parent_category_id), err)]
    async fn create_sub_category(&self, new: NewSubCategory) -> StoreResult<(SubCategory, Vec<CityId>)> {
        let mut tx = self.begin().await?;
        let parent = new.parent_category_id;
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM categories WHERE id = $1 FOR UPDATE")
            .bind(parent.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_parent_category", e))?;
        if exists.is_none() {
            return Err(CatalogError::not_found(format!("category {parent}")).into());
        }
        let sub = new.into_sub_category(SubCategoryId::new(), Utc::now())?;

        sqlx::query(
            r#"
            INSERT INTO sub_categories (id, name, description, media, parent_category_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(sub.id.as_uuid())
        .bind(&sub.name)
        .bind(&sub.description)
        .bind(Json(&sub.media))
        .bind(sub.parent_category_id.as_uuid())
        .bind(sub.created_at)
        .bind(sub.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_sub_category", e))?;

        let cities: Vec<Uuid> = sqlx::query_scalar(
            r#"
            INSERT INTO city_assignments (city_id, entity_type, entity_id)
            SELECT city_id, 'subcategory', $1
            FROM city_assignments
            WHERE entity_type = 'category' AND entity_id = $2
            ON CONFLICT DO NOTHING
            RETURNING city_id
            "#,
        )
        .bind(sub.id.as_uuid())
        .bind(parent.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("cascade_sub_category", e))?;

        commit(tx).await?;
        let mut cities: Vec<CityId> = cities.into_iter().map(CityId::from_uuid).collect();
        cities.sort();
        Ok((sub, cities))
    }

    async fn get_sub_category(&self, id: SubCategoryId) -> StoreResult<SubCategory> {
        sqlx::query_as::<_, SubCategoryRow>("SELECT * FROM sub_categories WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_sub_category", e))?
            .map(SubCategory::from)
            .ok_or_else(|| CatalogError::not_found(format!("subcategory {id}")).into())
    }

    async fn list_sub_categories(&self, parent: Option<CategoryId>) -> StoreResult<Vec<SubCategory>> {
        let rows = sqlx::query_as::<_, SubCategoryRow>(
            r#"
            SELECT x.*
            FROM sub_categories x
            JOIN categories parent ON parent.id = x.parent_category_id
            WHERE ($1::uuid IS NULL OR x.parent_category_id = $1)
            ORDER BY parent.sort_order, x.name, x.id
            "#,
        )
        .bind(parent.map(Uuid::from))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_sub_categories", e))?;
        Ok(rows.into_iter().map(SubCategory::from).collect())
    }

    #[instrument(skip(self, update), fields(sub_category_id = %id), err)]
    async fn update_sub_category(&self, id: SubCategoryId, update: SubCategoryUpdate) -> StoreResult<SubCategory> {
        let mut tx = self.begin().await?;
        let mut sub = sqlx::query_as::<_, SubCategoryRow>("SELECT * FROM sub_categories WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_sub_category", e))?
            .map(SubCategory::from)
            .ok_or_else(|| CatalogError::not_found(format!("subcategory {id}")))?;
        sub.apply_update(update, Utc::now())?;

        sqlx::query("UPDATE sub_categories SET name = $2, description = $3, media = $4, updated_at = $5 WHERE id = $1")
            .bind(sub.id.as_uuid())
            .bind(&sub.name)
            .bind(&sub.description)
            .bind(Json(&sub.media))
            .bind(sub.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_sub_category", e))?;
        commit(tx).await?;
        Ok(sub)
    }

    #[instrument(skip(self), fields(sub_category_id = %id), err)]
    async fn delete_sub_category(&self, id: SubCategoryId) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM sub_categories WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_sub_category", e))?;
        if exists.is_none() {
            return Err(CatalogError::not_found(format!("subcategory {id}")).into());
        }

        let in_use: Option<Uuid> = sqlx::query_scalar("SELECT id FROM products WHERE sub_category_id = $1 LIMIT 1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("sub_category_in_use", e))?;
        if let Some(product) = in_use {
            return Err(
                CatalogError::validation(format!("subcategory {id} is still used by product {product}")).into(),
            );
        }

        sqlx::query("DELETE FROM city_assignments WHERE entity_type = 'subcategory' AND entity_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_sub_category_assignments", e))?;
        sqlx::query("DELETE FROM sub_categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_sub_category", e))?;
        commit(tx).await
    }

    #[instrument(skip(self, new), fields(name = %new.name, category_id = %new.category_id), err)]
    async fn create_product(&self, new: NewProduct) -> StoreResult<Product> {
        let mut tx = self.begin().await?;
        let product = new.into_product(ProductId::new(), Utc::now())?;

        let mut view = SnapshotView::new();
        load_links(&mut tx, &product, &mut view).await?;
        product.validate_links(&view)?;

        insert_product(&mut tx, &product).await?;
        commit(tx).await?;
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> StoreResult<Product> {
        sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_product", e))?
            .map(Product::from)
            .ok_or_else(|| CatalogError::not_found(format!("product {id}")).into())
    }

    async fn list_products(&self, category: Option<CategoryId>) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT * FROM products WHERE ($1::uuid IS NULL OR category_id = $1) ORDER BY name, id",
        )
        .bind(category.map(Uuid::from))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_products", e))?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    #[instrument(skip(self), fields(product_id = %id), err)]
    async fn delete_product(&self, id: ProductId) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        // Forks are detached by the ON DELETE SET NULL on origin_product_id.
        let deleted = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product", e))?
            .rows_affected();
        if deleted == 0 {
            return Err(CatalogError::not_found(format!("product {id}")).into());
        }
        sqlx::query("DELETE FROM city_assignments WHERE entity_type = 'product' AND entity_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_product_assignments", e))?;
        commit(tx).await
    }

    async fn cities_assigned_to(&self, id: ProductId) -> StoreResult<Vec<CityId>> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .map_err(|e| map_sqlx_error("acquire", e))?;
        let exists: Option<Uuid> = sqlx::query_scalar("SELECT id FROM products WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("product_exists", e))?;
        if exists.is_none() {
            return Err(CatalogError::not_found(format!("product {id}")).into());
        }
        let cities: Vec<Uuid> = sqlx::query_scalar(
            "SELECT city_id FROM city_assignments WHERE entity_type = 'product' AND entity_id = $1 ORDER BY city_id",
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("cities_assigned_to", e))?;
        Ok(cities.into_iter().map(CityId::from_uuid).collect())
    }

    async fn product_in_city(&self, city: CityId, id: ProductId) -> StoreResult<Product> {
        if self.fetch_city(city).await?.is_none() {
            return Err(CatalogError::invalid_city(format!("city {city} does not exist")).into());
        }
        let product = self.get_product(id).await?;

        let visible = sqlx::query_as::<_, ProductRow>(
            r#"
            SELECT p.*
            FROM products p
            JOIN city_assignments a
              ON a.entity_type = 'product' AND a.entity_id = p.id AND a.city_id = $1
            WHERE p.id = $2 OR COALESCE(p.origin_product_id, p.id) = $3
            ORDER BY (p.id = $2) DESC, p.id
            LIMIT 1
            "#,
        )
        .bind(city.as_uuid())
        .bind(id.as_uuid())
        .bind(product.lineage_root().as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("product_in_city", e))?;

        visible
            .map(Product::from)
            .ok_or_else(|| CatalogError::not_assigned(format!("product {id} is not visible in city {city}")).into())
    }

    #[instrument(skip(self, patch), fields(city_id = %city, product_id = %id, was_forked = tracing::field::Empty), err)]
    async fn edit_product_in_city(&self, city: CityId, id: ProductId, patch: ProductPatch) -> StoreResult<EditPlan> {
        let mut tx = self.begin().await?;
        if lock_city(&mut tx, city).await?.is_none() {
            return Err(CatalogError::invalid_city(format!("city {city} does not exist")).into());
        }
        let product = sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_product", e))?
            .map(Product::from)
            .ok_or_else(|| CatalogError::not_found(format!("product {id}")))?;

        let assigned: Vec<Uuid> = sqlx::query_scalar(
            "SELECT city_id FROM city_assignments WHERE entity_type = 'product' AND entity_id = $1 ORDER BY city_id",
        )
        .bind(id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("cities_assigned_to", e))?;
        let assigned: Vec<CityId> = assigned.into_iter().map(CityId::from_uuid).collect();

        let mut view = SnapshotView::new();
        if patch.touches_links() {
            let probe = product.patched(&patch, Utc::now())?;
            load_links(&mut tx, &probe, &mut view).await?;
        }

        let plan = plan_edit(&view, city, &product, &assigned, &patch, ProductId::new(), Utc::now())?;
        match &plan {
            EditPlan::InPlace(updated) => update_product(&mut tx, updated).await?,
            EditPlan::Fork { fork, .. } => {
                insert_product(&mut tx, fork).await?;
                if let Some((old, new)) = plan.assignment_swap(city) {
                    delete_assignments(&mut tx, std::iter::once(&old)).await?;
                    insert_assignments(&mut tx, std::iter::once(&new)).await?;
                }
            }
        }

        commit(tx).await?;
        Span::current().record("was_forked", plan.outcome().was_forked);
        Ok(plan)
    }

    #[instrument(skip(self, new), fields(title = %new.title), err)]
    async fn create_carousel_item(&self, new: NewCarouselItem) -> StoreResult<CarouselItem> {
        let item = new.into_item(CarouselItemId::new(), Utc::now())?;
        sqlx::query(
            r#"
            INSERT INTO carousel_items (id, title, image, is_mobile, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(&item.title)
        .bind(&item.image)
        .bind(item.is_mobile)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_carousel_item", e))?;
        Ok(item)
    }

    async fn get_carousel_item(&self, id: CarouselItemId) -> StoreResult<CarouselItem> {
        sqlx::query_as::<_, CarouselRow>("SELECT * FROM carousel_items WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_carousel_item", e))?
            .map(CarouselItem::from)
            .ok_or_else(|| CatalogError::not_found(format!("carousel item {id}")).into())
    }

    async fn list_carousel_items(&self) -> StoreResult<Vec<CarouselItem>> {
        let rows = sqlx::query_as::<_, CarouselRow>("SELECT * FROM carousel_items ORDER BY created_at, id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_carousel_items", e))?;
        Ok(rows.into_iter().map(CarouselItem::from).collect())
    }

    #[instrument(skip(self, update), fields(carousel_item_id = %id), err)]
    async fn update_carousel_item(&self, id: CarouselItemId, update: CarouselUpdate) -> StoreResult<CarouselItem> {
        let mut tx = self.begin().await?;
        let mut item = sqlx::query_as::<_, CarouselRow>("SELECT * FROM carousel_items WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_carousel_item", e))?
            .map(CarouselItem::from)
            .ok_or_else(|| CatalogError::not_found(format!("carousel item {id}")))?;
        item.apply_update(update, Utc::now())?;

        sqlx::query("UPDATE carousel_items SET title = $2, image = $3, is_mobile = $4, updated_at = $5 WHERE id = $1")
            .bind(item.id.as_uuid())
            .bind(&item.title)
            .bind(&item.image)
            .bind(item.is_mobile)
            .bind(item.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_carousel_item", e))?;
        commit(tx).await?;
        Ok(item)
    }

    #[instrument(skip(self), fields(carousel_item_id = %id), err)]
    async fn delete_carousel_item(&self, id: CarouselItemId) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        let deleted = sqlx::query("DELETE FROM carousel_items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_carousel_item", e))?
            .rows_affected();
        if deleted == 0 {
            return Err(CatalogError::not_found(format!("carousel item {id}")).into());
        }
        sqlx::query("DELETE FROM city_assignments WHERE entity_type = 'carousel' AND entity_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_carousel_assignments", e))?;
        commit(tx).await
    }

    #[instrument(skip(self, ids), fields(city_id = %city, entity_type = %entity_type, requested = ids.len()), err)]
    async fn assign(&self, city: CityId, entity_type: EntityType, ids: Vec<Uuid>) -> StoreResult<AssignPlan> {
        let mut tx = self.begin().await?;
        lock_city(&mut tx, city)
            .await?
            .ok_or_else(|| CatalogError::invalid_city(format!("city {city} does not exist")))?
            .ensure_active()?;

        let mut view = SnapshotView::new();
        load_city_assignments(&mut tx, &[city], &mut view).await?;
        load_existing(&mut tx, entity_type, &ids, &mut view).await?;
        if entity_type == EntityType::Category {
            load_sub_category_links(&mut tx, &ids, &[], &mut view).await?;
        }

        let plan = plan_assign(&view, city, entity_type, &ids)?;
        let inserted = insert_assignments(&mut tx, plan.rows()).await?;
        commit(tx).await?;

        debug!(inserted, "assignment rows written");
        Ok(plan)
    }

    #[instrument(skip(self, ids), fields(city_id = %city, entity_type = %entity_type, requested = ids.len()), err)]
    async fn unassign(&self, city: CityId, entity_type: EntityType, ids: Vec<Uuid>) -> StoreResult<UnassignPlan> {
        let mut tx = self.begin().await?;
        if lock_city(&mut tx, city).await?.is_none() {
            return Err(CatalogError::invalid_city(format!("city {city} does not exist")).into());
        }

        let mut view = SnapshotView::new();
        load_city_assignments(&mut tx, &[city], &mut view).await?;
        match entity_type {
            EntityType::Category => load_sub_category_links(&mut tx, &ids, &[], &mut view).await?,
            EntityType::Subcategory => load_sub_category_links(&mut tx, &[], &ids, &mut view).await?,
            _ => {}
        }

        let plan = plan_unassign(&view, city, entity_type, &ids)?;
        delete_assignments(&mut tx, plan.rows()).await?;
        commit(tx).await?;
        Ok(plan)
    }

    async fn list_assigned(&self, city: CityId, entity_type: EntityType) -> StoreResult<Vec<CatalogEntity>> {
        self.list_membership(city, entity_type, true, None).await
    }

    async fn list_assignable(
        &self,
        city: CityId,
        entity_type: EntityType,
        query: Option<String>,
    ) -> StoreResult<Vec<CatalogEntity>> {
        self.list_membership(city, entity_type, false, query).await
    }

    #[instrument(skip(self), fields(target_city_id = %target, source_city_id = %source, scope = ?scope), err)]
    async fn import(&self, target: CityId, source: CityId, scope: ImportScope) -> StoreResult<ImportPlan> {
        if target == source {
            return Err(CatalogError::SameCity.into());
        }
        let mut tx = self.begin().await?;

        let mut pair = [target, source];
        pair.sort();
        let mut locked = Vec::with_capacity(2);
        for id in pair {
            locked.push(lock_city(&mut tx, id).await?);
        }
        let find = |id: CityId| locked.iter().flatten().find(|c| c.id == id);
        find(target)
            .ok_or_else(|| CatalogError::invalid_city(format!("target city {target} does not exist")))?
            .ensure_active()?;
        if find(source).is_none() {
            return Err(CatalogError::invalid_city(format!("source city {source} does not exist")).into());
        }

        let mut view = SnapshotView::new();
        load_city_assignments(&mut tx, &[target, source], &mut view).await?;

        let source_categories = view.assigned_ids(source, EntityType::Category);
        let source_subs = view.assigned_ids(source, EntityType::Subcategory);
        load_existing(&mut tx, EntityType::Category, &source_categories, &mut view).await?;
        load_sub_category_links(&mut tx, &source_categories, &source_subs, &mut view).await?;

        // Share-lock what the source shows so no edit can decide "not shared" while
        // this import adds another city to one of these products.
        if scope.includes(EntityType::Product) {
            let products = view.assigned_ids(source, EntityType::Product);
            load_existing(&mut tx, EntityType::Product, &products, &mut view).await?;
        }

        let plan = plan_import(&view, target, source, scope)?;
        insert_assignments(&mut tx, plan.rows()).await?;
        commit(tx).await?;

        info!(outcome = ?plan.outcome(), "city import committed");
        Ok(plan)
    }
}

// Transaction helpers

async fn commit(tx: Transaction<'static, Postgres>) -> StoreResult<()> {
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("commit_transaction", e))
}

async fn lock_city(tx: &mut Transaction<'_, Postgres>, id: CityId) -> StoreResult<Option<City>> {
    let row = sqlx::query_as::<_, CityRow>("SELECT * FROM cities WHERE id = $1 FOR UPDATE")
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_city", e))?;
    Ok(row.map(City::from))
}

async fn save_city(tx: &mut Transaction<'_, Postgres>, city: &City) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE cities
        SET name = $2, state = $3, contact_number = $4, is_active = $5, sort_order = $6, updated_at = $7
        WHERE id = $1
        "#,
    )
    .bind(city.id.as_uuid())
    .bind(&city.name)
    .bind(&city.state)
    .bind(&city.contact_number)
    .bind(city.is_active)
    .bind(city.sort_order)
    .bind(city.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("save_city", e))?;
    Ok(())
}

/// Lock the order-version row and read the current order.
async fn lock_order(tx: &mut Transaction<'_, Postgres>) -> StoreResult<CategoryOrder> {
    let version: i64 = sqlx::query_scalar("SELECT version FROM category_order_state WHERE id FOR UPDATE")
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("lock_category_order", e))?;
    let ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM categories ORDER BY sort_order, id")
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("read_category_order", e))?;
    Ok(CategoryOrder::new(
        ids.into_iter().map(CategoryId::from_uuid).collect(),
        version as u64,
    ))
}

/// Rewrite every category's `sort_order` from `order` in one statement and stamp the
/// new version.
async fn write_order(tx: &mut Transaction<'_, Postgres>, order: &CategoryOrder) -> StoreResult<()> {
    let (ids, positions): (Vec<Uuid>, Vec<i32>) = order.positions().map(|(id, p)| (Uuid::from(id), p)).unzip();

    sqlx::query(
        r#"
        UPDATE categories AS c
        SET sort_order = u.sort_order
        FROM UNNEST($1::uuid[], $2::int[]) AS u(id, sort_order)
        WHERE c.id = u.id AND c.sort_order IS DISTINCT FROM u.sort_order
        "#,
    )
    .bind(&ids)
    .bind(&positions)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("write_category_order", e))?;

    sqlx::query("UPDATE category_order_state SET version = $1 WHERE id")
        .bind(order.version() as i64)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("bump_order_version", e))?;
    Ok(())
}

fn assignment_columns<'a>(rows: impl Iterator<Item = &'a Assignment>) -> (Vec<Uuid>, Vec<String>, Vec<Uuid>) {
    let mut cities = Vec::new();
    let mut types = Vec::new();
    let mut ids = Vec::new();
    for row in rows {
        cities.push(*row.city_id.as_uuid());
        types.push(row.entity_type.as_str().to_string());
        ids.push(row.entity_id);
    }
    (cities, types, ids)
}

async fn insert_assignments<'a>(
    tx: &mut Transaction<'_, Postgres>,
    rows: impl Iterator<Item = &'a Assignment>,
) -> StoreResult<u64> {
    let (cities, types, ids) = assignment_columns(rows);
    if cities.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query(
        r#"
        INSERT INTO city_assignments (city_id, entity_type, entity_id)
        SELECT * FROM UNNEST($1::uuid[], $2::text[], $3::uuid[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(&cities)
    .bind(&types)
    .bind(&ids)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_assignments", e))?;
    Ok(result.rows_affected())
}

async fn delete_assignments<'a>(
    tx: &mut Transaction<'_, Postgres>,
    rows: impl Iterator<Item = &'a Assignment>,
) -> StoreResult<u64> {
    let (cities, types, ids) = assignment_columns(rows);
    if cities.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query(
        r#"
        DELETE FROM city_assignments AS a
        USING UNNEST($1::uuid[], $2::text[], $3::uuid[]) AS d(city_id, entity_type, entity_id)
        WHERE a.city_id = d.city_id AND a.entity_type = d.entity_type AND a.entity_id = d.entity_id
        "#,
    )
    .bind(&cities)
    .bind(&types)
    .bind(&ids)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("delete_assignments", e))?;
    Ok(result.rows_affected())
}

async fn insert_product(tx: &mut Transaction<'_, Postgres>, product: &Product) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, description, price, images, attributes,
            category_id, sub_category_id, origin_product_id, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(product.id.as_uuid())
    .bind(&product.name)
    .bind(&product.description)
    .bind(price_param(product.price)?)
    .bind(Json(&product.images))
    .bind(Json(&product.attributes))
    .bind(product.category_id.as_uuid())
    .bind(product.sub_category_id.map(Uuid::from))
    .bind(product.origin_product_id.map(Uuid::from))
    .bind(product.created_at)
    .bind(product.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_product", e))?;
    Ok(())
}

async fn update_product(tx: &mut Transaction<'_, Postgres>, product: &Product) -> StoreResult<()> {
    sqlx::query(
        r#"
        UPDATE products
        SET name = $2, description = $3, price = $4, images = $5, attributes = $6,
            category_id = $7, sub_category_id = $8, updated_at = $9
        WHERE id = $1
        "#,
    )
    .bind(product.id.as_uuid())
    .bind(&product.name)
    .bind(&product.description)
    .bind(price_param(product.price)?)
    .bind(Json(&product.images))
    .bind(Json(&product.attributes))
    .bind(product.category_id.as_uuid())
    .bind(product.sub_category_id.map(Uuid::from))
    .bind(product.updated_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("update_product", e))?;
    Ok(())
}

fn price_param(price: u64) -> StoreResult<i64> {
    i64::try_from(price).map_err(|_| CatalogError::validation(format!("price {price} is out of range")).into())
}

// View loaders: pull exactly the rows a planner will ask about into a SnapshotView.

async fn load_city_assignments(
    tx: &mut Transaction<'_, Postgres>,
    cities: &[CityId],
    view: &mut SnapshotView,
) -> StoreResult<()> {
    let cities: Vec<Uuid> = cities.iter().map(|c| *c.as_uuid()).collect();
    let rows = sqlx::query("SELECT city_id, entity_type, entity_id FROM city_assignments WHERE city_id = ANY($1)")
        .bind(&cities)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("load_city_assignments", e))?;

    for row in rows {
        let city: Uuid = row.try_get("city_id").map_err(|e| map_sqlx_error("decode_assignment", e))?;
        let raw_type: String = row
            .try_get("entity_type")
            .map_err(|e| map_sqlx_error("decode_assignment", e))?;
        let entity_id: Uuid = row.try_get("entity_id").map_err(|e| map_sqlx_error("decode_assignment", e))?;
        let entity_type = EntityType::from_str(&raw_type)
            .map_err(|e| StoreError::backend(format!("unexpected entity_type in city_assignments: {e}")))?;
        view.insert_assignment(Assignment::new(CityId::from_uuid(city), entity_type, entity_id));
    }
    Ok(())
}

/// Record which of `ids` exist, holding a share lock on them until commit.
async fn load_existing(
    tx: &mut Transaction<'_, Postgres>,
    entity_type: EntityType,
    ids: &[Uuid],
    view: &mut SnapshotView,
) -> StoreResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let sql = format!(
        "SELECT id FROM {} WHERE id = ANY($1) ORDER BY id FOR SHARE",
        table(entity_type)
    );
    let found: Vec<Uuid> = sqlx::query_scalar(&sql)
        .bind(ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("load_existing", e))?;
    for id in found {
        view.insert_entity(entity_type, id);
    }
    Ok(())
}

/// Subcategory parent links for the children of `parents` and for `subs` themselves.
async fn load_sub_category_links(
    tx: &mut Transaction<'_, Postgres>,
    parents: &[Uuid],
    subs: &[Uuid],
    view: &mut SnapshotView,
) -> StoreResult<()> {
    if parents.is_empty() && subs.is_empty() {
        return Ok(());
    }
    let rows = sqlx::query(
        "SELECT id, parent_category_id FROM sub_categories WHERE parent_category_id = ANY($1) OR id = ANY($2)",
    )
    .bind(parents)
    .bind(subs)
    .fetch_all(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("load_sub_category_links", e))?;

    for row in rows {
        let id: Uuid = row.try_get("id").map_err(|e| map_sqlx_error("decode_sub_category", e))?;
        let parent: Uuid = row
            .try_get("parent_category_id")
            .map_err(|e| map_sqlx_error("decode_sub_category", e))?;
        view.insert_sub_category(SubCategoryId::from_uuid(id), CategoryId::from_uuid(parent));
    }
    Ok(())
}

/// The category (share-locked) and subcategory link a product points at.
async fn load_links(tx: &mut Transaction<'_, Postgres>, product: &Product, view: &mut SnapshotView) -> StoreResult<()> {
    load_existing(tx, EntityType::Category, &[*product.category_id.as_uuid()], view).await?;
    if let Some(sub) = product.sub_category_id {
        load_sub_category_links(tx, &[], &[*sub.as_uuid()], view).await?;
    }
    Ok(())
}

fn table(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Product => "products",
        EntityType::Category => "categories",
        EntityType::Subcategory => "sub_categories",
        EntityType::Carousel => "carousel_items",
    }
}

fn label_column(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Carousel => "title",
        _ => "name",
    }
}

fn listing_order(entity_type: EntityType) -> &'static str {
    match entity_type {
        EntityType::Product => "x.name, x.id",
        EntityType::Category => "x.sort_order, x.id",
        EntityType::Subcategory => "x.name, x.id",
        EntityType::Carousel => "x.created_at, x.id",
    }
}

fn entity_from_row(entity_type: EntityType, row: &PgRow) -> Result<CatalogEntity, sqlx::Error> {
    Ok(match entity_type {
        EntityType::Product => CatalogEntity::Product(ProductRow::from_row(row)?.into()),
        EntityType::Category => CatalogEntity::Category(CategoryRow::from_row(row)?.into()),
        EntityType::Subcategory => CatalogEntity::SubCategory(SubCategoryRow::from_row(row)?.into()),
        EntityType::Carousel => CatalogEntity::Carousel(CarouselRow::from_row(row)?.into()),
    })
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation: a concurrent writer got there first.
                Some("23505") => StoreError::Conflict(msg),
                // Foreign key / check violation: the request references or carries bad data.
                Some("23503") | Some("23514") => StoreError::Domain(CatalogError::validation(msg)),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {}", operation)),
        sqlx::Error::RowNotFound => StoreError::Backend(format!("unexpected row not found in {}", operation)),
        _ => StoreError::Backend(format!("sqlx error in {}: {}", operation, err)),
    }
}

// SQLx row types

#[derive(Debug)]
struct CityRow {
    id: Uuid,
    name: String,
    state: String,
    contact_number: String,
    is_active: bool,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for CityRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CityRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            state: row.try_get("state")?,
            contact_number: row.try_get("contact_number")?,
            is_active: row.try_get("is_active")?,
            sort_order: row.try_get("sort_order")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<CityRow> for City {
    fn from(row: CityRow) -> Self {
        City {
            id: CityId::from_uuid(row.id),
            name: row.name,
            state: row.state,
            contact_number: row.contact_number,
            is_active: row.is_active,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug)]
struct CategoryRow {
    id: Uuid,
    name: String,
    description: String,
    media: Json<Vec<String>>,
    sort_order: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for CategoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CategoryRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            media: row.try_get("media")?,
            sort_order: row.try_get("sort_order")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: CategoryId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            media: row.media.0,
            sort_order: row.sort_order,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug)]
struct SubCategoryRow {
    id: Uuid,
    name: String,
    description: String,
    media: Json<Vec<String>>,
    parent_category_id: Uuid,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for SubCategoryRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(SubCategoryRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            media: row.try_get("media")?,
            parent_category_id: row.try_get("parent_category_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<SubCategoryRow> for SubCategory {
    fn from(row: SubCategoryRow) -> Self {
        SubCategory {
            id: SubCategoryId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            media: row.media.0,
            parent_category_id: CategoryId::from_uuid(row.parent_category_id),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug)]
struct ProductRow {
    id: Uuid,
    name: String,
    description: String,
    price: i64,
    images: Json<Vec<String>>,
    attributes: Json<BTreeMap<String, String>>,
    category_id: Uuid,
    sub_category_id: Option<Uuid>,
    origin_product_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for ProductRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(ProductRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            images: row.try_get("images")?,
            attributes: row.try_get("attributes")?,
            category_id: row.try_get("category_id")?,
            sub_category_id: row.try_get("sub_category_id")?,
            origin_product_id: row.try_get("origin_product_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: ProductId::from_uuid(row.id),
            name: row.name,
            description: row.description,
            // price >= 0 is a table constraint
            price: row.price.max(0) as u64,
            images: row.images.0,
            attributes: row.attributes.0,
            category_id: CategoryId::from_uuid(row.category_id),
            sub_category_id: row.sub_category_id.map(SubCategoryId::from_uuid),
            origin_product_id: row.origin_product_id.map(ProductId::from_uuid),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug)]
struct CarouselRow {
    id: Uuid,
    title: String,
    image: String,
    is_mobile: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for CarouselRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(CarouselRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            image: row.try_get("image")?,
            is_mobile: row.try_get("is_mobile")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl From<CarouselRow> for CarouselItem {
    fn from(row: CarouselRow) -> Self {
        CarouselItem {
            id: CarouselItemId::from_uuid(row.id),
            title: row.title,
            image: row.image,
            is_mobile: row.is_mobile,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    /// Runs only when `CITYCAT_TEST_DATABASE_URL` points at a scratch database.
    fn with_store<F, Fut>(test: F)
    where
        F: FnOnce(PostgresCatalogStore) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let Ok(url) = std::env::var("CITYCAT_TEST_DATABASE_URL") else {
            return;
        };
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(async {
                let store = PostgresCatalogStore::connect(&url).await.unwrap();
                store.ensure_schema().await.unwrap();
                test(store).await;
            });
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

    #[test]
    fn import_waits_for_a_product_locked_by_an_edit() {
        with_store(|store| async move {
            let gaya = store.create_city(new_city("Gaya")).await.unwrap();
            let ranchi = store.create_city(new_city("Ranchi")).await.unwrap();
            let birthday = store
                .create_category(NewCategory {
                    name: "Birthday".to_string(),
                    description: String::new(),
                    media: Vec::new(),
                })
                .await
                .unwrap();
            let arch = store
                .create_product(NewProduct {
                    name: "Gold Arch".to_string(),
                    description: String::new(),
                    price: 999,
                    images: Vec::new(),
                    attributes: BTreeMap::new(),
                    category_id: birthday.id,
                    sub_category_id: None,
                })
                .await
                .unwrap();
            store
                .assign(gaya.id, EntityType::Product, vec![*arch.id.as_uuid()])
                .await
                .unwrap();

            // Hold the row the way an in-flight edit does, touching neither city.
            let mut edit = store.pool.begin().await.unwrap();
            sqlx::query("SELECT id FROM products WHERE id = $1 FOR UPDATE")
                .bind(arch.id.as_uuid())
                .execute(&mut *edit)
                .await
                .unwrap();

            let import = store.import(ranchi.id, gaya.id, ImportScope::ProductsOnly);
            tokio::pin!(import);
            let blocked = tokio::time::timeout(Duration::from_millis(300), &mut import).await;
            assert!(blocked.is_err(), "import must wait for the product lock");

            edit.commit().await.unwrap();
            let plan = import.await.unwrap();
            assert_eq!(plan.outcome().products_added, 1);

            store.delete_city(gaya.id).await.unwrap();
            store.delete_city(ranchi.id).await.unwrap();
            store.delete_product(arch.id).await.unwrap();
            store.delete_category(birthday.id).await.unwrap();
        });
    }
}
