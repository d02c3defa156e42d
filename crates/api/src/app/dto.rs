use serde::{Deserialize, Serialize};
use uuid::Uuid;

use citycat_catalog::{CatalogEntity, ImportScope, MoveDirection};
use citycat_core::{CategoryId, CityId};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct IdsRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub category_ids: Vec<CategoryId>,
    /// Omitted: last writer wins.
    pub expected_version: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct MoveRequest {
    pub direction: MoveDirection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRequest {
    pub source_city_id: CityId,
    #[serde(default)]
    pub scope: ImportScope,
}

#[derive(Debug, Default, Deserialize)]
pub struct AssignableQuery {
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFilter {
    pub category_id: Option<CategoryId>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamQuery {
    pub city_id: Option<CityId>,
}

// -------------------------
// Response DTOs
// -------------------------

/// `{"items": [...]}` wrapper used by every list endpoint.
#[derive(Debug, Serialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

impl<T> From<Vec<T>> for Items<T> {
    fn from(items: Vec<T>) -> Self {
        Self { items }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityListing {
    pub city_id: CityId,
    pub entity_type: String,
    pub items: Vec<CatalogEntity>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityDeleted {
    pub id: CityId,
    pub removed_assignments: usize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCities {
    pub product_id: Uuid,
    pub city_ids: Vec<CityId>,
}
