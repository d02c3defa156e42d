use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use citycat_catalog::ProductPatch;
use citycat_core::{CityId, ProductId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// PUT /cities/:id/products/:product_id
///
/// Edits the product as the city sees it. The response says whether the edit was
/// applied in place or produced a city-local fork (`wasForked: true`, new `productId`).
pub async fn edit_product_in_city(
    Extension(services): Extension<Arc<AppServices>>,
    Path((city, product)): Path<(String, String)>,
    Json(patch): Json<ProductPatch>,
) -> axum::response::Response {
    let city_id: CityId = match errors::parse_path(&city) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let product_id: ProductId = match errors::parse_path(&product) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .catalog()
        .edit_product_in_city(city_id, product_id, patch)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn product_in_city(
    Extension(services): Extension<Arc<AppServices>>,
    Path((city, product)): Path<(String, String)>,
) -> axum::response::Response {
    let city_id: CityId = match errors::parse_path(&city) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let product_id: ProductId = match errors::parse_path(&product) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().product_in_city(city_id, product_id).await {
        Ok(product) => (StatusCode::OK, Json(product)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn cities_assigned_to(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id: ProductId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().cities_assigned_to(product_id).await {
        Ok(city_ids) => (
            StatusCode::OK,
            Json(dto::ProductCities {
                product_id: product_id.into(),
                city_ids,
            }),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
