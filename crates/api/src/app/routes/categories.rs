use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use citycat_catalog::{CategoryUpdate, NewCategory};
use citycat_core::{CategoryId, ExpectedVersion};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_category).get(list_categories))
        .route("/order", get(category_order))
        .route("/reorder", post(reorder_categories))
        .route("/:id", get(get_category).patch(update_category).delete(delete_category))
        .route("/:id/move", post(move_category))
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewCategory>,
) -> axum::response::Response {
    match services.catalog().create_category(body).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.catalog().list_categories().await {
        Ok(categories) => (StatusCode::OK, Json(dto::Items::from(categories))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().get_category(id).await {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<CategoryUpdate>,
) -> axum::response::Response {
    let id: CategoryId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().update_category(id, body).await {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().delete_category(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn category_order(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.catalog().category_order().await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// POST /categories/reorder
///
/// Body: `{"categoryIds": [...], "expectedVersion": 7}`. The ids must be a permutation
/// of every category. A stale `expectedVersion` is a 409; re-read `/categories/order`.
pub async fn reorder_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::ReorderRequest>,
) -> axum::response::Response {
    let expected = ExpectedVersion::from(body.expected_version);
    match services.catalog().reorder_categories(body.category_ids, expected).await {
        Ok(order) => (StatusCode::OK, Json(order)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn move_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::MoveRequest>,
) -> axum::response::Response {
    let id: CategoryId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().move_category(id, body.direction).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
