use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use citycat_catalog::{CarouselUpdate, NewCarouselItem};
use citycat_core::CarouselItemId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_item).get(list_items))
        .route("/:id", get(get_item).patch(update_item).delete(delete_item))
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewCarouselItem>,
) -> axum::response::Response {
    match services.catalog().create_carousel_item(body).await {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_items(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.catalog().list_carousel_items().await {
        Ok(items) => (StatusCode::OK, Json(dto::Items::from(items))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CarouselItemId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().get_carousel_item(id).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<CarouselUpdate>,
) -> axum::response::Response {
    let id: CarouselItemId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().update_carousel_item(id, body).await {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CarouselItemId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().delete_carousel_item(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
