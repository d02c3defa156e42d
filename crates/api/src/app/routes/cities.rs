use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use citycat_core::CityId;
use citycat_markets::{CityUpdate, NewCity};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_city).get(list_cities))
        .route("/:id", get(get_city).patch(update_city).delete(delete_city))
        .route("/:id/deactivate", post(deactivate_city))
        .route("/:id/activate", post(activate_city))
}

pub async fn create_city(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewCity>,
) -> axum::response::Response {
    match services.catalog().create_city(body).await {
        Ok(city) => (StatusCode::CREATED, Json(city)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_cities(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.catalog().list_cities().await {
        Ok(cities) => (StatusCode::OK, Json(dto::Items::from(cities))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_city(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CityId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().get_city(id).await {
        Ok(city) => (StatusCode::OK, Json(city)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_city(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<CityUpdate>,
) -> axum::response::Response {
    let id: CityId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().update_city(id, body).await {
        Ok(city) => (StatusCode::OK, Json(city)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn deactivate_city(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CityId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().deactivate_city(id).await {
        Ok(city) => (StatusCode::OK, Json(city)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn activate_city(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CityId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().activate_city(id).await {
        Ok(city) => (StatusCode::OK, Json(city)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_city(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CityId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().delete_city(id).await {
        Ok(removed_assignments) => (
            StatusCode::OK,
            Json(dto::CityDeleted {
                id,
                removed_assignments,
            }),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
