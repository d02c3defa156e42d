use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use citycat_catalog::{NewSubCategory, SubCategoryUpdate};
use citycat_core::SubCategoryId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_sub_category).get(list_sub_categories))
        .route(
            "/:id",
            get(get_sub_category).patch(update_sub_category).delete(delete_sub_category),
        )
}

pub async fn create_sub_category(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<NewSubCategory>,
) -> axum::response::Response {
    match services.catalog().create_sub_category(body).await {
        Ok(sub) => (StatusCode::CREATED, Json(sub)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn list_sub_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Query(filter): Query<dto::CategoryFilter>,
) -> axum::response::Response {
    match services.catalog().list_sub_categories(filter.category_id).await {
        Ok(subs) => (StatusCode::OK, Json(dto::Items::from(subs))).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn get_sub_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SubCategoryId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().get_sub_category(id).await {
        Ok(sub) => (StatusCode::OK, Json(sub)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn update_sub_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<SubCategoryUpdate>,
) -> axum::response::Response {
    let id: SubCategoryId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().update_sub_category(id, body).await {
        Ok(sub) => (StatusCode::OK, Json(sub)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn delete_sub_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: SubCategoryId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().delete_sub_category(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
