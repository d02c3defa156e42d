//! City assignment endpoints. `:entity_type` accepts singular or plural
//! (`products`, `category`, `subcategories`, `carousel`).

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
};

use citycat_catalog::EntityType;
use citycat_core::CityId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

fn parse_scope(city: &str, entity_type: &str) -> Result<(CityId, EntityType), axum::response::Response> {
    Ok((errors::parse_path(city)?, errors::parse_path(entity_type)?))
}

pub async fn list_assigned(
    Extension(services): Extension<Arc<AppServices>>,
    Path((city, entity_type)): Path<(String, String)>,
) -> axum::response::Response {
    let (city_id, entity_type) = match parse_scope(&city, &entity_type) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().list_assigned(city_id, entity_type).await {
        Ok(items) => (
            StatusCode::OK,
            Json(dto::EntityListing {
                city_id,
                entity_type: entity_type.to_string(),
                items,
            }),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// GET /cities/:id/assignable/:entity_type?search=
///
/// Entities of the type not yet assigned to the city, filtered by a case-insensitive
/// substring of their label.
pub async fn list_assignable(
    Extension(services): Extension<Arc<AppServices>>,
    Path((city, entity_type)): Path<(String, String)>,
    Query(query): Query<dto::AssignableQuery>,
) -> axum::response::Response {
    let (city_id, entity_type) = match parse_scope(&city, &entity_type) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .catalog()
        .list_assignable(city_id, entity_type, query.search)
        .await
    {
        Ok(items) => (
            StatusCode::OK,
            Json(dto::EntityListing {
                city_id,
                entity_type: entity_type.to_string(),
                items,
            }),
        )
            .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn assign(
    Extension(services): Extension<Arc<AppServices>>,
    Path((city, entity_type)): Path<(String, String)>,
    Json(body): Json<dto::IdsRequest>,
) -> axum::response::Response {
    let (city_id, entity_type) = match parse_scope(&city, &entity_type) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().assign(city_id, entity_type, body.ids).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn unassign(
    Extension(services): Extension<Arc<AppServices>>,
    Path((city, entity_type)): Path<(String, String)>,
    Json(body): Json<dto::IdsRequest>,
) -> axum::response::Response {
    let (city_id, entity_type) = match parse_scope(&city, &entity_type) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services.catalog().unassign(city_id, entity_type, body.ids).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
