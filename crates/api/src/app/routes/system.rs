use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::dto;
use crate::app::services::{self, AppServices};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// GET /stream?cityId=
///
/// Server-sent events of committed catalog changes. With `cityId`, only that city's
/// changes and global ones (reorders, catalog CRUD) are sent.
pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
    Query(query): Query<dto::StreamQuery>,
) -> axum::response::Response {
    services::catalog_sse_stream(services, query.city_id).into_response()
}
