use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
};

use citycat_core::CityId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// POST /cities/:id/import
///
/// Body: `{"sourceCityId": "...", "scope": "all"}`. Adds to the target (`:id`) every
/// entity the source shows that the target lacks; nothing is removed or forked.
pub async fn import_city(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Json(body): Json<dto::ImportRequest>,
) -> axum::response::Response {
    let target: CityId = match errors::parse_path(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match services
        .catalog()
        .import(target, body.source_city_id, body.scope)
        .await
    {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}
