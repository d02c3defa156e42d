use std::str::FromStr;

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use citycat_core::CatalogError;
use citycat_infra::StoreError;

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    let code = err.code();
    match err {
        StoreError::Domain(e) => {
            let status = match &e {
                CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::InvalidCity(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CatalogError::NotAssigned(_) => StatusCode::CONFLICT,
                CatalogError::IncompleteOrder(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CatalogError::OrderConflict { .. } => StatusCode::CONFLICT,
                CatalogError::SameCity => StatusCode::UNPROCESSABLE_ENTITY,
                CatalogError::Validation(_) => StatusCode::BAD_REQUEST,
            };
            json_error(status, code, e.to_string())
        }
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, code, msg),
        StoreError::Backend(msg) => json_error(StatusCode::INTERNAL_SERVER_ERROR, code, msg),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Parse a path segment (id or entity type) into its domain type.
pub fn parse_path<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = CatalogError>,
{
    raw.parse()
        .map_err(|e: CatalogError| json_error(StatusCode::BAD_REQUEST, "invalid_path", e.to_string()))
}
