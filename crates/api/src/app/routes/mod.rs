use axum::{
    Router,
    routing::{get, post, put},
};

pub mod assignments;
pub mod carousel;
pub mod categories;
pub mod cities;
pub mod import;
pub mod overlay;
pub mod products;
pub mod subcategories;
pub mod system;

/// Router for all admin endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/stream", get(system::stream))
        .nest("/cities", cities::router())
        .nest("/categories", categories::router())
        .nest("/subcategories", subcategories::router())
        .nest("/products", products::router())
        .nest("/carousel", carousel::router())
        .route("/cities/:id/assigned/:entity_type", get(assignments::list_assigned))
        .route("/cities/:id/assignable/:entity_type", get(assignments::list_assignable))
        .route(
            "/cities/:id/assign/:entity_type",
            post(assignments::assign).delete(assignments::unassign),
        )
        .route(
            "/cities/:id/products/:product_id",
            put(overlay::edit_product_in_city).get(overlay::product_in_city),
        )
        .route("/products/:id/cities", get(overlay::cities_assigned_to))
        .route("/cities/:id/import", post(import::import_city))
}
