mod health;
mod products;
mod sections;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::AppState;

pub use products::{UpdateProductRequest, VersionQuery};
pub use sections::SectionImageResponse;

pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check))
        .route(
            "/productos",
            get(products::list_products).post(products::create_product),
        )
        .route(
            "/productos/{id}",
            get(products::get_product).patch(products::update_product),
        )
        .route(
            "/productos/{id}/imagenes/{slot}",
            delete(products::delete_product_image),
        )
        .route("/secciones/{sku}", post(sections::upload_section_image))
}
