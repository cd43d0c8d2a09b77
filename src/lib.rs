//! Price list resolution and discount rule engine served over HTTP.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod pricing;
pub mod routes;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

use crate::pricing::PricingStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Pool used by the admin routes
    pub db: PgPool,
    /// Read side used by the pricing engine
    pub store: Arc<dyn PricingStore>,
}

/// Build the application router
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .nest("/api/pricing", pricing::router())
        .merge(admin_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

fn admin_router() -> Router<AppState> {
    use routes::{catalog, combinations, discount_rules, price_lists};

    Router::new()
        .route("/api/companies", get(catalog::companies))
        .route("/api/companies/:id/branches", get(catalog::branches))
        .route("/api/items/:id", get(catalog::item))
        .route(
            "/api/price-lists",
            get(price_lists::list).post(price_lists::create),
        )
        .route(
            "/api/price-lists/:id",
            get(price_lists::detail)
                .put(price_lists::update)
                .delete(price_lists::remove),
        )
        .route("/api/price-lists/:id/rules", get(price_lists::rules))
        .route("/api/price-lists/:id/prices", get(price_lists::base_prices))
        .route(
            "/api/price-lists/:id/prices/:item_id",
            put(price_lists::set_base_price),
        )
        .route(
            "/api/price-lists/:id/combinations",
            get(combinations::list).post(combinations::create),
        )
        .route(
            "/api/combinations/:id",
            get(combinations::detail).delete(combinations::remove),
        )
        .route(
            "/api/combinations/:id/items/:item_id",
            put(combinations::add_item).delete(combinations::remove_item),
        )
        .route("/api/discount-rules", post(discount_rules::create))
        .route(
            "/api/discount-rules/:id",
            put(discount_rules::update).delete(discount_rules::remove),
        )
}
