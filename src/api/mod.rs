//! HTTP surface.
//!
//! Handlers stay thin: extract, validate, call one service, serialize.

pub mod actor;
pub mod admin;
pub mod cart;
pub mod error;
pub mod orders;

use std::time::Duration;

use axum::{
    routing::{delete, get, post, put},
    Json, Router,
};
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::services::Services;
use crate::store::Store;

pub use actor::ACTOR_HEADER;
pub use error::{ApiError, ApiResult};

pub struct AppState<S: Store> {
    pub services: Services<S>,
}

impl<S: Store> Clone for AppState<S> {
    fn clone(&self) -> Self { Self { services: self.services.clone() } }
}

impl<S: Store> AppState<S> {
    pub fn new(services: Services<S>) -> Self { Self { services } }
}

pub fn router<S: Store>(state: AppState<S>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-core"})) }))
        .route("/api/v1/cart", get(cart::get_cart::<S>))
        .route("/api/v1/cart/items", post(cart::add_item::<S>).put(cart::update_item::<S>))
        .route("/api/v1/cart/items/:product_id/:variant_id", delete(cart::remove_item::<S>))
        .route("/api/v1/checkout", post(orders::checkout::<S>))
        .route("/api/v1/orders", get(orders::my_orders::<S>))
        .route("/api/v1/orders/:id", get(orders::get_order::<S>))
        .route("/api/v1/products/:id/stock", get(orders::product_stock::<S>))
        .route("/api/v1/admin/orders/:id/status", put(admin::update_status::<S>))
        .route("/api/v1/admin/orders/:id/payment-status", put(admin::update_payment_status::<S>))
        .route("/api/v1/admin/orders/:id/verify-payment", post(admin::verify_payment::<S>))
        .route("/api/v1/admin/orders/:id/refunds", post(admin::refund::<S>))
        .route("/api/v1/admin/orders/:id/history", get(admin::order_history::<S>))
        .route("/api/v1/admin/inventory/adjustments", post(admin::adjust_stock::<S>))
        .route("/api/v1/admin/inventory/logs", get(admin::inventory_logs::<S>))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}
