//! HTTP API server with observability for the retail checkout pipeline.
//!
//! Provides REST endpoints for the shopper's cart, checkout and order history
//! plus administrator status changes, with structured logging (tracing) and
//! Prometheus metrics.

pub mod config;
pub mod demo;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, post, put};
use domain::{
    AddressBook, CartService, CheckoutConfig, CheckoutService, EventPublisher, OrderService,
    UserDirectory,
};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store>(state: Arc<AppState<S>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/users/{user_id}/cart",
            get(routes::cart::get::<S>).delete(routes::cart::clear::<S>),
        )
        .route("/users/{user_id}/cart/items", post(routes::cart::add_item::<S>))
        .route(
            "/users/{user_id}/cart/items/decrement",
            post(routes::cart::decrement_item::<S>),
        )
        .route(
            "/users/{user_id}/cart/items/{product_id}",
            delete(routes::cart::remove_item::<S>),
        )
        .route(
            "/users/{user_id}/orders",
            post(routes::orders::place::<S>).get(routes::orders::list::<S>),
        )
        .route(
            "/users/{user_id}/orders/{order_id}",
            get(routes::orders::get::<S>),
        )
        .route(
            "/admin/orders/{order_id}",
            put(routes::admin::update_order::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the cart, checkout and order services over one store.
pub fn create_default_state<S: Store>(
    store: S,
    users: Arc<dyn UserDirectory>,
    addresses: Arc<dyn AddressBook>,
    publisher: Arc<dyn EventPublisher>,
    checkout_config: CheckoutConfig,
) -> Arc<AppState<S>> {
    let carts = CartService::new(store.clone(), Arc::clone(&users));
    let checkout = CheckoutService::new(
        store.clone(),
        Arc::clone(&users),
        addresses,
        Arc::clone(&publisher),
    )
    .with_config(checkout_config);
    let orders = OrderService::new(store, users, publisher);

    Arc::new(AppState {
        carts,
        checkout,
        orders,
    })
}
