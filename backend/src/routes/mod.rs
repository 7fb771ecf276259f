//! Route definitions for the Automaten Manager API

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .nest("/refills", refill_routes())
        .nest("/products", product_routes())
        .nest("/suppliers", supplier_routes())
        .nest("/devices", device_routes())
        .nest("/inventory", inventory_routes())
        .route("/expenses", get(handlers::list_expenses))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        .merge(protected)
}

/// Refill routes
fn refill_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_refills).post(handlers::create_refill))
        .route("/form", post(handlers::create_refill_form))
        .route("/preview", post(handlers::preview_refill))
        .route("/export", get(handlers::export_refills))
        .route(
            "/:refill_id",
            get(handlers::get_refill).delete(handlers::delete_refill),
        )
        .route("/:refill_id/post", post(handlers::post_refill))
        .route("/:refill_id/void", post(handlers::void_refill))
}

/// Product routes
fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_products).post(handlers::create_product))
        .route(
            "/:product_id",
            get(handlers::get_product)
                .put(handlers::update_product)
                .delete(handlers::delete_product),
        )
        .route("/:product_id/stock", get(handlers::get_product_stock))
        .route("/:product_id/movements", get(handlers::list_product_movements))
        .route("/:product_id/average-price", get(handlers::get_average_price))
}

/// Supplier routes
fn supplier_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_suppliers).post(handlers::create_supplier))
        .route(
            "/:supplier_id",
            get(handlers::get_supplier)
                .put(handlers::update_supplier)
                .delete(handlers::delete_supplier),
        )
        .route("/:supplier_id/statistics", get(handlers::get_supplier_statistics))
}

/// Vending machine routes
fn device_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_devices).post(handlers::create_device))
        .route(
            "/:device_id",
            get(handlers::get_device)
                .put(handlers::update_device)
                .delete(handlers::delete_device),
        )
}

/// Stock routes
fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/low-stock", get(handlers::get_low_stock))
        .route("/stocktaking", post(handlers::record_stocktaking))
        .route("/movements/export", get(handlers::export_movements))
}
