//! HTTP handlers for product endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{InventoryMovement, Product};
use crate::services::catalog::{CatalogService, CreateProductInput, UpdateProductInput};
use crate::services::ledger::{AveragePrice, LedgerService, ProductStock};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
pub struct StockQuery {
    pub device_id: Option<Uuid>,
}

/// Create a product
pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    let service = CatalogService::new(state.db);
    let product = service.create_product(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

/// List products
pub async fn list_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ProductListQuery>,
) -> AppResult<Json<Vec<Product>>> {
    let service = CatalogService::new(state.db);
    let products = service
        .list_products(current_user.0.user_id, query.include_inactive)
        .await?;
    Ok(Json(products))
}

/// Get a product
pub async fn get_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Product>> {
    let service = CatalogService::new(state.db);
    let product = service.get_product(current_user.0.user_id, product_id).await?;
    Ok(Json(product))
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Json(input): Json<UpdateProductInput>,
) -> AppResult<Json<Product>> {
    let service = CatalogService::new(state.db);
    let product = service
        .update_product(current_user.0.user_id, product_id, input)
        .await?;
    Ok(Json(product))
}

/// Delete a product
pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = CatalogService::new(state.db);
    service.delete_product(current_user.0.user_id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Derived stock of a product, optionally at one device
pub async fn get_product_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
    Query(query): Query<StockQuery>,
) -> AppResult<Json<ProductStock>> {
    let service = LedgerService::new(state.db);
    let stock = service
        .get_product_stock(current_user.0.user_id, product_id, query.device_id)
        .await?;
    Ok(Json(stock))
}

/// Ledger entries of a product
pub async fn list_product_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<Vec<InventoryMovement>>> {
    let service = LedgerService::new(state.db);
    let movements = service
        .list_movements(current_user.0.user_id, product_id)
        .await?;
    Ok(Json(movements))
}

/// Average purchase price of a product
pub async fn get_average_price(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<AveragePrice>> {
    let service = LedgerService::new(state.db);
    let price = service
        .average_price(current_user.0.user_id, product_id)
        .await?;
    Ok(Json(price))
}
