//! HTTP handlers for supplier endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::Supplier;
use crate::services::catalog::{CatalogService, SupplierInput};
use crate::services::reporting::{ReportingService, SupplierStatistics};
use crate::AppState;

/// Create a supplier
pub async fn create_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<SupplierInput>,
) -> AppResult<(StatusCode, Json<Supplier>)> {
    let service = CatalogService::new(state.db);
    let supplier = service.create_supplier(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

/// List suppliers
pub async fn list_suppliers(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Supplier>>> {
    let service = CatalogService::new(state.db);
    let suppliers = service.list_suppliers(current_user.0.user_id).await?;
    Ok(Json(suppliers))
}

/// Get a supplier
pub async fn get_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<Supplier>> {
    let service = CatalogService::new(state.db);
    let supplier = service.get_supplier(current_user.0.user_id, supplier_id).await?;
    Ok(Json(supplier))
}

/// Update a supplier
pub async fn update_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
    Json(input): Json<SupplierInput>,
) -> AppResult<Json<Supplier>> {
    let service = CatalogService::new(state.db);
    let supplier = service
        .update_supplier(current_user.0.user_id, supplier_id, input)
        .await?;
    Ok(Json(supplier))
}

/// Delete a supplier
pub async fn delete_supplier(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = CatalogService::new(state.db);
    service.delete_supplier(current_user.0.user_id, supplier_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Purchase statistics of a supplier
pub async fn get_supplier_statistics(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(supplier_id): Path<Uuid>,
) -> AppResult<Json<SupplierStatistics>> {
    let service = ReportingService::new(state.db);
    let stats = service
        .supplier_statistics(current_user.0.user_id, supplier_id)
        .await?;
    Ok(Json(stats))
}
