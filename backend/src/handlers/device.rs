//! HTTP handlers for vending machine endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::Device;
use crate::services::catalog::{CatalogService, CreateDeviceInput, UpdateDeviceInput};
use crate::AppState;

pub async fn create_device(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateDeviceInput>,
) -> AppResult<(StatusCode, Json<Device>)> {
    let service = CatalogService::new(state.db);
    let device = service.create_device(current_user.0.user_id, input).await?;
    Ok((StatusCode::CREATED, Json(device)))
}

pub async fn list_devices(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Device>>> {
    let service = CatalogService::new(state.db);
    let devices = service.list_devices(current_user.0.user_id).await?;
    Ok(Json(devices))
}

pub async fn get_device(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(device_id): Path<Uuid>,
) -> AppResult<Json<Device>> {
    let service = CatalogService::new(state.db);
    let device = service.get_device(current_user.0.user_id, device_id).await?;
    Ok(Json(device))
}

pub async fn update_device(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(device_id): Path<Uuid>,
    Json(input): Json<UpdateDeviceInput>,
) -> AppResult<Json<Device>> {
    let service = CatalogService::new(state.db);
    let device = service
        .update_device(current_user.0.user_id, device_id, input)
        .await?;
    Ok(Json(device))
}

pub async fn delete_device(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(device_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = CatalogService::new(state.db);
    service.delete_device(current_user.0.user_id, device_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
