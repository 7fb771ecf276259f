//! HTTP handlers for stock endpoints

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::ledger::{LedgerService, LowStockAlert, StocktakingInput, StocktakingLine};
use crate::services::reporting::ReportingService;
use crate::AppState;

/// Products that need reordering
pub async fn get_low_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<LowStockAlert>>> {
    let service = LedgerService::new(state.db);
    let alerts = service.low_stock(current_user.0.user_id).await?;
    Ok(Json(alerts))
}

/// Record a physical count
pub async fn record_stocktaking(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<StocktakingInput>,
) -> AppResult<Json<Vec<StocktakingLine>>> {
    let service = LedgerService::new(state.db);
    let lines = service.stocktaking(current_user.0.user_id, input).await?;
    Ok(Json(lines))
}

/// Export the full ledger as CSV
pub async fn export_movements(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<impl IntoResponse> {
    let service = LedgerService::new(state.db);
    let rows = service.export_rows(current_user.0.user_id).await?;
    let csv = ReportingService::export_to_csv(&rows)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"inventory_movements.csv\""),
        ],
        csv,
    ))
}
