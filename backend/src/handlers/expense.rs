//! HTTP handlers for expense endpoints

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::services::expense::{ExpenseFilter, ExpenseList, ExpenseService};
use crate::AppState;

/// List expenses with their sum
pub async fn list_expenses(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<ExpenseFilter>,
) -> AppResult<Json<ExpenseList>> {
    let service = ExpenseService::new(state.db);
    let expenses = service.list(current_user.0.user_id, &filter).await?;
    Ok(Json(expenses))
}
