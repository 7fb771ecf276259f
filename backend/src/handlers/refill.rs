//! HTTP handlers for refill endpoints

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::Form;
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::CurrentUser;
use crate::models::{PricingInput, RefillSubmission, RefillTotals};
use crate::services::refill::{RefillDetail, RefillFilter, RefillService, RefillSummary};
use crate::services::reporting::{ExportFilter, ReportingService};
use crate::AppState;

/// Create a refill from a JSON body
pub async fn create_refill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(submission): Json<RefillSubmission>,
) -> AppResult<(StatusCode, Json<RefillDetail>)> {
    let defaults = state.config.submission_defaults();
    let service = RefillService::new(state.db);
    let refill = service
        .create(current_user.0.user_id, &submission, &defaults)
        .await?;
    Ok((StatusCode::CREATED, Json(refill)))
}

/// Create a refill from the HTML form (`product_id[]` style arrays).
/// An unchecked "prices include tax" box is simply absent, so it means no.
pub async fn create_refill_form(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Form(submission): Form<RefillSubmission>,
) -> AppResult<(StatusCode, Json<RefillDetail>)> {
    let defaults = state.config.submission_defaults().for_form();
    let service = RefillService::new(state.db);
    let refill = service
        .create(current_user.0.user_id, &submission, &defaults)
        .await?;
    Ok((StatusCode::CREATED, Json(refill)))
}

/// Calculate totals without saving
pub async fn preview_refill(
    _current_user: CurrentUser,
    Json(input): Json<PricingInput>,
) -> AppResult<Json<RefillTotals>> {
    let totals = RefillService::preview(&input)?;
    Ok(Json(totals))
}

/// List refills
pub async fn list_refills(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<RefillFilter>,
) -> AppResult<Json<Vec<RefillSummary>>> {
    let service = RefillService::new(state.db);
    let refills = service.list(current_user.0.user_id, &filter).await?;
    Ok(Json(refills))
}

/// Export refills as CSV (or JSON with `format=json`)
pub async fn export_refills(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<ExportFilter>,
) -> AppResult<impl IntoResponse> {
    let service = ReportingService::new(state.db);
    let data = service
        .refill_export_rows(current_user.0.user_id, &filter)
        .await?;

    if filter.format.as_deref() == Some("json") {
        return Ok(Json(data).into_response());
    }

    let csv = ReportingService::export_to_csv(&data)?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"refills.csv\""),
        ],
        csv,
    )
        .into_response())
}

/// Get a refill with its lines
pub async fn get_refill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(refill_id): Path<Uuid>,
) -> AppResult<Json<RefillDetail>> {
    let service = RefillService::new(state.db);
    let refill = service.get(current_user.0.user_id, refill_id).await?;
    Ok(Json(refill))
}

/// Post a draft
pub async fn post_refill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(refill_id): Path<Uuid>,
) -> AppResult<Json<RefillDetail>> {
    let service = RefillService::new(state.db);
    let refill = service.post(current_user.0.user_id, refill_id).await?;
    Ok(Json(refill))
}

/// Void a posted refill
pub async fn void_refill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(refill_id): Path<Uuid>,
) -> AppResult<Json<RefillDetail>> {
    let service = RefillService::new(state.db);
    let refill = service.void(current_user.0.user_id, refill_id).await?;
    Ok(Json(refill))
}

/// Delete a draft
pub async fn delete_refill(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(refill_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    let service = RefillService::new(state.db);
    service.delete(current_user.0.user_id, refill_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
