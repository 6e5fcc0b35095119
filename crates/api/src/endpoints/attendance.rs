//! Attendance endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use bailiff_common::AppResult;
use bailiff_core::{MarkAttendanceInput, MarkStatusInput};
use bailiff_db::entities::attendance;
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, StaffUser},
    middleware::AppState,
    response::ApiResponse,
};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "super::default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

/// Mark your own attendance with a scanned QR payload or a typed code.
/// A repeat mark answers 200 with the existing record.
async fn mark(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<MarkAttendanceInput>,
) -> AppResult<ApiResponse<attendance::Model>> {
    let outcome = state.attendance_service.mark(&user.id, req).await?;
    let message = outcome.message();
    Ok(ApiResponse::ok(outcome.attendance).with_message(message))
}

async fn my_attendance(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> AppResult<ApiResponse<Vec<attendance::Model>>> {
    let records = state
        .attendance_service
        .list_for_user(&user.id, query.limit.min(super::MAX_LIMIT), query.offset)
        .await?;
    Ok(ApiResponse::ok(records))
}

/// Staff override for someone else's record.
async fn mark_status(
    StaffUser(user): StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MarkStatusInput>,
) -> AppResult<ApiResponse<attendance::Model>> {
    let outcome = state
        .attendance_service
        .mark_status(&id, &user.id, req)
        .await?;
    let message = outcome.message();
    Ok(ApiResponse::ok(outcome.attendance).with_message(message))
}

async fn verify(
    StaffUser(user): StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<attendance::Model>> {
    let record = state.attendance_service.verify(&id, &user.id).await?;
    Ok(ApiResponse::ok(record))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/mark", post(mark))
        .route("/me", get(my_attendance))
        .route("/{id}/status", post(mark_status))
        .route("/{id}/verify", post(verify))
}
