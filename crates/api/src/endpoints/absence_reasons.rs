//! Absence reason endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use bailiff_common::AppResult;
use bailiff_core::{ReviewReasonInput, SubmitReasonInput};
use bailiff_db::entities::absence_reason::{self, ReasonStatus};
use serde::Deserialize;

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

#[derive(Debug, Deserialize)]
pub struct ListReasonsQuery {
    pub status: Option<ReasonStatus>,
    #[serde(default = "super::default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

async fn submit(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(req): Json<SubmitReasonInput>,
) -> AppResult<ApiResponse<absence_reason::Model>> {
    let reason = state.absence_reason_service.submit(&user, req).await?;
    Ok(ApiResponse::created(reason))
}

/// Staff see every reason; everyone else sees their own.
async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListReasonsQuery>,
) -> AppResult<ApiResponse<Vec<absence_reason::Model>>> {
    let reasons = state
        .absence_reason_service
        .list(
            &user,
            query.status,
            query.limit.min(super::MAX_LIMIT),
            query.offset,
        )
        .await?;
    Ok(ApiResponse::ok(reasons))
}

async fn review(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ReviewReasonInput>,
) -> AppResult<ApiResponse<absence_reason::Model>> {
    let reason = state
        .absence_reason_service
        .review(&user, &id, req)
        .await?;
    Ok(ApiResponse::ok(reason))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(submit))
        .route("/{id}/review", post(review))
}
