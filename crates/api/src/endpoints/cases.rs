//! Case endpoints.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use bailiff_common::AppResult;
use bailiff_core::{AddWitnessInput, CreateCaseInput, UpdateCaseInput};
use bailiff_db::entities::{
    case::{self, CaseStatus},
    witness,
};
use serde::Deserialize;

use super::hearings::HearingView;
use crate::{
    extractors::{AdminUser, AuthUser, StaffUser},
    middleware::AppState,
    response::ApiResponse,
};

#[derive(Debug, Deserialize)]
pub struct ListCasesQuery {
    pub status: Option<CaseStatus>,
    #[serde(default = "super::default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: CaseStatus,
}

/// Cases visible to the caller.
async fn list_cases(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListCasesQuery>,
) -> AppResult<ApiResponse<Vec<case::Model>>> {
    let cases = state
        .case_service
        .list(&user, query.status, query.limit.min(super::MAX_LIMIT), query.offset)
        .await?;
    Ok(ApiResponse::ok(cases))
}

async fn create_case(
    StaffUser(user): StaffUser,
    State(state): State<AppState>,
    Json(req): Json<CreateCaseInput>,
) -> AppResult<ApiResponse<case::Model>> {
    let case = state.case_service.create(&user, req).await?;
    Ok(ApiResponse::created(case))
}

async fn get_case(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<case::Model>> {
    Ok(ApiResponse::ok(state.case_service.get(&user, &id).await?))
}

async fn update_case(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateCaseInput>,
) -> AppResult<ApiResponse<case::Model>> {
    Ok(ApiResponse::ok(state.case_service.update(&id, req).await?))
}

async fn change_status(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<ChangeStatusRequest>,
) -> AppResult<ApiResponse<case::Model>> {
    let case = state.case_service.change_status(&id, req.status).await?;
    Ok(ApiResponse::ok(case))
}

async fn delete_case(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.case_service.delete(&id).await?;
    Ok(ApiResponse::message("Case deleted"))
}

async fn list_witnesses(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<witness::Model>>> {
    let witnesses = state.case_service.list_witnesses(&user, &id).await?;
    Ok(ApiResponse::ok(witnesses))
}

async fn add_witness(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AddWitnessInput>,
) -> AppResult<ApiResponse<witness::Model>> {
    let witness = state.case_service.add_witness(&id, req).await?;
    Ok(ApiResponse::created(witness))
}

async fn list_hearings(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<HearingView>>> {
    // Visibility check
    state.case_service.get(&user, &id).await?;
    let hearings = state.hearing_service.list_for_case(&id).await?;
    Ok(ApiResponse::ok(HearingView::list_for_viewer(hearings, &user)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cases).post(create_case))
        .route(
            "/{id}",
            get(get_case).patch(update_case).delete(delete_case),
        )
        .route("/{id}/status", post(change_status))
        .route("/{id}/witnesses", get(list_witnesses).post(add_witness))
        .route("/{id}/hearings", get(list_hearings))
}
