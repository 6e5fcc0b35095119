//! Hearing session endpoints.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use bailiff_common::AppResult;
use bailiff_core::{CreateHearingInput, QrContent};
use bailiff_db::entities::{
    attendance,
    hearing_session::{self, HearingStatus},
    user,
};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AdminUser, AuthUser, StaffUser},
    middleware::AppState,
    response::ApiResponse,
};

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: HearingStatus,
}

/// A hearing as seen by one user. The attendance codes are only included
/// for staff; anyone holding them could mark themselves present.
#[derive(Debug, Serialize)]
pub struct HearingView {
    #[serde(flatten)]
    pub hearing: hearing_session::Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manual_code: Option<String>,
}

impl HearingView {
    #[must_use]
    pub fn for_viewer(hearing: hearing_session::Model, viewer: &user::Model) -> Self {
        let (qr_code, manual_code) = if viewer.role.is_staff() {
            (Some(hearing.qr_code.clone()), Some(hearing.manual_code.clone()))
        } else {
            (None, None)
        };
        Self {
            hearing,
            qr_code,
            manual_code,
        }
    }

    #[must_use]
    pub fn list_for_viewer(
        hearings: Vec<hearing_session::Model>,
        viewer: &user::Model,
    ) -> Vec<Self> {
        hearings
            .into_iter()
            .map(|h| Self::for_viewer(h, viewer))
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    /// False when the notice had already gone out.
    pub sent: bool,
}

async fn create_hearing(
    StaffUser(user): StaffUser,
    State(state): State<AppState>,
    Json(req): Json<CreateHearingInput>,
) -> AppResult<ApiResponse<HearingView>> {
    let hearing = state.hearing_service.create(&user, req).await?;
    Ok(ApiResponse::created(HearingView::for_viewer(hearing, &user)))
}

/// Today's docket in the court timezone.
async fn list_today(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<HearingView>>> {
    let hearings = state.hearing_service.list_today().await?;
    Ok(ApiResponse::ok(HearingView::list_for_viewer(hearings, &user)))
}

async fn get_hearing(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<HearingView>> {
    let hearing = state.hearing_service.get(&id).await?;
    Ok(ApiResponse::ok(HearingView::for_viewer(hearing, &user)))
}

async fn update_status(
    StaffUser(user): StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateStatusRequest>,
) -> AppResult<ApiResponse<HearingView>> {
    let hearing = state.hearing_service.update_status(&id, req.status).await?;
    Ok(ApiResponse::ok(HearingView::for_viewer(hearing, &user)))
}

/// QR payload and manual code for display in the court room.
async fn qr_content(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<QrContent>> {
    Ok(ApiResponse::ok(state.hearing_service.qr_content(&id).await?))
}

/// Re-send the "hearing scheduled" notice if it has not gone out yet.
async fn notify(
    AdminUser(_): AdminUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<NotifyResponse>> {
    let sent = state
        .hearing_service
        .send_scheduled_notification(&id)
        .await?;
    let message = if sent {
        "Notifications sent"
    } else {
        "Notifications were already sent"
    };
    Ok(ApiResponse::ok(NotifyResponse { sent }).with_message(message))
}

async fn list_attendance(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<Vec<attendance::Model>>> {
    let records = state.attendance_service.list_for_hearing(&id).await?;
    Ok(ApiResponse::ok(records))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_hearing))
        .route("/today", get(list_today))
        .route("/{id}", get(get_hearing))
        .route("/{id}/status", post(update_status))
        .route("/{id}/qr", get(qr_content))
        .route("/{id}/notify", post(notify))
        .route("/{id}/attendance", get(list_attendance))
}
