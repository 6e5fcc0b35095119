//! System settings endpoints.

use axum::{Json, Router, extract::State, routing::get};
use bailiff_common::AppResult;
use bailiff_core::UpdateSettingsInput;
use bailiff_db::entities::settings;

use crate::{
    extractors::{AdminUser, StaffUser},
    middleware::AppState,
    response::ApiResponse,
};

async fn get_settings(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<settings::Model>> {
    Ok(ApiResponse::ok(state.settings_service.get().await?))
}

async fn update_settings(
    AdminUser(user): AdminUser,
    State(state): State<AppState>,
    Json(req): Json<UpdateSettingsInput>,
) -> AppResult<ApiResponse<settings::Model>> {
    let settings = state.settings_service.update(&user.id, req).await?;
    Ok(ApiResponse::ok(settings).with_message("Settings updated"))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(get_settings).patch(update_settings))
}
