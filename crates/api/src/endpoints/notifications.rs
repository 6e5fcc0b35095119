//! In-app notification endpoints.

use axum::{
    Router,
    extract::{Path, Query, State},
    routing::{delete, get, post},
};
use bailiff_common::AppResult;
use bailiff_core::ListNotificationsInput;
use bailiff_db::entities::notification;
use serde::{Deserialize, Serialize};

use crate::{extractors::AuthUser, middleware::AppState, response::ApiResponse};

/// List notifications request.
#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    /// Maximum results (default: 20, max: 100)
    pub limit: Option<u64>,
    /// Cursor for pagination (before this ID)
    pub until_id: Option<String>,
    #[serde(default)]
    pub unread_only: bool,
    #[serde(default)]
    pub include_archived: bool,
}

#[derive(Serialize)]
pub struct UnreadCountResponse {
    pub count: u64,
}

#[derive(Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

async fn list(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListNotificationsQuery>,
) -> AppResult<ApiResponse<Vec<notification::Model>>> {
    let input = ListNotificationsInput {
        limit: query.limit,
        until_id: query.until_id,
        unread_only: query.unread_only,
        include_archived: query.include_archived,
    };
    let notifications = state.notification_service.list(&user.id, &input).await?;
    Ok(ApiResponse::ok(notifications))
}

async fn unread_count(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<UnreadCountResponse>> {
    let count = state.notification_service.unread_count(&user.id).await?;
    Ok(ApiResponse::ok(UnreadCountResponse { count }))
}

async fn mark_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.notification_service.mark_read(&user.id, &id).await?;
    Ok(ApiResponse::message("Notification marked as read"))
}

async fn mark_all_read(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<MarkAllReadResponse>> {
    let updated = state.notification_service.mark_all_read(&user.id).await?;
    Ok(ApiResponse::ok(MarkAllReadResponse { updated }))
}

async fn archive(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.notification_service.archive(&user.id, &id).await?;
    Ok(ApiResponse::message("Notification archived"))
}

async fn remove(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.notification_service.delete(&user.id, &id).await?;
    Ok(ApiResponse::message("Notification deleted"))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/{id}/read", post(mark_read))
        .route("/{id}/archive", post(archive))
        .route("/{id}", delete(remove))
}
