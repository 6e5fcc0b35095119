//! User directory endpoints.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use bailiff_common::AppResult;
use bailiff_db::entities::user::{self, UserRole};
use serde::Deserialize;

use crate::{extractors::StaffUser, middleware::AppState, response::ApiResponse};

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub role: Option<UserRole>,
    #[serde(default = "super::default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

/// List users, optionally by role. Used when assigning officers and witnesses.
async fn list_users(
    StaffUser(_): StaffUser,
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
) -> AppResult<ApiResponse<Vec<user::Model>>> {
    let users = state
        .auth_service
        .list_users(query.role, query.limit.min(super::MAX_LIMIT), query.offset)
        .await?;
    Ok(ApiResponse::ok(users))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_users))
}
