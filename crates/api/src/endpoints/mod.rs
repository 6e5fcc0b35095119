//! API endpoints.

#![allow(missing_docs)]

mod absence_reasons;
mod attendance;
mod auth;
mod cases;
mod hearings;
mod notifications;
mod settings;
mod users;

use axum::{Router, routing::get};
use serde::Serialize;

use crate::{middleware::AppState, response::ApiResponse};

/// Upper bound for any `limit` query parameter.
pub(crate) const MAX_LIMIT: u64 = 100;

pub(crate) const fn default_limit() -> u64 {
    20
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> ApiResponse<HealthResponse> {
    ApiResponse::ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router())
        .nest("/users", users::router())
        .nest("/cases", cases::router())
        .nest("/hearings", hearings::router())
        .nest("/attendance", attendance::router())
        .nest("/absence-reasons", absence_reasons::router())
        .nest("/notifications", notifications::router())
        .nest("/settings", settings::router())
}
