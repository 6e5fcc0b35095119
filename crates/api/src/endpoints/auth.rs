//! Authentication endpoints.

use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use bailiff_common::AppResult;
use bailiff_core::{LoginInput, RegisterInput, Session};
use bailiff_db::entities::user;
use tracing::info;

use crate::{
    extractors::{AuthUser, MaybeAuthUser},
    middleware::{AppState, SESSION_COOKIE},
    response::ApiResponse,
};

/// Create an account. Anonymous callers may only bootstrap the first admin.
async fn register(
    MaybeAuthUser(actor): MaybeAuthUser,
    State(state): State<AppState>,
    Json(req): Json<RegisterInput>,
) -> AppResult<ApiResponse<user::Model>> {
    let user = state.auth_service.register(actor.as_ref(), req).await?;
    Ok(ApiResponse::created(user))
}

/// Sign in. The token is returned in the body and as an HTTP-only cookie.
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginInput>,
) -> AppResult<(CookieJar, ApiResponse<Session>)> {
    let session = state.auth_service.login(req).await?;
    info!(user_id = %session.user.id, "User signed in");

    let cookie = Cookie::build((SESSION_COOKIE, session.token.clone()))
        .path("/")
        .http_only(true)
        .secure(state.cookie_secure)
        .same_site(SameSite::Lax);

    Ok((jar.add(cookie), ApiResponse::ok(session)))
}

/// Clear the session cookie.
async fn logout(jar: CookieJar) -> (CookieJar, ApiResponse<()>) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, ApiResponse::message("Logged out"))
}

/// The signed-in user.
async fn me(AuthUser(user): AuthUser) -> ApiResponse<user::Model> {
    ApiResponse::ok(user)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
}
