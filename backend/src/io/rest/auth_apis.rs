//! # REST API for Authentication
//!
//! Login and self-registration are the only endpoints reachable without a
//! bearer token.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use shared::{LoginRequest, RegisterRequest};
use tracing::info;

use crate::io::rest::auth::AuthUser;
use crate::io::rest::error::ApiResult;
use crate::io::rest::extract::ApiJson;
use crate::io::rest::mappers::UserMapper;
use crate::AppState;

/// Create a router for authentication APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/me", get(me))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    // Never log the request body here, it carries the password
    info!("POST /api/v1/auth/login - user: {}", request.username);

    let (user, token) = state.auth_service.login(request).await?;
    Ok(Json(UserMapper::to_auth_dto(user, token)))
}

/// Public sign-up for parents
pub async fn register(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("POST /api/v1/auth/register - user: {}", request.username);

    let (user, token) = state.auth_service.register(request).await?;
    Ok((StatusCode::CREATED, Json(UserMapper::to_auth_dto(user, token))))
}

pub async fn me(State(state): State<AppState>, user: AuthUser) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/auth/me - user: {}", user.username);

    let account = state.auth_service.current_user(user.user_id).await?;
    Ok(Json(UserMapper::to_dto(account)))
}
