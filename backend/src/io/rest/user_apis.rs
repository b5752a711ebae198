//! # REST API for User Accounts
//!
//! Account administration is DOCTOR only. Accounts are deactivated, never
//! deleted, so historical records keep a valid author.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use shared::{ChangePasswordRequest, CreateUserRequest, Role, UpdateUserRequest};
use tracing::info;

use crate::io::rest::auth::{AuthUser, DOCTOR_ONLY, STAFF};
use crate::io::rest::error::ApiResult;
use crate::io::rest::extract::{ApiJson, ApiPath};
use crate::io::rest::mappers::UserMapper;
use crate::AppState;

/// Create a router for user account APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me/password", put(change_password))
        .route("/role/:role", get(list_by_role))
        .route("/:id", get(get_user).put(update_user))
        .route("/:id/deactivate", put(deactivate_user))
}

pub async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("POST /api/v1/users - user: {} ({})", request.username, request.role);
    user.require_any(DOCTOR_ONLY)?;

    let created = state.user_service.create_user(request).await?;
    Ok((StatusCode::CREATED, Json(UserMapper::to_dto(created))))
}

pub async fn list_users(State(state): State<AppState>, user: AuthUser) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/users");
    user.require_any(STAFF)?;

    let users = state.user_service.list_users().await?;
    Ok(Json(UserMapper::to_list_dto(users)))
}

pub async fn list_by_role(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(role): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/users/role/{}", role);
    user.require_any(STAFF)?;

    let role: Role = role.parse()?;
    let users = state.user_service.list_by_role(role).await?;
    Ok(Json(UserMapper::to_list_dto(users)))
}

pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(user_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/users/{}", user_id);
    user.require_any(STAFF)?;

    let account = state.user_service.get_user(user_id).await?;
    Ok(Json(UserMapper::to_dto(account)))
}

pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(user_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/users/{} - request: {:?}", user_id, request);
    user.require_any(DOCTOR_ONLY)?;

    let account = state.user_service.update_user(user_id, request).await?;
    Ok(Json(UserMapper::to_dto(account)))
}

pub async fn deactivate_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(user_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/users/{}/deactivate", user_id);
    user.require_any(DOCTOR_ONLY)?;

    let account = state.user_service.deactivate_user(user_id).await?;
    Ok(Json(UserMapper::to_dto(account)))
}

/// Any signed-in user may change their own password
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/users/me/password - user: {}", user.username);

    state.user_service.change_password(user.user_id, request).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::io::rest::test_support::{json_request, read_json, request, test_app, token_for, TestResult};
    use axum::http::{Method, StatusCode};
    use shared::{ChangePasswordRequest, CreateUserRequest, LoginRequest, Role, User, UserListResponse};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_only_doctor_creates_users() -> TestResult {
        let (state, app) = test_app().await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;
        let doctor = token_for(&state, "doctor1", Role::Doctor).await;
        let new_user = CreateUserRequest {
            username: "nurse2".to_string(),
            email: "nurse2@clinic.test".to_string(),
            password: "initial password".to_string(),
            full_name: "Paula Gomez".to_string(),
            role: Role::Nurse,
        };

        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/v1/users", Some(&nurse), &new_user))
            .await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/v1/users", Some(&doctor), &new_user))
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: User = read_json(response).await;

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/users/role/NURSE", Some(&nurse)))
            .await?;
        let nurses: UserListResponse = read_json(response).await;
        assert_eq!(nurses.users.len(), 2);

        let response = app
            .oneshot(request(
                Method::PUT,
                &format!("/api/v1/users/{}/deactivate", created.id),
                Some(&doctor),
            ))
            .await?;
        let deactivated: User = read_json(response).await;
        assert!(!deactivated.active);
        Ok(())
    }

    #[tokio::test]
    async fn test_parent_cannot_list_users() -> TestResult {
        let (state, app) = test_app().await;
        let parent = token_for(&state, "parent1", Role::Parent).await;

        let response = app.oneshot(request(Method::GET, "/api/v1/users", Some(&parent))).await?;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        Ok(())
    }

    #[tokio::test]
    async fn test_change_own_password() -> TestResult {
        let (state, app) = test_app().await;
        let parent = token_for(&state, "parent1", Role::Parent).await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::PUT,
                "/api/v1/users/me/password",
                Some(&parent),
                &ChangePasswordRequest {
                    current_password: "wrong password".to_string(),
                    new_password: "a fresh password".to_string(),
                },
            ))
            .await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(json_request(
                Method::PUT,
                "/api/v1/users/me/password",
                Some(&parent),
                &ChangePasswordRequest {
                    current_password: "test password".to_string(),
                    new_password: "a fresh password".to_string(),
                },
            ))
            .await?;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let (user, _) = state
            .auth_service
            .login(LoginRequest {
                username: "parent1".to_string(),
                password: "a fresh password".to_string(),
            })
            .await?;
        assert_eq!(user.username, "parent1");
        Ok(())
    }
}
