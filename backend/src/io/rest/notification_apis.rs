//! # REST API for Notifications
//!
//! `/me` endpoints act on the caller's own inbox. Staff can read any
//! notification; other users only their own.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use shared::{CountResponse, CreateNotificationRequest};
use tracing::info;

use crate::domain::models::Notification;
use crate::io::rest::auth::{AuthUser, DOCTOR_ONLY, STAFF};
use crate::io::rest::error::{ApiError, ApiResult};
use crate::io::rest::extract::{ApiJson, ApiPath};
use crate::io::rest::mappers::NotificationMapper;
use crate::AppState;

/// Create a router for notification APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_notification))
        .route("/me", get(list_mine))
        .route("/me/unread", get(list_my_unread))
        .route("/me/unread/count", get(count_my_unread))
        .route("/me/read-all", put(mark_all_read))
        .route("/guardian/:guardian_id", get(list_for_guardian))
        .route("/:id", get(get_notification).delete(delete_notification))
        .route("/:id/read", put(mark_read))
}

fn ensure_can_access(user: &AuthUser, notification: &Notification) -> Result<(), ApiError> {
    if user.is_staff() || notification.user_id == Some(user.user_id) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(format!(
            "Notification {} belongs to another user",
            notification.id
        )))
    }
}

pub async fn create_notification(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<CreateNotificationRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("POST /api/v1/notifications - request: {:?}", request);
    user.require_any(STAFF)?;

    let notification = state.notification_service.create_notification(request).await?;
    Ok((StatusCode::CREATED, Json(NotificationMapper::to_dto(notification))))
}

pub async fn list_mine(State(state): State<AppState>, user: AuthUser) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/notifications/me - user: {}", user.username);

    let notifications = state.notification_service.list_for_user(user.user_id, false).await?;
    Ok(Json(NotificationMapper::to_list_dto(notifications)))
}

pub async fn list_my_unread(State(state): State<AppState>, user: AuthUser) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/notifications/me/unread - user: {}", user.username);

    let notifications = state.notification_service.list_for_user(user.user_id, true).await?;
    Ok(Json(NotificationMapper::to_list_dto(notifications)))
}

pub async fn count_my_unread(State(state): State<AppState>, user: AuthUser) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/notifications/me/unread/count - user: {}", user.username);

    let count = state.notification_service.unread_count(user.user_id).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn mark_all_read(State(state): State<AppState>, user: AuthUser) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/notifications/me/read-all - user: {}", user.username);

    let updated = state.notification_service.mark_all_read(user.user_id).await?;
    Ok(Json(CountResponse {
        count: i64::try_from(updated).unwrap_or(i64::MAX),
    }))
}

pub async fn list_for_guardian(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(guardian_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/notifications/guardian/{}", guardian_id);
    user.require_any(STAFF)?;

    let notifications = state.notification_service.list_for_guardian(guardian_id).await?;
    Ok(Json(NotificationMapper::to_list_dto(notifications)))
}

pub async fn get_notification(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(notification_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/notifications/{}", notification_id);

    let notification = state.notification_service.get_notification(notification_id).await?;
    ensure_can_access(&user, &notification)?;
    Ok(Json(NotificationMapper::to_dto(notification)))
}

pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(notification_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/notifications/{}/read", notification_id);

    let notification = state.notification_service.get_notification(notification_id).await?;
    ensure_can_access(&user, &notification)?;

    let notification = state.notification_service.mark_read(notification_id).await?;
    Ok(Json(NotificationMapper::to_dto(notification)))
}

pub async fn delete_notification(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(notification_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("DELETE /api/v1/notifications/{}", notification_id);
    user.require_any(DOCTOR_ONLY)?;

    state.notification_service.delete_notification(notification_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::io::rest::test_support::{json_request, read_json, request, test_app, token_for, TestResult};
    use axum::http::{Method, StatusCode};
    use shared::{CountResponse, CreateNotificationRequest, Notification, NotificationListResponse, Role};
    use tower::ServiceExt;

    fn notify(user_id: i64, title: &str) -> CreateNotificationRequest {
        CreateNotificationRequest {
            user_id: Some(user_id),
            guardian_id: None,
            title: title.to_string(),
            message: "The second dose of DTaP is due on Monday".to_string(),
        }
    }

    #[tokio::test]
    async fn test_inbox_and_read_tracking() -> TestResult {
        let (state, app) = test_app().await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;
        let parent = token_for(&state, "parent1", Role::Parent).await;
        let parent_id = state.user_service.list_by_role(Role::Parent).await?[0].id;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/notifications",
                Some(&nurse),
                &notify(parent_id, "Dose reminder"),
            ))
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: Notification = read_json(response).await;
        state
            .notification_service
            .create_notification(notify(parent_id, "Second reminder"))
            .await?;

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/notifications/me/unread/count", Some(&parent)))
            .await?;
        let count: CountResponse = read_json(response).await;
        assert_eq!(count.count, 2);

        let response = app
            .clone()
            .oneshot(request(
                Method::PUT,
                &format!("/api/v1/notifications/{}/read", created.id),
                Some(&parent),
            ))
            .await?;
        let read: Notification = read_json(response).await;
        assert!(read.read);

        let response = app
            .clone()
            .oneshot(request(Method::PUT, "/api/v1/notifications/me/read-all", Some(&parent)))
            .await?;
        let updated: CountResponse = read_json(response).await;
        assert_eq!(updated.count, 1);

        let response = app
            .oneshot(request(Method::GET, "/api/v1/notifications/me/unread", Some(&parent)))
            .await?;
        let unread: NotificationListResponse = read_json(response).await;
        assert!(unread.notifications.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_parent_cannot_read_someone_elses_notification() -> TestResult {
        let (state, app) = test_app().await;
        token_for(&state, "parent1", Role::Parent).await;
        let other_parent = token_for(&state, "parent2", Role::Parent).await;
        let parents = state.user_service.list_by_role(Role::Parent).await?;
        let first = parents
            .iter()
            .find(|u| u.username == "parent1")
            .map(|u| u.id)
            .ok_or("parent1 missing")?;

        let notification = state
            .notification_service
            .create_notification(notify(first, "Private"))
            .await?;

        let response = app
            .clone()
            .oneshot(request(
                Method::GET,
                &format!("/api/v1/notifications/{}", notification.id),
                Some(&other_parent),
            ))
            .await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/notifications",
                Some(&other_parent),
                &notify(first, "Spoofed"),
            ))
            .await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        Ok(())
    }
}
