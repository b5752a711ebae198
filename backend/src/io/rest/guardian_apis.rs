//! # REST API for Guardians

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::Utc;
use shared::{CountResponse, CreateGuardianRequest, UpdateGuardianRequest};
use tracing::info;

use crate::io::rest::auth::{AuthUser, DOCTOR_ONLY, STAFF};
use crate::io::rest::child_apis::NameQuery;
use crate::io::rest::error::ApiResult;
use crate::io::rest::extract::{ApiJson, ApiPath, ApiQuery};
use crate::io::rest::mappers::{ChildMapper, GuardianMapper};
use crate::AppState;

/// Create a router for guardian related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_guardians).post(create_guardian))
        .route("/search", get(search_guardians))
        .route("/document/:document_number", get(get_guardian_by_document))
        .route("/without-children", get(list_without_children))
        .route(
            "/:id",
            get(get_guardian).put(update_guardian).delete(delete_guardian),
        )
        .route("/:id/children", get(list_children))
        .route("/:id/children/count", get(count_children))
}

pub async fn create_guardian(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<CreateGuardianRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("POST /api/v1/guardians - request: {:?}", request);
    user.require_any(STAFF)?;

    let guardian = state.guardian_service.create_guardian(request).await?;
    Ok((StatusCode::CREATED, Json(GuardianMapper::to_dto(guardian))))
}

pub async fn list_guardians(State(state): State<AppState>, _user: AuthUser) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/guardians");

    let guardians = state.guardian_service.list_guardians().await?;
    Ok(Json(GuardianMapper::to_list_dto(guardians)))
}

pub async fn search_guardians(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<NameQuery>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/guardians/search - query: {:?}", query);

    let guardians = state.guardian_service.search_guardians(&query.name).await?;
    Ok(Json(GuardianMapper::to_list_dto(guardians)))
}

pub async fn get_guardian_by_document(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(document_number): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/guardians/document/{}", document_number);

    let guardian = state.guardian_service.find_by_document(&document_number).await?;
    Ok(Json(GuardianMapper::to_dto(guardian)))
}

pub async fn list_without_children(State(state): State<AppState>, user: AuthUser) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/guardians/without-children");
    user.require_any(STAFF)?;

    let guardians = state.guardian_service.list_without_children().await?;
    Ok(Json(GuardianMapper::to_list_dto(guardians)))
}

pub async fn get_guardian(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(guardian_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/guardians/{}", guardian_id);

    let guardian = state.guardian_service.get_guardian(guardian_id).await?;
    Ok(Json(GuardianMapper::to_dto(guardian)))
}

pub async fn update_guardian(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(guardian_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateGuardianRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/guardians/{} - request: {:?}", guardian_id, request);
    user.require_any(STAFF)?;

    let guardian = state.guardian_service.update_guardian(guardian_id, request).await?;
    Ok(Json(GuardianMapper::to_dto(guardian)))
}

/// Hard delete; links to children go with it
pub async fn delete_guardian(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(guardian_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("DELETE /api/v1/guardians/{}", guardian_id);
    user.require_any(DOCTOR_ONLY)?;

    state.guardian_service.delete_guardian(guardian_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_children(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(guardian_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/guardians/{}/children", guardian_id);

    let children = state.guardian_service.list_children(guardian_id).await?;
    Ok(Json(ChildMapper::to_list_dto(children, Utc::now().date_naive())))
}

pub async fn count_children(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(guardian_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/guardians/{}/children/count", guardian_id);

    let count = state.guardian_service.count_children(guardian_id).await?;
    Ok(Json(CountResponse { count }))
}

#[cfg(test)]
mod tests {
    use crate::io::rest::test_support::{json_request, read_json, request, test_app, token_for, TestResult};
    use axum::http::{Method, StatusCode};
    use shared::{CreateGuardianRequest, ErrorResponse, Guardian, GuardianListResponse, Role, UpdateGuardianRequest};
    use tower::ServiceExt;

    fn create_request(document_number: &str) -> CreateGuardianRequest {
        CreateGuardianRequest {
            first_name: "Jorge".to_string(),
            last_name: "Perez".to_string(),
            document_number: document_number.to_string(),
            phone: "555-0101".to_string(),
            email: Some("jorge@family.test".to_string()),
            address: None,
            relationship: "Father".to_string(),
        }
    }

    #[tokio::test]
    async fn test_guardian_crud_flow() -> TestResult {
        let (state, app) = test_app().await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;
        let doctor = token_for(&state, "doctor1", Role::Doctor).await;

        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/v1/guardians", Some(&nurse), &create_request("CC-1")))
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        let guardian: Guardian = read_json(response).await;
        let uri = format!("/api/v1/guardians/{}", guardian.id);

        let update = UpdateGuardianRequest {
            phone: Some("555-0199".to_string()),
            ..Default::default()
        };
        let response = app.clone().oneshot(json_request(Method::PUT, &uri, Some(&nurse), &update)).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let updated: Guardian = read_json(response).await;
        assert_eq!(updated.phone, "555-0199");

        // Nurses may not delete
        let response = app.clone().oneshot(request(Method::DELETE, &uri, Some(&nurse))).await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app.clone().oneshot(request(Method::DELETE, &uri, Some(&doctor))).await?;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app.oneshot(request(Method::GET, &uri, Some(&doctor))).await?;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        Ok(())
    }

    #[tokio::test]
    async fn test_without_children_is_staff_only() -> TestResult {
        let (state, app) = test_app().await;
        let parent = token_for(&state, "parent1", Role::Parent).await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;
        state.guardian_service.create_guardian(create_request("CC-2")).await?;

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/guardians/without-children", Some(&parent)))
            .await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .oneshot(request(Method::GET, "/api/v1/guardians/without-children", Some(&nurse)))
            .await?;
        let list: GuardianListResponse = read_json(response).await;
        assert_eq!(list.guardians.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() -> TestResult {
        let (state, app) = test_app().await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/v1/guardians",
                Some(&nurse),
                &serde_json::json!({ "first_name": "Only a name" }),
            ))
            .await?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = read_json(response).await;
        assert_eq!(body.error, "BAD_REQUEST");
        Ok(())
    }
}
