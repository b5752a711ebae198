//! # REST API for Children
//!
//! Registration, lookup, soft deletion and guardian links for children.
//! Every response carries the child's age in whole months as of today.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use shared::{CountResponse, CreateChildRequest, LinkGuardianRequest, UpdateChildRequest};
use tracing::info;

use crate::io::rest::auth::{AuthUser, DOCTOR_ONLY, STAFF};
use crate::io::rest::error::ApiResult;
use crate::io::rest::extract::{ApiJson, ApiPath, ApiQuery};
use crate::io::rest::mappers::{ChildMapper, GuardianMapper};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NameQuery {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct BirthRangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Create a router for child related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_children).post(create_child))
        .route("/search", get(search_children))
        .route("/document/:document_number", get(get_child_by_document))
        .route("/born-between", get(list_born_between))
        .route("/without-guardians", get(list_without_guardians))
        .route("/:id", get(get_child).put(update_child).delete(delete_child))
        .route("/:id/restore", put(restore_child))
        .route("/:id/age", get(get_child_age))
        .route("/:id/guardians", get(list_guardians).post(link_guardian))
        .route("/:id/guardians/count", get(count_guardians))
        .route("/:id/guardians/:guardian_id", delete(unlink_guardian))
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Register a new child, optionally linking guardians in the same step
pub async fn create_child(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<CreateChildRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("POST /api/v1/children - request: {:?}", request);
    user.require_any(STAFF)?;

    let child = state.child_service.create_child(request).await?;
    Ok((StatusCode::CREATED, Json(ChildMapper::to_dto(child, today()))))
}

/// List children that have not been deleted
pub async fn list_children(State(state): State<AppState>, _user: AuthUser) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/children");

    let children = state.child_service.list_children().await?;
    Ok(Json(ChildMapper::to_list_dto(children, today())))
}

pub async fn search_children(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<NameQuery>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/children/search - query: {:?}", query);

    let children = state.child_service.search_children(&query.name).await?;
    Ok(Json(ChildMapper::to_list_dto(children, today())))
}

pub async fn get_child_by_document(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(document_number): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/children/document/{}", document_number);

    let child = state.child_service.find_by_document(&document_number).await?;
    Ok(Json(ChildMapper::to_dto(child, today())))
}

pub async fn list_born_between(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<BirthRangeQuery>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/children/born-between - query: {:?}", query);

    let children = state.child_service.list_born_between(query.from, query.to).await?;
    Ok(Json(ChildMapper::to_list_dto(children, today())))
}

pub async fn list_without_guardians(State(state): State<AppState>, user: AuthUser) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/children/without-guardians");
    user.require_any(STAFF)?;

    let children = state.child_service.list_without_guardians().await?;
    Ok(Json(ChildMapper::to_list_dto(children, today())))
}

/// Fetch one child by id. Soft-deleted children are still returned.
pub async fn get_child(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(child_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/children/{}", child_id);

    let child = state.child_service.get_child(child_id).await?;
    Ok(Json(ChildMapper::to_dto(child, today())))
}

pub async fn update_child(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(child_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateChildRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/children/{} - request: {:?}", child_id, request);
    user.require_any(STAFF)?;

    let child = state.child_service.update_child(child_id, request).await?;
    Ok(Json(ChildMapper::to_dto(child, today())))
}

/// Soft delete
pub async fn delete_child(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(child_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("DELETE /api/v1/children/{}", child_id);
    user.require_any(DOCTOR_ONLY)?;

    state.child_service.delete_child(child_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_child(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(child_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/children/{}/restore", child_id);
    user.require_any(DOCTOR_ONLY)?;

    let child = state.child_service.restore_child(child_id).await?;
    Ok(Json(ChildMapper::to_dto(child, today())))
}

pub async fn get_child_age(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(child_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/children/{}/age", child_id);

    let (child, age_in_months) = state.child_service.age_in_months(child_id, today()).await?;
    Ok(Json(ChildMapper::to_age_dto(&child, age_in_months)))
}

pub async fn list_guardians(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(child_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/children/{}/guardians", child_id);

    let guardians = state.child_service.list_guardians(child_id).await?;
    Ok(Json(GuardianMapper::to_list_dto(guardians)))
}

pub async fn count_guardians(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(child_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/children/{}/guardians/count", child_id);

    let count = state.child_service.count_guardians(child_id).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn link_guardian(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(child_id): ApiPath<i64>,
    ApiJson(request): ApiJson<LinkGuardianRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("POST /api/v1/children/{}/guardians - request: {:?}", child_id, request);
    user.require_any(STAFF)?;

    state.child_service.link_guardian(child_id, request.guardian_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unlink_guardian(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath((child_id, guardian_id)): ApiPath<(i64, i64)>,
) -> ApiResult<impl IntoResponse> {
    info!("DELETE /api/v1/children/{}/guardians/{}", child_id, guardian_id);
    user.require_any(DOCTOR_ONLY)?;

    state.child_service.unlink_guardian(child_id, guardian_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::io::rest::test_support::{json_request, read_json, request, test_app, token_for, user_id, TestResult};
    use axum::http::{Method, StatusCode};
    use chrono::NaiveDate;
    use shared::{
        Child, ChildListResponse, CountResponse, CreateChildRequest, CreateGuardianRequest, ErrorResponse, Gender,
        Guardian, LinkGuardianRequest, Role, UpdateUserRequest,
    };
    use tower::ServiceExt;

    fn create_request(document_number: &str) -> CreateChildRequest {
        CreateChildRequest {
            first_name: "Valentina".to_string(),
            last_name: "Rojas".to_string(),
            document_number: document_number.to_string(),
            birth_date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            gender: Gender::Female,
            blood_type: Some("O+".to_string()),
            birth_weight_kg: Some(3.2),
            birth_height_cm: Some(49.0),
            guardian_ids: vec![],
        }
    }

    #[tokio::test]
    async fn test_request_without_token_is_unauthorized() -> TestResult {
        let (_, app) = test_app().await;

        let response = app.oneshot(request(Method::GET, "/api/v1/children", None)).await?;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: ErrorResponse = read_json(response).await;
        assert_eq!(body.error, "UNAUTHORIZED");
        Ok(())
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() -> TestResult {
        let (_, app) = test_app().await;

        let response = app
            .oneshot(request(Method::GET, "/api/v1/children", Some("not-a-jwt")))
            .await?;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn test_create_child_requires_staff() -> TestResult {
        let (state, app) = test_app().await;
        let parent = token_for(&state, "parent1", Role::Parent).await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;

        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/v1/children", Some(&parent), &create_request("RC-1")))
            .await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/v1/children", Some(&nurse), &create_request("RC-1")))
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        let child: Child = read_json(response).await;
        assert_eq!(child.document_number, "RC-1");
        assert!(child.deleted_at.is_none());

        let response = app
            .oneshot(json_request(Method::POST, "/api/v1/children", Some(&nurse), &create_request("RC-1")))
            .await?;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body: ErrorResponse = read_json(response).await;
        assert_eq!(body.error, "DUPLICATE_RESOURCE");
        Ok(())
    }

    #[tokio::test]
    async fn test_invalid_child_returns_field_errors() -> TestResult {
        let (state, app) = test_app().await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;

        let mut invalid = create_request("RC-2");
        invalid.first_name = "  ".to_string();
        invalid.blood_type = Some("Z+".to_string());

        let response = app
            .oneshot(json_request(Method::POST, "/api/v1/children", Some(&nurse), &invalid))
            .await?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = read_json(response).await;
        assert_eq!(body.error, "VALIDATION_FAILED");
        let fields = body.validation_errors.unwrap_or_default();
        assert!(fields.contains_key("first_name"));
        assert!(fields.contains_key("blood_type"));
        Ok(())
    }

    #[tokio::test]
    async fn test_soft_delete_is_doctor_only() -> TestResult {
        let (state, app) = test_app().await;
        let parent = token_for(&state, "parent1", Role::Parent).await;
        let doctor = token_for(&state, "doctor1", Role::Doctor).await;
        let child = state.child_service.create_child(create_request("RC-3")).await?;
        let uri = format!("/api/v1/children/{}", child.id);

        let response = app.clone().oneshot(request(Method::DELETE, &uri, Some(&parent))).await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body: ErrorResponse = read_json(response).await;
        assert_eq!(body.error, "FORBIDDEN");

        let response = app.clone().oneshot(request(Method::DELETE, &uri, Some(&doctor))).await?;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/children", Some(&parent)))
            .await?;
        let list: ChildListResponse = read_json(response).await;
        assert!(list.children.is_empty());

        // Still reachable by id, flagged as deleted
        let response = app.oneshot(request(Method::GET, &uri, Some(&parent))).await?;
        assert_eq!(response.status(), StatusCode::OK);
        let fetched: Child = read_json(response).await;
        assert!(fetched.deleted_at.is_some());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_child_is_not_found() -> TestResult {
        let (state, app) = test_app().await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;

        let response = app
            .oneshot(request(Method::GET, "/api/v1/children/4040", Some(&nurse)))
            .await?;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body: ErrorResponse = read_json(response).await;
        assert_eq!(body.status, 404);
        assert_eq!(body.error, "NOT_FOUND");
        Ok(())
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_bad_request() -> TestResult {
        let (state, app) = test_app().await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;

        let response = app
            .oneshot(request(Method::GET, "/api/v1/children/abc/age", Some(&nurse)))
            .await?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_link_and_count_guardians() -> TestResult {
        let (state, app) = test_app().await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;
        let child = state.child_service.create_child(create_request("RC-4")).await?;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/guardians",
                Some(&nurse),
                &CreateGuardianRequest {
                    first_name: "Marta".to_string(),
                    last_name: "Rojas".to_string(),
                    document_number: "CC-77".to_string(),
                    phone: "+57 300 000 0000".to_string(),
                    email: None,
                    address: None,
                    relationship: "Mother".to_string(),
                },
            ))
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        let guardian: Guardian = read_json(response).await;

        let uri = format!("/api/v1/children/{}/guardians", child.id);
        let link = LinkGuardianRequest {
            guardian_id: guardian.id,
        };
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, &uri, Some(&nurse), &link))
            .await?;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        // Linking twice breaks a business rule
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, &uri, Some(&nurse), &link))
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(request(Method::GET, &format!("{}/count", uri), Some(&nurse)))
            .await?;
        let count: CountResponse = read_json(response).await;
        assert_eq!(count.count, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_search_requires_name_parameter() -> TestResult {
        let (state, app) = test_app().await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;
        state.child_service.create_child(create_request("RC-5")).await?;

        let response = app
            .clone()
            .oneshot(request(Method::GET, "/api/v1/children/search", Some(&nurse)))
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(request(Method::GET, "/api/v1/children/search?name=valen", Some(&nurse)))
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let list: ChildListResponse = read_json(response).await;
        assert_eq!(list.children.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_deactivated_account_token_is_unauthorized() -> TestResult {
        let (state, app) = test_app().await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;
        state.user_service.deactivate_user(user_id(&state, "nurse1").await).await?;

        let response = app
            .oneshot(json_request(Method::POST, "/api/v1/children", Some(&nurse), &create_request("RC-6")))
            .await?;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(state.child_service.list_children().await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_role_change_applies_to_existing_token() -> TestResult {
        let (state, app) = test_app().await;
        let doctor = token_for(&state, "doctor1", Role::Doctor).await;
        let child = state.child_service.create_child(create_request("RC-7")).await?;
        state
            .user_service
            .update_user(
                user_id(&state, "doctor1").await,
                UpdateUserRequest {
                    role: Some(Role::Parent),
                    ..Default::default()
                },
            )
            .await?;

        let response = app
            .oneshot(request(
                Method::DELETE,
                &format!("/api/v1/children/{}", child.id),
                Some(&doctor),
            ))
            .await?;

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(state.child_service.get_child(child.id).await?.deleted_at.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_search_treats_wildcards_literally() -> TestResult {
        let (state, app) = test_app().await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;
        state.child_service.create_child(create_request("RC-8")).await?;

        for wildcard in ["%25", "_", "%5C"] {
            let response = app
                .clone()
                .oneshot(request(
                    Method::GET,
                    &format!("/api/v1/children/search?name={}", wildcard),
                    Some(&nurse),
                ))
                .await?;
            assert_eq!(response.status(), StatusCode::OK);
            let list: ChildListResponse = read_json(response).await;
            assert!(list.children.is_empty(), "{} matched a child", wildcard);
        }
        Ok(())
    }
}
