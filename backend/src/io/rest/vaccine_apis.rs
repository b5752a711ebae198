//! # REST API for the Vaccine Catalog

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;
use shared::{CreateVaccineRequest, UpdateVaccineRequest};
use tracing::info;

use crate::io::rest::auth::{AuthUser, DOCTOR_ONLY, STAFF};
use crate::io::rest::error::ApiResult;
use crate::io::rest::extract::{ApiJson, ApiPath, ApiQuery};
use crate::io::rest::mappers::VaccineMapper;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DiseaseQuery {
    pub disease: String,
}

/// Create a router for vaccine related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vaccines).post(create_vaccine))
        .route("/active", get(list_active_vaccines))
        .route("/search", get(search_by_disease))
        .route("/for-age/:months", get(list_for_age))
        .route(
            "/:id",
            get(get_vaccine).put(update_vaccine).delete(delete_vaccine),
        )
        .route("/:id/activate", put(activate_vaccine))
        .route("/:id/deactivate", put(deactivate_vaccine))
}

pub async fn create_vaccine(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<CreateVaccineRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("POST /api/v1/vaccines - request: {:?}", request);
    user.require_any(STAFF)?;

    let vaccine = state.vaccine_service.create_vaccine(request).await?;
    Ok((StatusCode::CREATED, Json(VaccineMapper::to_dto(vaccine))))
}

pub async fn list_vaccines(State(state): State<AppState>, _user: AuthUser) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/vaccines");

    let vaccines = state.vaccine_service.list_vaccines().await?;
    Ok(Json(VaccineMapper::to_list_dto(vaccines)))
}

pub async fn list_active_vaccines(State(state): State<AppState>, _user: AuthUser) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/vaccines/active");

    let vaccines = state.vaccine_service.list_active_vaccines().await?;
    Ok(Json(VaccineMapper::to_list_dto(vaccines)))
}

pub async fn search_by_disease(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<DiseaseQuery>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/vaccines/search - query: {:?}", query);

    let vaccines = state.vaccine_service.search_by_disease(&query.disease).await?;
    Ok(Json(VaccineMapper::to_list_dto(vaccines)))
}

/// Active vaccines a child of `months` is old enough to receive
pub async fn list_for_age(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(months): ApiPath<i32>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/vaccines/for-age/{}", months);

    let vaccines = state.vaccine_service.list_for_age(months).await?;
    Ok(Json(VaccineMapper::to_list_dto(vaccines)))
}

pub async fn get_vaccine(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(vaccine_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/vaccines/{}", vaccine_id);

    let vaccine = state.vaccine_service.get_vaccine(vaccine_id).await?;
    Ok(Json(VaccineMapper::to_dto(vaccine)))
}

pub async fn update_vaccine(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(vaccine_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateVaccineRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/vaccines/{} - request: {:?}", vaccine_id, request);
    user.require_any(STAFF)?;

    let vaccine = state.vaccine_service.update_vaccine(vaccine_id, request).await?;
    Ok(Json(VaccineMapper::to_dto(vaccine)))
}

pub async fn activate_vaccine(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(vaccine_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/vaccines/{}/activate", vaccine_id);
    user.require_any(STAFF)?;

    let vaccine = state.vaccine_service.set_active(vaccine_id, true).await?;
    Ok(Json(VaccineMapper::to_dto(vaccine)))
}

pub async fn deactivate_vaccine(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(vaccine_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/vaccines/{}/deactivate", vaccine_id);
    user.require_any(STAFF)?;

    let vaccine = state.vaccine_service.set_active(vaccine_id, false).await?;
    Ok(Json(VaccineMapper::to_dto(vaccine)))
}

/// Refused while records, schedules, batches or appointments reference it
pub async fn delete_vaccine(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(vaccine_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("DELETE /api/v1/vaccines/{}", vaccine_id);
    user.require_any(DOCTOR_ONLY)?;

    state.vaccine_service.delete_vaccine(vaccine_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::io::rest::test_support::{json_request, read_json, request, test_app, token_for, TestResult};
    use axum::http::{Method, StatusCode};
    use shared::{CreateVaccineRequest, ErrorResponse, Role, Vaccine, VaccineListResponse};
    use tower::ServiceExt;

    fn create_request(name: &str, min_age_months: i32) -> CreateVaccineRequest {
        CreateVaccineRequest {
            name: name.to_string(),
            disease_prevented: "Measles, mumps and rubella".to_string(),
            manufacturer: Some("Merck".to_string()),
            description: None,
            dose_count: 2,
            min_age_months,
            min_storage_temp: 2.0,
            max_storage_temp: 8.0,
        }
    }

    #[tokio::test]
    async fn test_create_and_deactivate_vaccine() -> TestResult {
        let (state, app) = test_app().await;
        let doctor = token_for(&state, "doctor1", Role::Doctor).await;

        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/v1/vaccines", Some(&doctor), &create_request("MMR", 12)))
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        let vaccine: Vaccine = read_json(response).await;
        assert!(vaccine.active);

        let response = app
            .clone()
            .oneshot(request(
                Method::PUT,
                &format!("/api/v1/vaccines/{}/deactivate", vaccine.id),
                Some(&doctor),
            ))
            .await?;
        let deactivated: Vaccine = read_json(response).await;
        assert!(!deactivated.active);

        let response = app
            .oneshot(request(Method::GET, "/api/v1/vaccines/active", Some(&doctor)))
            .await?;
        let list: VaccineListResponse = read_json(response).await;
        assert!(list.vaccines.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_inverted_temperature_range_is_rejected() -> TestResult {
        let (state, app) = test_app().await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;

        let mut inverted = create_request("MMR", 12);
        inverted.min_storage_temp = 9.0;

        let response = app
            .oneshot(json_request(Method::POST, "/api/v1/vaccines", Some(&nurse), &inverted))
            .await?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = read_json(response).await;
        assert!(body.validation_errors.unwrap_or_default().contains_key("min_storage_temp"));
        Ok(())
    }

    #[tokio::test]
    async fn test_for_age_filters_by_minimum_age() -> TestResult {
        let (state, app) = test_app().await;
        let parent = token_for(&state, "parent1", Role::Parent).await;
        state.vaccine_service.create_vaccine(create_request("BCG", 0)).await?;
        state.vaccine_service.create_vaccine(create_request("MMR", 12)).await?;

        let response = app
            .oneshot(request(Method::GET, "/api/v1/vaccines/for-age/6", Some(&parent)))
            .await?;

        let list: VaccineListResponse = read_json(response).await;
        let names: Vec<_> = list.vaccines.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["BCG"]);
        Ok(())
    }
}
