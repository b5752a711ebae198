//! # REST API for National Vaccination Schedules

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use shared::{CreateScheduleRequest, UpdateScheduleRequest};
use tracing::info;

use crate::io::rest::auth::{AuthUser, DOCTOR_ONLY, STAFF};
use crate::io::rest::error::ApiResult;
use crate::io::rest::extract::{ApiJson, ApiPath};
use crate::io::rest::mappers::ScheduleMapper;
use crate::AppState;

/// Create a router for schedule related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_schedule))
        .route("/country/:code", get(list_by_country))
        .route("/country/:code/mandatory", get(list_mandatory_by_country))
        .route("/country/:code/due/:months", get(list_due_at_age))
        .route("/vaccine/:vaccine_id", get(list_by_vaccine))
        .route(
            "/:id",
            get(get_schedule).put(update_schedule).delete(delete_schedule),
        )
}

pub async fn create_schedule(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<CreateScheduleRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("POST /api/v1/schedules - request: {:?}", request);
    user.require_any(STAFF)?;

    let schedule = state.schedule_service.create_schedule(request).await?;
    Ok((StatusCode::CREATED, Json(ScheduleMapper::to_dto(schedule))))
}

pub async fn list_by_country(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(code): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/schedules/country/{}", code);

    let schedules = state.schedule_service.list_by_country(&code).await?;
    Ok(Json(ScheduleMapper::to_list_dto(schedules)))
}

pub async fn list_mandatory_by_country(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(code): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/schedules/country/{}/mandatory", code);

    let schedules = state.schedule_service.list_mandatory_by_country(&code).await?;
    Ok(Json(ScheduleMapper::to_list_dto(schedules)))
}

pub async fn list_due_at_age(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath((code, months)): ApiPath<(String, i32)>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/schedules/country/{}/due/{}", code, months);

    let schedules = state.schedule_service.list_due_at_age(&code, months).await?;
    Ok(Json(ScheduleMapper::to_list_dto(schedules)))
}

pub async fn list_by_vaccine(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(vaccine_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/schedules/vaccine/{}", vaccine_id);

    let schedules = state.schedule_service.list_by_vaccine(vaccine_id).await?;
    Ok(Json(ScheduleMapper::to_list_dto(schedules)))
}

pub async fn get_schedule(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(schedule_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/schedules/{}", schedule_id);

    let schedule = state.schedule_service.get_schedule(schedule_id).await?;
    Ok(Json(ScheduleMapper::to_dto(schedule)))
}

pub async fn update_schedule(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(schedule_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateScheduleRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/schedules/{} - request: {:?}", schedule_id, request);
    user.require_any(STAFF)?;

    let schedule = state.schedule_service.update_schedule(schedule_id, request).await?;
    Ok(Json(ScheduleMapper::to_dto(schedule)))
}

pub async fn delete_schedule(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(schedule_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("DELETE /api/v1/schedules/{}", schedule_id);
    user.require_any(DOCTOR_ONLY)?;

    state.schedule_service.delete_schedule(schedule_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
