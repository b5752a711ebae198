//! # REST API for Vaccination Records
//!
//! The administering user is always the caller behind the bearer token.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use shared::{CountResponse, CreateVaccinationRecordRequest, UpdateVaccinationRecordRequest};
use tracing::info;

use crate::io::rest::auth::{AuthUser, DOCTOR_ONLY, STAFF};
use crate::io::rest::error::ApiResult;
use crate::io::rest::extract::{ApiJson, ApiPath, ApiQuery};
use crate::io::rest::mappers::VaccinationRecordMapper;
use crate::AppState;

const DEFAULT_UPCOMING_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    pub days: Option<i64>,
}

/// Create a router for vaccination record APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_record))
        .route("/child/:child_id", get(list_by_child))
        .route("/child/:child_id/count", get(count_by_child))
        .route("/vaccine/:vaccine_id", get(list_by_vaccine))
        .route("/date-range", get(list_between))
        .route("/upcoming", get(list_upcoming_doses))
        .route(
            "/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
}

pub async fn create_record(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<CreateVaccinationRecordRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("POST /api/v1/vaccination-records - request: {:?}", request);
    user.require_any(STAFF)?;

    let record = state
        .vaccination_record_service
        .create_record(request, user.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(VaccinationRecordMapper::to_dto(record))))
}

pub async fn get_record(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(record_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/vaccination-records/{}", record_id);

    let record = state.vaccination_record_service.get_record(record_id).await?;
    Ok(Json(VaccinationRecordMapper::to_dto(record)))
}

pub async fn update_record(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(record_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateVaccinationRecordRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/vaccination-records/{} - request: {:?}", record_id, request);
    user.require_any(STAFF)?;

    let record = state
        .vaccination_record_service
        .update_record(record_id, request)
        .await?;
    Ok(Json(VaccinationRecordMapper::to_dto(record)))
}

pub async fn delete_record(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(record_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("DELETE /api/v1/vaccination-records/{}", record_id);
    user.require_any(DOCTOR_ONLY)?;

    state.vaccination_record_service.delete_record(record_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_by_child(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(child_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/vaccination-records/child/{}", child_id);

    let records = state.vaccination_record_service.list_by_child(child_id).await?;
    Ok(Json(VaccinationRecordMapper::to_list_dto(records)))
}

pub async fn count_by_child(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(child_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/vaccination-records/child/{}/count", child_id);

    let count = state.vaccination_record_service.count_by_child(child_id).await?;
    Ok(Json(CountResponse { count }))
}

pub async fn list_by_vaccine(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(vaccine_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/vaccination-records/vaccine/{}", vaccine_id);

    let records = state.vaccination_record_service.list_by_vaccine(vaccine_id).await?;
    Ok(Json(VaccinationRecordMapper::to_list_dto(records)))
}

pub async fn list_between(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<DateRangeQuery>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/vaccination-records/date-range - query: {:?}", query);

    let records = state
        .vaccination_record_service
        .list_between(query.from, query.to)
        .await?;
    Ok(Json(VaccinationRecordMapper::to_list_dto(records)))
}

/// Records with a next dose due within `days` (default 30)
pub async fn list_upcoming_doses(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<DaysQuery>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/vaccination-records/upcoming - query: {:?}", query);

    let days = query.days.unwrap_or(DEFAULT_UPCOMING_DAYS);
    let records = state
        .vaccination_record_service
        .list_upcoming_doses(Utc::now().date_naive(), days)
        .await?;
    Ok(Json(VaccinationRecordMapper::to_list_dto(records)))
}
