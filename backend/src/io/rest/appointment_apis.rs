//! # REST API for Appointments
//!
//! Parents may book, confirm and cancel; completing, marking a no-show and
//! arbitrary status changes are reserved for staff.

use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::{AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentRequest, UpdateAppointmentStatusRequest};
use tracing::info;

use crate::io::rest::auth::{AuthUser, ANY_ROLE, DOCTOR_ONLY, STAFF};
use crate::io::rest::error::ApiResult;
use crate::io::rest::extract::{ApiJson, ApiPath, ApiQuery};
use crate::io::rest::mappers::AppointmentMapper;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct DateTimeRangeQuery {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Create a router for appointment related APIs
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_appointments).post(create_appointment))
        .route("/upcoming", get(list_upcoming))
        .route("/date-range", get(list_between))
        .route("/child/:child_id", get(list_by_child))
        .route("/assigned/:user_id", get(list_by_assignee))
        .route("/status/:status", get(list_by_status))
        .route(
            "/:id",
            get(get_appointment)
                .put(update_appointment)
                .delete(delete_appointment),
        )
        .route("/:id/status", put(update_status))
        .route("/:id/confirm", put(confirm_appointment))
        .route("/:id/complete", put(complete_appointment))
        .route("/:id/cancel", put(cancel_appointment))
        .route("/:id/no-show", put(mark_no_show))
}

/// Book an appointment; the caller is recorded as its creator
pub async fn create_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(request): ApiJson<CreateAppointmentRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("POST /api/v1/appointments - request: {:?}", request);
    user.require_any(ANY_ROLE)?;

    let appointment = state
        .appointment_service
        .create_appointment(request, user.user_id)
        .await?;
    Ok((StatusCode::CREATED, Json(AppointmentMapper::to_dto(appointment))))
}

pub async fn list_appointments(State(state): State<AppState>, _user: AuthUser) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/appointments");

    let appointments = state.appointment_service.list_appointments().await?;
    Ok(Json(AppointmentMapper::to_list_dto(appointments)))
}

pub async fn list_upcoming(State(state): State<AppState>, _user: AuthUser) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/appointments/upcoming");

    let appointments = state.appointment_service.list_upcoming(Utc::now()).await?;
    Ok(Json(AppointmentMapper::to_list_dto(appointments)))
}

pub async fn list_between(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiQuery(query): ApiQuery<DateTimeRangeQuery>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/appointments/date-range - query: {:?}", query);

    let appointments = state
        .appointment_service
        .list_between(query.from, query.to)
        .await?;
    Ok(Json(AppointmentMapper::to_list_dto(appointments)))
}

pub async fn list_by_child(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(child_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/appointments/child/{}", child_id);

    let appointments = state.appointment_service.list_by_child(child_id).await?;
    Ok(Json(AppointmentMapper::to_list_dto(appointments)))
}

pub async fn list_by_assignee(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(user_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/appointments/assigned/{}", user_id);

    let appointments = state.appointment_service.list_by_assignee(user_id).await?;
    Ok(Json(AppointmentMapper::to_list_dto(appointments)))
}

pub async fn list_by_status(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(status): ApiPath<String>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/appointments/status/{}", status);

    let status: AppointmentStatus = status.parse()?;
    let appointments = state.appointment_service.list_by_status(status).await?;
    Ok(Json(AppointmentMapper::to_list_dto(appointments)))
}

pub async fn get_appointment(
    State(state): State<AppState>,
    _user: AuthUser,
    ApiPath(appointment_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("GET /api/v1/appointments/{}", appointment_id);

    let appointment = state.appointment_service.get_appointment(appointment_id).await?;
    Ok(Json(AppointmentMapper::to_dto(appointment)))
}

pub async fn update_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(appointment_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateAppointmentRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/appointments/{} - request: {:?}", appointment_id, request);
    user.require_any(STAFF)?;

    let appointment = state
        .appointment_service
        .update_appointment(appointment_id, request)
        .await?;
    Ok(Json(AppointmentMapper::to_dto(appointment)))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(appointment_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("DELETE /api/v1/appointments/{}", appointment_id);
    user.require_any(DOCTOR_ONLY)?;

    state.appointment_service.delete_appointment(appointment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(appointment_id): ApiPath<i64>,
    ApiJson(request): ApiJson<UpdateAppointmentStatusRequest>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/appointments/{}/status - request: {:?}", appointment_id, request);
    user.require_any(STAFF)?;

    let appointment = state
        .appointment_service
        .update_status(appointment_id, request.status)
        .await?;
    Ok(Json(AppointmentMapper::to_dto(appointment)))
}

pub async fn confirm_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(appointment_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/appointments/{}/confirm", appointment_id);
    user.require_any(ANY_ROLE)?;

    let appointment = state.appointment_service.confirm(appointment_id).await?;
    Ok(Json(AppointmentMapper::to_dto(appointment)))
}

pub async fn complete_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(appointment_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/appointments/{}/complete", appointment_id);
    user.require_any(STAFF)?;

    let appointment = state.appointment_service.complete(appointment_id).await?;
    Ok(Json(AppointmentMapper::to_dto(appointment)))
}

pub async fn cancel_appointment(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(appointment_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/appointments/{}/cancel", appointment_id);
    user.require_any(ANY_ROLE)?;

    let appointment = state.appointment_service.cancel(appointment_id).await?;
    Ok(Json(AppointmentMapper::to_dto(appointment)))
}

pub async fn mark_no_show(
    State(state): State<AppState>,
    user: AuthUser,
    ApiPath(appointment_id): ApiPath<i64>,
) -> ApiResult<impl IntoResponse> {
    info!("PUT /api/v1/appointments/{}/no-show", appointment_id);
    user.require_any(STAFF)?;

    let appointment = state.appointment_service.mark_no_show(appointment_id).await?;
    Ok(Json(AppointmentMapper::to_dto(appointment)))
}

#[cfg(test)]
mod tests {
    use crate::io::rest::test_support::{json_request, read_json, request, test_app, token_for, TestResult};
    use axum::http::{Method, StatusCode};
    use chrono::{Duration, NaiveDate, Utc};
    use shared::{
        Appointment, AppointmentListResponse, AppointmentStatus, CreateAppointmentRequest, CreateChildRequest,
        ErrorResponse, Gender, Role,
    };
    use tower::ServiceExt;

    use crate::AppState;

    async fn seed_child(state: &AppState) -> Result<i64, Box<dyn std::error::Error>> {
        let child = state
            .child_service
            .create_child(CreateChildRequest {
                first_name: "Sofia".to_string(),
                last_name: "Castro".to_string(),
                document_number: "RC-555".to_string(),
                birth_date: NaiveDate::from_ymd_opt(2024, 8, 20).unwrap(),
                gender: Gender::Female,
                blood_type: None,
                birth_weight_kg: None,
                birth_height_cm: None,
                guardian_ids: vec![],
            })
            .await?;
        Ok(child.id)
    }

    fn booking(child_id: i64, days_from_now: i64) -> CreateAppointmentRequest {
        CreateAppointmentRequest {
            child_id,
            scheduled_at: Utc::now() + Duration::days(days_from_now),
            reason: "Six month check-up".to_string(),
            assigned_to: None,
            vaccine_id: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_parent_books_confirms_but_cannot_complete() -> TestResult {
        let (state, app) = test_app().await;
        let parent = token_for(&state, "parent1", Role::Parent).await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;
        let child_id = seed_child(&state).await?;

        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/v1/appointments", Some(&parent), &booking(child_id, 3)))
            .await?;
        assert_eq!(response.status(), StatusCode::CREATED);
        let appointment: Appointment = read_json(response).await;
        assert_eq!(appointment.status, AppointmentStatus::Scheduled);
        let base = format!("/api/v1/appointments/{}", appointment.id);

        let response = app
            .clone()
            .oneshot(request(Method::PUT, &format!("{}/confirm", base), Some(&parent)))
            .await?;
        let confirmed: Appointment = read_json(response).await;
        assert_eq!(confirmed.status, AppointmentStatus::Confirmed);

        let response = app
            .clone()
            .oneshot(request(Method::PUT, &format!("{}/complete", base), Some(&parent)))
            .await?;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(request(Method::PUT, &format!("{}/complete", base), Some(&nurse)))
            .await?;
        let completed: Appointment = read_json(response).await;
        assert_eq!(completed.status, AppointmentStatus::Completed);

        let response = app
            .oneshot(request(Method::GET, "/api/v1/appointments/status/completed", Some(&nurse)))
            .await?;
        let list: AppointmentListResponse = read_json(response).await;
        assert_eq!(list.appointments.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_past_appointment_is_rejected() -> TestResult {
        let (state, app) = test_app().await;
        let parent = token_for(&state, "parent1", Role::Parent).await;
        let child_id = seed_child(&state).await?;

        let response = app
            .oneshot(json_request(Method::POST, "/api/v1/appointments", Some(&parent), &booking(child_id, -1)))
            .await?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: ErrorResponse = read_json(response).await;
        assert_eq!(body.error, "BUSINESS_RULE_VIOLATION");
        Ok(())
    }

    #[tokio::test]
    async fn test_cannot_assign_to_parent() -> TestResult {
        let (state, app) = test_app().await;
        let nurse = token_for(&state, "nurse1", Role::Nurse).await;
        token_for(&state, "parent1", Role::Parent).await;
        let parent_id = state.user_service.list_by_role(Role::Parent).await?[0].id;
        let child_id = seed_child(&state).await?;

        let mut request_body = booking(child_id, 2);
        request_body.assigned_to = Some(parent_id);

        let response = app
            .oneshot(json_request(Method::POST, "/api/v1/appointments", Some(&nurse), &request_body))
            .await?;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn test_upcoming_excludes_cancelled() -> TestResult {
        let (state, app) = test_app().await;
        let parent = token_for(&state, "parent1", Role::Parent).await;
        let parent_id = state.user_service.list_by_role(Role::Parent).await?[0].id;
        let child_id = seed_child(&state).await?;

        let kept = state.appointment_service.create_appointment(booking(child_id, 1), parent_id).await?;
        let dropped = state.appointment_service.create_appointment(booking(child_id, 2), parent_id).await?;

        let response = app
            .clone()
            .oneshot(request(
                Method::PUT,
                &format!("/api/v1/appointments/{}/cancel", dropped.id),
                Some(&parent),
            ))
            .await?;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(request(Method::GET, "/api/v1/appointments/upcoming", Some(&parent)))
            .await?;
        let list: AppointmentListResponse = read_json(response).await;
        let ids: Vec<i64> = list.appointments.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![kept.id]);
        Ok(())
    }
}
