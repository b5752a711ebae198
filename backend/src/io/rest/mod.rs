//! # REST API Interface Layer
//!
//! HTTP endpoints for the immunization records backend, all nested under
//! `/api/v1`. This layer handles:
//! - JSON request and response bodies
//! - Bearer token authentication and role checks
//! - Translating domain errors into status codes and [`shared::ErrorResponse`] bodies
//!
//! Handlers stay thin: extract, authorize, call one service method, map the
//! result. Business rules live in the domain services.

pub mod auth;
pub mod error;
pub mod extract;
pub mod mappers;

pub mod appointment_apis;
pub mod auth_apis;
pub mod child_apis;
pub mod guardian_apis;
pub mod inventory_apis;
pub mod notification_apis;
pub mod schedule_apis;
pub mod user_apis;
pub mod vaccination_record_apis;
pub mod vaccine_apis;

#[cfg(test)]
pub(crate) mod test_support;

use axum::Router;

use crate::AppState;

/// All API routes, to be nested under the version prefix
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_apis::router())
        .nest("/users", user_apis::router())
        .nest("/children", child_apis::router())
        .nest("/guardians", guardian_apis::router())
        .nest("/vaccines", vaccine_apis::router())
        .nest("/schedules", schedule_apis::router())
        .nest("/vaccination-records", vaccination_record_apis::router())
        .nest("/inventory", inventory_apis::router())
        .nest("/appointments", appointment_apis::router())
        .nest("/notifications", notification_apis::router())
}
