//! # Vaccination Tracker Backend
//!
//! REST backend for a pediatric immunization records service: children and
//! their guardians, the vaccine catalog and national schedules, administered
//! doses, vaccine stock and appointments.
//!
//! ## Architecture
//!
//! ```text
//! IO Layer (REST API, auth, mappers)
//!     ↓
//! Domain Layer (services, business rules)
//!     ↓
//! Storage Layer (SQLite repositories)
//! ```
//!
//! Services are cheap to clone; each holds a handle to the shared pool.

pub mod config;
pub mod domain;
pub mod io;
pub mod storage;

use anyhow::{Context, Result};
use axum::{
    http::{HeaderValue, Method},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{AuthConfig, Config};
use crate::domain::{
    AppointmentService, AuthService, ChildService, GuardianService, InventoryService, NotificationService,
    ScheduleService, UserService, VaccinationRecordService, VaccineService,
};
use crate::storage::DbConnection;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub user_service: UserService,
    pub child_service: ChildService,
    pub guardian_service: GuardianService,
    pub vaccine_service: VaccineService,
    pub schedule_service: ScheduleService,
    pub vaccination_record_service: VaccinationRecordService,
    pub inventory_service: InventoryService,
    pub appointment_service: AppointmentService,
    pub notification_service: NotificationService,
}

impl AppState {
    pub fn new(db: DbConnection, auth: AuthConfig) -> Self {
        Self {
            user_service: UserService::new(db.clone(), auth.bcrypt_cost),
            auth_service: AuthService::new(db.clone(), auth),
            child_service: ChildService::new(db.clone()),
            guardian_service: GuardianService::new(db.clone()),
            vaccine_service: VaccineService::new(db.clone()),
            schedule_service: ScheduleService::new(db.clone()),
            vaccination_record_service: VaccinationRecordService::new(db.clone()),
            inventory_service: InventoryService::new(db.clone()),
            appointment_service: AppointmentService::new(db.clone()),
            notification_service: NotificationService::new(db),
        }
    }
}

/// Initialize the backend with all required services
pub async fn initialize_backend(config: &Config) -> Result<AppState> {
    info!("Setting up database at {}", config.database_url);
    let db = DbConnection::new(&config.database_url)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))?;

    info!("Setting up domain services");
    let state = AppState::new(db, config.auth.clone());

    if let Some(admin) = &config.bootstrap_admin {
        state.auth_service.bootstrap_admin(admin).await?;
    }

    Ok(state)
}

/// Create the Axum router with all routes configured
pub fn create_router(state: AppState, cors_origin: &str) -> Result<Router> {
    // CORS setup to allow the frontend to make requests
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin {}", cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any);

    Ok(Router::new()
        .nest("/api/v1", io::rest::api_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}
