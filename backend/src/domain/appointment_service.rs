//! Appointment booking and status tracking.
//!
//! The usual lifecycle is SCHEDULED, then CONFIRMED, then COMPLETED, with
//! CANCELLED and NO_SHOW as the other end states. Transitions are not policed:
//! `confirm`, `complete`, `cancel` and `mark_no_show` all go through the same
//! unconditional setter as the generic status update.

use chrono::{DateTime, Utc};
use shared::{AppointmentStatus, CreateAppointmentRequest, UpdateAppointmentRequest};
use sqlx::SqliteConnection;
use tracing::info;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::Appointment;
use crate::domain::validation::{clean_optional, FieldErrors};
use crate::storage::repositories::{
    appointment_repository, child_repository, user_repository, vaccine_repository,
};
use crate::storage::DbConnection;

#[derive(Clone)]
pub struct AppointmentService {
    db: DbConnection,
}

impl AppointmentService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Book an appointment on behalf of `created_by`
    pub async fn create_appointment(
        &self,
        request: CreateAppointmentRequest,
        created_by: i64,
    ) -> DomainResult<Appointment> {
        info!(
            "Creating appointment for child {} at {}",
            request.child_id, request.scheduled_at
        );

        let mut errors = FieldErrors::new();
        errors.require_text("reason", &request.reason, 255);
        errors.optional_text("notes", request.notes.as_deref(), 1000);
        errors.into_result()?;

        let mut tx = self.db.begin().await?;

        let child = child_repository::find_by_id(&mut *tx, request.child_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Child", request.child_id))?;
        if child.is_deleted() {
            return Err(DomainError::business(format!(
                "Cannot book an appointment for deleted child {}",
                child.id
            )));
        }

        if user_repository::find_by_id(&mut *tx, created_by).await?.is_none() {
            return Err(DomainError::not_found("User", created_by));
        }
        if let Some(assigned_to) = request.assigned_to {
            Self::ensure_staff(&mut tx, assigned_to).await?;
        }
        if let Some(vaccine_id) = request.vaccine_id {
            if vaccine_repository::find_by_id(&mut *tx, vaccine_id).await?.is_none() {
                return Err(DomainError::not_found("Vaccine", vaccine_id));
            }
        }

        let now = Utc::now();
        Appointment::ensure_in_future(request.scheduled_at, now)?;

        let mut appointment = Appointment {
            id: 0,
            child_id: child.id,
            scheduled_at: request.scheduled_at,
            reason: request.reason.trim().to_string(),
            status: AppointmentStatus::Scheduled,
            created_by,
            assigned_to: request.assigned_to,
            vaccine_id: request.vaccine_id,
            notes: clean_optional(request.notes),
            created_at: now,
            updated_at: now,
        };
        appointment.id = appointment_repository::insert(&mut *tx, &appointment).await?;
        tx.commit().await?;

        info!("Created appointment with ID: {}", appointment.id);
        Ok(appointment)
    }

    pub async fn get_appointment(&self, appointment_id: i64) -> DomainResult<Appointment> {
        let mut conn = self.db.acquire().await?;
        Self::load_appointment(&mut conn, appointment_id).await
    }

    pub async fn list_appointments(&self) -> DomainResult<Vec<Appointment>> {
        let mut conn = self.db.acquire().await?;
        Ok(appointment_repository::list(&mut conn).await?)
    }

    pub async fn list_by_child(&self, child_id: i64) -> DomainResult<Vec<Appointment>> {
        let mut conn = self.db.acquire().await?;
        if child_repository::find_by_id(&mut conn, child_id).await?.is_none() {
            return Err(DomainError::not_found("Child", child_id));
        }
        Ok(appointment_repository::list_by_child(&mut conn, child_id).await?)
    }

    pub async fn list_by_assignee(&self, user_id: i64) -> DomainResult<Vec<Appointment>> {
        let mut conn = self.db.acquire().await?;
        if user_repository::find_by_id(&mut conn, user_id).await?.is_none() {
            return Err(DomainError::not_found("User", user_id));
        }
        Ok(appointment_repository::list_by_assignee(&mut conn, user_id).await?)
    }

    pub async fn list_by_status(&self, status: AppointmentStatus) -> DomainResult<Vec<Appointment>> {
        let mut conn = self.db.acquire().await?;
        Ok(appointment_repository::list_by_status(&mut conn, status).await?)
    }

    pub async fn list_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DomainResult<Vec<Appointment>> {
        if from > to {
            return Err(DomainError::business("Start date must not be after end date"));
        }

        let mut conn = self.db.acquire().await?;
        Ok(appointment_repository::list_between(&mut conn, from, to).await?)
    }

    /// Future appointments still SCHEDULED or CONFIRMED
    pub async fn list_upcoming(&self, now: DateTime<Utc>) -> DomainResult<Vec<Appointment>> {
        let mut conn = self.db.acquire().await?;
        let appointments = appointment_repository::list_upcoming(&mut conn, now).await?;
        info!("Found {} upcoming appointments", appointments.len());
        Ok(appointments)
    }

    pub async fn update_appointment(
        &self,
        appointment_id: i64,
        request: UpdateAppointmentRequest,
    ) -> DomainResult<Appointment> {
        info!("Updating appointment: {}", appointment_id);

        let mut errors = FieldErrors::new();
        errors.optional_text("reason", request.reason.as_deref(), 255);
        errors.optional_text("notes", request.notes.as_deref(), 1000);
        errors.into_result()?;

        let mut tx = self.db.begin().await?;
        let mut appointment = Self::load_appointment(&mut tx, appointment_id).await?;
        let now = Utc::now();

        if let Some(scheduled_at) = request.scheduled_at {
            if scheduled_at != appointment.scheduled_at {
                Appointment::ensure_in_future(scheduled_at, now)?;
                appointment.scheduled_at = scheduled_at;
            }
        }
        if let Some(reason) = request.reason {
            appointment.reason = reason.trim().to_string();
        }
        if let Some(assigned_to) = request.assigned_to {
            Self::ensure_staff(&mut tx, assigned_to).await?;
            appointment.assigned_to = Some(assigned_to);
        }
        if request.notes.is_some() {
            appointment.notes = clean_optional(request.notes);
        }
        if let Some(status) = request.status {
            appointment.status = status;
        }
        appointment.updated_at = now;

        appointment_repository::update(&mut *tx, &appointment).await?;
        tx.commit().await?;

        Ok(appointment)
    }

    /// Set any status, regardless of the current one
    pub async fn update_status(&self, appointment_id: i64, status: AppointmentStatus) -> DomainResult<Appointment> {
        info!("Setting appointment {} status to {}", appointment_id, status);

        let mut tx = self.db.begin().await?;
        let mut appointment = Self::load_appointment(&mut tx, appointment_id).await?;
        let previous = appointment.status;

        appointment.set_status(status, Utc::now());
        appointment_repository::update(&mut *tx, &appointment).await?;
        tx.commit().await?;

        info!("Appointment {} moved from {} to {}", appointment_id, previous, status);
        Ok(appointment)
    }

    pub async fn confirm(&self, appointment_id: i64) -> DomainResult<Appointment> {
        self.update_status(appointment_id, AppointmentStatus::Confirmed).await
    }

    pub async fn complete(&self, appointment_id: i64) -> DomainResult<Appointment> {
        self.update_status(appointment_id, AppointmentStatus::Completed).await
    }

    pub async fn cancel(&self, appointment_id: i64) -> DomainResult<Appointment> {
        self.update_status(appointment_id, AppointmentStatus::Cancelled).await
    }

    pub async fn mark_no_show(&self, appointment_id: i64) -> DomainResult<Appointment> {
        self.update_status(appointment_id, AppointmentStatus::NoShow).await
    }

    pub async fn delete_appointment(&self, appointment_id: i64) -> DomainResult<()> {
        info!("Deleting appointment: {}", appointment_id);

        let mut tx = self.db.begin().await?;
        if !appointment_repository::delete(&mut *tx, appointment_id).await? {
            return Err(DomainError::not_found("Appointment", appointment_id));
        }
        tx.commit().await?;

        Ok(())
    }

    async fn load_appointment(conn: &mut SqliteConnection, appointment_id: i64) -> DomainResult<Appointment> {
        appointment_repository::find_by_id(conn, appointment_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Appointment", appointment_id))
    }

    /// Appointments can only be assigned to doctors and nurses
    async fn ensure_staff(conn: &mut SqliteConnection, user_id: i64) -> DomainResult<()> {
        let user = user_repository::find_by_id(conn, user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", user_id))?;
        if !user.is_staff() {
            return Err(DomainError::business(format!(
                "User {} cannot be assigned appointments",
                user.username
            )));
        }
        Ok(())
    }
}
