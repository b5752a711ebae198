use chrono::{Duration, NaiveDate, Utc};
use shared::{CreateVaccinationRecordRequest, UpdateVaccinationRecordRequest};
use tracing::{info, warn};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::VaccinationRecord;
use crate::domain::validation::{clean_optional, FieldErrors};
use crate::storage::repositories::{
    child_repository, user_repository, vaccination_record_repository, vaccine_repository,
};
use crate::storage::DbConnection;

/// Service for the doses administered to each child
#[derive(Clone)]
pub struct VaccinationRecordService {
    db: DbConnection,
}

impl VaccinationRecordService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Record a dose given by `administered_by`
    pub async fn create_record(
        &self,
        request: CreateVaccinationRecordRequest,
        administered_by: i64,
    ) -> DomainResult<VaccinationRecord> {
        info!(
            "Recording dose {} of vaccine {} for child {}",
            request.dose_number, request.vaccine_id, request.child_id
        );

        let today = Utc::now().date_naive();

        let mut errors = FieldErrors::new();
        errors.require_text("batch_number", &request.batch_number, 50);
        errors.optional_text("site", request.site.as_deref(), 100);
        if request.administered_on > today {
            errors.add("administered_on", "must not be in the future");
        }
        if let Some(next_dose_date) = request.next_dose_date {
            if next_dose_date <= request.administered_on {
                errors.add("next_dose_date", "must be after administered_on");
            }
        }
        errors.into_result()?;

        let mut tx = self.db.begin().await?;

        // Resolve the references
        let child = child_repository::find_by_id(&mut *tx, request.child_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Child", request.child_id))?;
        if child.is_deleted() {
            return Err(DomainError::business(format!(
                "Cannot record a vaccination for deleted child {}",
                child.id
            )));
        }

        let vaccine = vaccine_repository::find_by_id(&mut *tx, request.vaccine_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vaccine", request.vaccine_id))?;
        if !vaccine.active {
            return Err(DomainError::business(format!("Vaccine {} is not active", vaccine.name)));
        }
        if !vaccine.accepts_dose(request.dose_number) {
            return Err(DomainError::business(format!(
                "Dose number {} is outside 1..={} for vaccine {}",
                request.dose_number, vaccine.dose_count, vaccine.name
            )));
        }

        if user_repository::find_by_id(&mut *tx, administered_by).await?.is_none() {
            return Err(DomainError::not_found("User", administered_by));
        }

        if vaccination_record_repository::dose_exists(&mut *tx, child.id, vaccine.id, request.dose_number)
            .await?
        {
            warn!(
                "Child {} already has dose {} of vaccine {} on record",
                child.id, request.dose_number, vaccine.id
            );
        }

        let now = Utc::now();
        let mut record = VaccinationRecord {
            id: 0,
            child_id: child.id,
            vaccine_id: vaccine.id,
            dose_number: request.dose_number,
            batch_number: request.batch_number.trim().to_string(),
            administered_by,
            administered_on: request.administered_on,
            next_dose_date: request.next_dose_date,
            site: clean_optional(request.site),
            notes: clean_optional(request.notes),
            created_at: now,
            updated_at: now,
        };
        record.id = vaccination_record_repository::insert(&mut *tx, &record).await?;
        tx.commit().await?;

        info!("Created vaccination record with ID: {}", record.id);
        Ok(record)
    }

    pub async fn get_record(&self, record_id: i64) -> DomainResult<VaccinationRecord> {
        let mut conn = self.db.acquire().await?;
        Self::load_record(&mut conn, record_id).await
    }

    /// Only the follow-up fields can change once a dose is recorded
    pub async fn update_record(
        &self,
        record_id: i64,
        request: UpdateVaccinationRecordRequest,
    ) -> DomainResult<VaccinationRecord> {
        info!("Updating vaccination record: {}", record_id);

        let mut tx = self.db.begin().await?;
        let mut record = Self::load_record(&mut tx, record_id).await?;

        let mut errors = FieldErrors::new();
        errors.optional_text("site", request.site.as_deref(), 100);
        if let Some(next_dose_date) = request.next_dose_date {
            if next_dose_date <= record.administered_on {
                errors.add("next_dose_date", "must be after administered_on");
            }
        }
        errors.into_result()?;

        if request.next_dose_date.is_some() {
            record.next_dose_date = request.next_dose_date;
        }
        if request.site.is_some() {
            record.site = clean_optional(request.site);
        }
        if request.notes.is_some() {
            record.notes = clean_optional(request.notes);
        }
        record.updated_at = Utc::now();

        vaccination_record_repository::update(&mut *tx, &record).await?;
        tx.commit().await?;

        Ok(record)
    }

    pub async fn delete_record(&self, record_id: i64) -> DomainResult<()> {
        info!("Deleting vaccination record: {}", record_id);

        let mut tx = self.db.begin().await?;
        if !vaccination_record_repository::delete(&mut *tx, record_id).await? {
            return Err(DomainError::not_found("VaccinationRecord", record_id));
        }
        tx.commit().await?;

        Ok(())
    }

    pub async fn list_by_child(&self, child_id: i64) -> DomainResult<Vec<VaccinationRecord>> {
        let mut conn = self.db.acquire().await?;
        if child_repository::find_by_id(&mut conn, child_id).await?.is_none() {
            return Err(DomainError::not_found("Child", child_id));
        }
        Ok(vaccination_record_repository::list_by_child(&mut conn, child_id).await?)
    }

    pub async fn count_by_child(&self, child_id: i64) -> DomainResult<i64> {
        let mut conn = self.db.acquire().await?;
        if child_repository::find_by_id(&mut conn, child_id).await?.is_none() {
            return Err(DomainError::not_found("Child", child_id));
        }
        Ok(vaccination_record_repository::count_by_child(&mut conn, child_id).await?)
    }

    pub async fn list_by_vaccine(&self, vaccine_id: i64) -> DomainResult<Vec<VaccinationRecord>> {
        let mut conn = self.db.acquire().await?;
        if vaccine_repository::find_by_id(&mut conn, vaccine_id).await?.is_none() {
            return Err(DomainError::not_found("Vaccine", vaccine_id));
        }
        Ok(vaccination_record_repository::list_by_vaccine(&mut conn, vaccine_id).await?)
    }

    pub async fn list_between(&self, from: NaiveDate, to: NaiveDate) -> DomainResult<Vec<VaccinationRecord>> {
        if from > to {
            return Err(DomainError::business("Start date must not be after end date"));
        }

        let mut conn = self.db.acquire().await?;
        Ok(vaccination_record_repository::list_administered_between(&mut conn, from, to).await?)
    }

    /// Records whose next dose is due between `today` and `today + days`
    pub async fn list_upcoming_doses(
        &self,
        today: NaiveDate,
        days: i64,
    ) -> DomainResult<Vec<VaccinationRecord>> {
        if !(0..=3650).contains(&days) {
            return Err(DomainError::business("Days must be between 0 and 3650"));
        }

        let until = today + Duration::days(days);
        let mut conn = self.db.acquire().await?;
        let records = vaccination_record_repository::list_next_doses_between(&mut conn, today, until).await?;
        info!("Found {} doses due by {}", records.len(), until);
        Ok(records)
    }

    async fn load_record(conn: &mut sqlx::SqliteConnection, record_id: i64) -> DomainResult<VaccinationRecord> {
        vaccination_record_repository::find_by_id(conn, record_id)
            .await?
            .ok_or_else(|| DomainError::not_found("VaccinationRecord", record_id))
    }
}
