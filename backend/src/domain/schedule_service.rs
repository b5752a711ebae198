use chrono::Utc;
use shared::{CreateScheduleRequest, UpdateScheduleRequest};
use tracing::info;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::VaccinationSchedule;
use crate::domain::validation::{clean_optional, FieldErrors};
use crate::storage::repositories::{schedule_repository, vaccine_repository};
use crate::storage::DbConnection;

/// Service for per-country recommended vaccination schedules
#[derive(Clone)]
pub struct ScheduleService {
    db: DbConnection,
}

impl ScheduleService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn create_schedule(&self, request: CreateScheduleRequest) -> DomainResult<VaccinationSchedule> {
        info!(
            "Creating schedule: vaccine={}, country={}, dose={}",
            request.vaccine_id, request.country_code, request.dose_number
        );

        let country_code = normalize_country_code(&request.country_code)?;

        let mut errors = FieldErrors::new();
        errors.require_non_negative("age_months", request.age_months);
        errors.optional_text("notes", request.notes.as_deref(), 500);
        errors.into_result()?;

        let mut tx = self.db.begin().await?;

        let vaccine = vaccine_repository::find_by_id(&mut *tx, request.vaccine_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vaccine", request.vaccine_id))?;

        if !vaccine.accepts_dose(request.dose_number) {
            return Err(DomainError::business(format!(
                "Dose number {} is outside 1..={} for vaccine {}",
                request.dose_number, vaccine.dose_count, vaccine.name
            )));
        }

        if schedule_repository::exists_for_dose(&mut *tx, vaccine.id, &country_code, request.dose_number).await? {
            return Err(DomainError::duplicate(format!(
                "Dose {} of {} is already scheduled for {}",
                request.dose_number, vaccine.name, country_code
            )));
        }

        let now = Utc::now();
        let mut schedule = VaccinationSchedule {
            id: 0,
            vaccine_id: vaccine.id,
            country_code,
            dose_number: request.dose_number,
            age_months: request.age_months,
            mandatory: request.mandatory,
            notes: clean_optional(request.notes),
            created_at: now,
            updated_at: now,
        };
        schedule.id = schedule_repository::insert(&mut *tx, &schedule).await?;
        tx.commit().await?;

        info!("Created schedule with ID: {}", schedule.id);
        Ok(schedule)
    }

    pub async fn get_schedule(&self, schedule_id: i64) -> DomainResult<VaccinationSchedule> {
        let mut conn = self.db.acquire().await?;
        Self::load_schedule(&mut conn, schedule_id).await
    }

    pub async fn update_schedule(
        &self,
        schedule_id: i64,
        request: UpdateScheduleRequest,
    ) -> DomainResult<VaccinationSchedule> {
        info!("Updating schedule: {}", schedule_id);

        let mut errors = FieldErrors::new();
        if let Some(age_months) = request.age_months {
            errors.require_non_negative("age_months", age_months);
        }
        errors.optional_text("notes", request.notes.as_deref(), 500);
        errors.into_result()?;

        let mut tx = self.db.begin().await?;
        let mut schedule = Self::load_schedule(&mut tx, schedule_id).await?;

        if let Some(age_months) = request.age_months {
            schedule.age_months = age_months;
        }
        if let Some(mandatory) = request.mandatory {
            schedule.mandatory = mandatory;
        }
        if request.notes.is_some() {
            schedule.notes = clean_optional(request.notes);
        }
        schedule.updated_at = Utc::now();

        schedule_repository::update(&mut *tx, &schedule).await?;
        tx.commit().await?;

        Ok(schedule)
    }

    pub async fn delete_schedule(&self, schedule_id: i64) -> DomainResult<()> {
        info!("Deleting schedule: {}", schedule_id);

        let mut tx = self.db.begin().await?;
        if !schedule_repository::delete(&mut *tx, schedule_id).await? {
            return Err(DomainError::not_found("Schedule", schedule_id));
        }
        tx.commit().await?;

        Ok(())
    }

    pub async fn list_by_country(&self, country_code: &str) -> DomainResult<Vec<VaccinationSchedule>> {
        let country_code = normalize_country_code(country_code)?;
        let mut conn = self.db.acquire().await?;
        Ok(schedule_repository::list_by_country(&mut conn, &country_code, false).await?)
    }

    pub async fn list_mandatory_by_country(&self, country_code: &str) -> DomainResult<Vec<VaccinationSchedule>> {
        let country_code = normalize_country_code(country_code)?;
        let mut conn = self.db.acquire().await?;
        Ok(schedule_repository::list_by_country(&mut conn, &country_code, true).await?)
    }

    pub async fn list_by_vaccine(&self, vaccine_id: i64) -> DomainResult<Vec<VaccinationSchedule>> {
        let mut conn = self.db.acquire().await?;
        if vaccine_repository::find_by_id(&mut conn, vaccine_id).await?.is_none() {
            return Err(DomainError::not_found("Vaccine", vaccine_id));
        }
        Ok(schedule_repository::list_by_vaccine(&mut conn, vaccine_id).await?)
    }

    /// Entries whose recommended age has been reached at `age_months`
    pub async fn list_due_at_age(
        &self,
        country_code: &str,
        age_months: i32,
    ) -> DomainResult<Vec<VaccinationSchedule>> {
        let country_code = normalize_country_code(country_code)?;
        if age_months < 0 {
            return Err(DomainError::business("Age in months cannot be negative"));
        }

        let mut conn = self.db.acquire().await?;
        Ok(schedule_repository::list_due_by_age(&mut conn, &country_code, age_months).await?)
    }

    async fn load_schedule(
        conn: &mut sqlx::SqliteConnection,
        schedule_id: i64,
    ) -> DomainResult<VaccinationSchedule> {
        schedule_repository::find_by_id(conn, schedule_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Schedule", schedule_id))
    }
}

/// Country codes are two or three ASCII letters, stored upper-case
fn normalize_country_code(raw: &str) -> DomainResult<String> {
    let code = raw.trim().to_ascii_uppercase();
    if !(2..=3).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_alphabetic()) {
        let mut errors = FieldErrors::new();
        errors.add("country_code", "must be a 2 or 3 letter country code");
        errors.into_result()?;
    }
    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_support::{seed_vaccine, setup_db};

    fn request(vaccine_id: i64, dose_number: i32, age_months: i32, mandatory: bool) -> CreateScheduleRequest {
        CreateScheduleRequest {
            vaccine_id,
            country_code: "co".to_string(),
            dose_number,
            age_months,
            mandatory,
            notes: None,
        }
    }

    #[test]
    fn test_normalize_country_code() {
        assert_eq!(normalize_country_code(" col ").unwrap(), "COL");
        assert!(normalize_country_code("C").is_err());
        assert!(normalize_country_code("C0").is_err());
    }

    #[tokio::test]
    async fn test_dose_number_must_fit_vaccine() {
        let db = setup_db().await;
        let vaccine = seed_vaccine(&db, "Hepatitis B", 3).await;
        let service = ScheduleService::new(db);

        let err = service.create_schedule(request(vaccine.id, 4, 6, true)).await.unwrap_err();
        assert!(matches!(err, DomainError::BusinessRule(_)));

        let err = service.create_schedule(request(vaccine.id, 0, 0, true)).await.unwrap_err();
        assert!(matches!(err, DomainError::BusinessRule(_)));

        let err = service.create_schedule(request(999, 1, 0, true)).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_dose_for_country_is_rejected() {
        let db = setup_db().await;
        let vaccine = seed_vaccine(&db, "Hepatitis B", 3).await;
        let service = ScheduleService::new(db);

        let created = service.create_schedule(request(vaccine.id, 1, 0, true)).await.unwrap();
        assert_eq!(created.country_code, "CO");

        let err = service.create_schedule(request(vaccine.id, 1, 2, true)).await.unwrap_err();
        assert!(matches!(err, DomainError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_country_queries() {
        let db = setup_db().await;
        let vaccine = seed_vaccine(&db, "Hepatitis B", 3).await;
        let service = ScheduleService::new(db);
        service.create_schedule(request(vaccine.id, 3, 6, true)).await.unwrap();
        service.create_schedule(request(vaccine.id, 1, 0, true)).await.unwrap();
        service.create_schedule(request(vaccine.id, 2, 2, false)).await.unwrap();

        let all = service.list_by_country("CO").await.unwrap();
        let ages: Vec<i32> = all.iter().map(|s| s.age_months).collect();
        assert_eq!(ages, vec![0, 2, 6]);

        assert_eq!(service.list_mandatory_by_country("co").await.unwrap().len(), 2);
        assert_eq!(service.list_due_at_age("CO", 2).await.unwrap().len(), 2);
        assert!(service.list_by_country("PE").await.unwrap().is_empty());
        assert_eq!(service.list_by_vaccine(vaccine.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let db = setup_db().await;
        let vaccine = seed_vaccine(&db, "Hepatitis B", 3).await;
        let service = ScheduleService::new(db);
        let schedule = service.create_schedule(request(vaccine.id, 1, 0, true)).await.unwrap();

        let updated = service
            .update_schedule(
                schedule.id,
                UpdateScheduleRequest {
                    mandatory: Some(false),
                    notes: Some("Within 24 hours of birth".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(!updated.mandatory);
        assert_eq!(updated.age_months, 0);

        service.delete_schedule(schedule.id).await.unwrap();
        assert!(matches!(
            service.get_schedule(schedule.id).await.unwrap_err(),
            DomainError::NotFound { .. }
        ));
    }
}
