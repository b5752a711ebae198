use chrono::Utc;
use shared::{CreateVaccineRequest, UpdateVaccineRequest};
use tracing::{info, warn};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::Vaccine;
use crate::domain::validation::{clean_optional, FieldErrors};
use crate::storage::repositories::vaccine_repository;
use crate::storage::DbConnection;

/// Service for the vaccine catalogue
#[derive(Clone)]
pub struct VaccineService {
    db: DbConnection,
}

impl VaccineService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn create_vaccine(&self, request: CreateVaccineRequest) -> DomainResult<Vaccine> {
        info!("Creating vaccine: {}", request.name);

        let mut errors = FieldErrors::new();
        errors.require_text("name", &request.name, 100);
        errors.require_text("disease_prevented", &request.disease_prevented, 200);
        errors.optional_text("manufacturer", request.manufacturer.as_deref(), 100);
        errors.require_positive("dose_count", request.dose_count);
        errors.require_non_negative("min_age_months", request.min_age_months);
        check_temperatures(&mut errors, request.min_storage_temp, request.max_storage_temp);
        errors.into_result()?;

        let now = Utc::now();
        let mut vaccine = Vaccine {
            id: 0,
            name: request.name.trim().to_string(),
            disease_prevented: request.disease_prevented.trim().to_string(),
            manufacturer: clean_optional(request.manufacturer),
            description: clean_optional(request.description),
            dose_count: request.dose_count,
            min_age_months: request.min_age_months,
            min_storage_temp: request.min_storage_temp,
            max_storage_temp: request.max_storage_temp,
            active: true,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin().await?;

        if vaccine_repository::name_in_use(&mut *tx, &vaccine.name, None).await? {
            return Err(DomainError::duplicate(format!(
                "A vaccine named {} already exists",
                vaccine.name
            )));
        }

        vaccine.id = vaccine_repository::insert(&mut *tx, &vaccine).await?;
        tx.commit().await?;

        info!("Created vaccine {} with ID: {}", vaccine.name, vaccine.id);
        Ok(vaccine)
    }

    pub async fn get_vaccine(&self, vaccine_id: i64) -> DomainResult<Vaccine> {
        let mut conn = self.db.acquire().await?;
        Self::load_vaccine(&mut conn, vaccine_id).await
    }

    pub async fn update_vaccine(&self, vaccine_id: i64, request: UpdateVaccineRequest) -> DomainResult<Vaccine> {
        info!("Updating vaccine: {}", vaccine_id);

        let mut errors = FieldErrors::new();
        errors.optional_text("name", request.name.as_deref(), 100);
        errors.optional_text("disease_prevented", request.disease_prevented.as_deref(), 200);
        if let Some(dose_count) = request.dose_count {
            errors.require_positive("dose_count", dose_count);
        }
        if let Some(min_age_months) = request.min_age_months {
            errors.require_non_negative("min_age_months", min_age_months);
        }
        errors.into_result()?;

        let mut tx = self.db.begin().await?;
        let mut vaccine = Self::load_vaccine(&mut tx, vaccine_id).await?;

        if let Some(name) = request.name {
            let name = name.trim().to_string();
            if !name.eq_ignore_ascii_case(&vaccine.name)
                && vaccine_repository::name_in_use(&mut *tx, &name, Some(vaccine_id)).await?
            {
                return Err(DomainError::duplicate(format!("A vaccine named {} already exists", name)));
            }
            vaccine.name = name;
        }
        if let Some(disease_prevented) = request.disease_prevented {
            vaccine.disease_prevented = disease_prevented.trim().to_string();
        }
        if request.manufacturer.is_some() {
            vaccine.manufacturer = clean_optional(request.manufacturer);
        }
        if request.description.is_some() {
            vaccine.description = clean_optional(request.description);
        }
        if let Some(dose_count) = request.dose_count {
            vaccine.dose_count = dose_count;
        }
        if let Some(min_age_months) = request.min_age_months {
            vaccine.min_age_months = min_age_months;
        }
        if let Some(min_storage_temp) = request.min_storage_temp {
            vaccine.min_storage_temp = min_storage_temp;
        }
        if let Some(max_storage_temp) = request.max_storage_temp {
            vaccine.max_storage_temp = max_storage_temp;
        }

        // The range is checked against the merged values
        let mut errors = FieldErrors::new();
        check_temperatures(&mut errors, vaccine.min_storage_temp, vaccine.max_storage_temp);
        errors.into_result()?;

        vaccine.updated_at = Utc::now();
        vaccine_repository::update(&mut *tx, &vaccine).await?;
        tx.commit().await?;

        info!("Updated vaccine: {}", vaccine_id);
        Ok(vaccine)
    }

    pub async fn set_active(&self, vaccine_id: i64, active: bool) -> DomainResult<Vaccine> {
        info!("Setting vaccine {} active={}", vaccine_id, active);

        let mut tx = self.db.begin().await?;
        let mut vaccine = Self::load_vaccine(&mut tx, vaccine_id).await?;

        if vaccine.active != active {
            vaccine.active = active;
            vaccine.updated_at = Utc::now();
            vaccine_repository::update(&mut *tx, &vaccine).await?;
        }
        tx.commit().await?;

        Ok(vaccine)
    }

    /// Refused while any record, batch, schedule or appointment points at the vaccine
    pub async fn delete_vaccine(&self, vaccine_id: i64) -> DomainResult<()> {
        info!("Deleting vaccine: {}", vaccine_id);

        let mut tx = self.db.begin().await?;
        Self::load_vaccine(&mut tx, vaccine_id).await?;

        if vaccine_repository::is_referenced(&mut *tx, vaccine_id).await? {
            warn!("Vaccine {} is still referenced, refusing delete", vaccine_id);
            return Err(DomainError::business(format!(
                "Vaccine {} is referenced by records, inventory, schedules or appointments; deactivate it instead",
                vaccine_id
            )));
        }

        vaccine_repository::delete(&mut *tx, vaccine_id).await?;
        tx.commit().await?;

        info!("Deleted vaccine: {}", vaccine_id);
        Ok(())
    }

    pub async fn list_vaccines(&self) -> DomainResult<Vec<Vaccine>> {
        let mut conn = self.db.acquire().await?;
        Ok(vaccine_repository::list(&mut conn).await?)
    }

    pub async fn list_active_vaccines(&self) -> DomainResult<Vec<Vaccine>> {
        let mut conn = self.db.acquire().await?;
        Ok(vaccine_repository::list_active(&mut conn).await?)
    }

    pub async fn search_by_disease(&self, disease: &str) -> DomainResult<Vec<Vaccine>> {
        if disease.trim().is_empty() {
            let mut errors = FieldErrors::new();
            errors.add("disease", "must not be empty");
            errors.into_result()?;
        }

        let mut conn = self.db.acquire().await?;
        Ok(vaccine_repository::search_by_disease(&mut conn, disease).await?)
    }

    /// Active vaccines a child of `age_months` is old enough to receive
    pub async fn list_for_age(&self, age_months: i32) -> DomainResult<Vec<Vaccine>> {
        if age_months < 0 {
            return Err(DomainError::business("Age in months cannot be negative"));
        }

        let mut conn = self.db.acquire().await?;
        Ok(vaccine_repository::list_applicable_at_age(&mut conn, age_months).await?)
    }

    async fn load_vaccine(conn: &mut sqlx::SqliteConnection, vaccine_id: i64) -> DomainResult<Vaccine> {
        vaccine_repository::find_by_id(conn, vaccine_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vaccine", vaccine_id))
    }
}

fn check_temperatures(errors: &mut FieldErrors, min: f64, max: f64) {
    if min > max {
        errors.add("min_storage_temp", "must not be greater than max_storage_temp");
    }
}
