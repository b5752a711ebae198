use chrono::{NaiveDate, Utc};
use shared::{CreateChildRequest, UpdateChildRequest};
use tracing::{info, warn};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{Child, Guardian};
use crate::domain::validation::{clean_optional, FieldErrors};
use crate::storage::repositories::{association_repository, child_repository, guardian_repository};
use crate::storage::DbConnection;

const BLOOD_TYPES: &[&str] = &["A+", "A-", "B+", "B-", "AB+", "AB-", "O+", "O-"];

/// Service for registering children and managing their guardian links
#[derive(Clone)]
pub struct ChildService {
    db: DbConnection,
}

impl ChildService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Register a child, linking any initial guardians in the same transaction
    pub async fn create_child(&self, request: CreateChildRequest) -> DomainResult<Child> {
        info!(
            "Creating child: document={}, birth_date={}",
            request.document_number, request.birth_date
        );

        let today = Utc::now().date_naive();
        Self::validate_create_request(&request, today)?;

        let now = Utc::now();
        let mut child = Child {
            id: 0,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            document_number: request.document_number.trim().to_string(),
            birth_date: request.birth_date,
            gender: request.gender,
            blood_type: clean_optional(request.blood_type).map(|b| b.to_uppercase()),
            birth_weight_kg: request.birth_weight_kg,
            birth_height_cm: request.birth_height_cm,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin().await?;

        if child_repository::document_in_use(&mut *tx, &child.document_number, None).await? {
            return Err(DomainError::duplicate(format!(
                "A child with document number {} already exists",
                child.document_number
            )));
        }

        child.id = child_repository::insert(&mut *tx, &child).await?;

        // Link initial guardians; an unknown id aborts the whole registration
        let mut guardian_ids = request.guardian_ids;
        guardian_ids.sort_unstable();
        guardian_ids.dedup();
        for guardian_id in guardian_ids {
            if guardian_repository::find_by_id(&mut *tx, guardian_id).await?.is_none() {
                return Err(DomainError::not_found("Guardian", guardian_id));
            }
            association_repository::link(&mut *tx, child.id, guardian_id, now).await?;
        }

        tx.commit().await?;

        info!("Created child {} with ID: {}", child.full_name(), child.id);
        Ok(child)
    }

    /// Get a child by id. Soft-deleted children are still returned.
    pub async fn get_child(&self, child_id: i64) -> DomainResult<Child> {
        let mut conn = self.db.acquire().await?;
        Self::load_child(&mut conn, child_id).await
    }

    pub async fn update_child(&self, child_id: i64, request: UpdateChildRequest) -> DomainResult<Child> {
        info!("Updating child: {}", child_id);

        let today = Utc::now().date_naive();
        Self::validate_update_request(&request, today)?;

        let mut tx = self.db.begin().await?;

        let mut child = Self::load_child(&mut tx, child_id).await?;
        if child.is_deleted() {
            return Err(DomainError::business(format!(
                "Child {} has been deleted and cannot be updated",
                child_id
            )));
        }

        if let Some(document_number) = request.document_number {
            let document_number = document_number.trim().to_string();
            if document_number != child.document_number
                && child_repository::document_in_use(&mut *tx, &document_number, Some(child_id)).await?
            {
                return Err(DomainError::duplicate(format!(
                    "A child with document number {} already exists",
                    document_number
                )));
            }
            child.document_number = document_number;
        }
        if let Some(first_name) = request.first_name {
            child.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = request.last_name {
            child.last_name = last_name.trim().to_string();
        }
        if let Some(birth_date) = request.birth_date {
            child.birth_date = birth_date;
        }
        if let Some(gender) = request.gender {
            child.gender = gender;
        }
        if request.blood_type.is_some() {
            child.blood_type = clean_optional(request.blood_type).map(|b| b.to_uppercase());
        }
        if request.birth_weight_kg.is_some() {
            child.birth_weight_kg = request.birth_weight_kg;
        }
        if request.birth_height_cm.is_some() {
            child.birth_height_cm = request.birth_height_cm;
        }
        child.updated_at = Utc::now();

        child_repository::update(&mut *tx, &child).await?;
        tx.commit().await?;

        info!("Updated child: {}", child_id);
        Ok(child)
    }

    /// Soft delete: the row stays, but active queries stop returning it
    pub async fn delete_child(&self, child_id: i64) -> DomainResult<()> {
        info!("Soft deleting child: {}", child_id);

        let mut tx = self.db.begin().await?;

        let mut child = Self::load_child(&mut tx, child_id).await?;
        if child.is_deleted() {
            return Err(DomainError::business(format!("Child {} is already deleted", child_id)));
        }

        let now = Utc::now();
        child.deleted_at = Some(now);
        child.updated_at = now;
        child_repository::update(&mut *tx, &child).await?;
        tx.commit().await?;

        info!("Soft deleted child: {}", child_id);
        Ok(())
    }

    pub async fn restore_child(&self, child_id: i64) -> DomainResult<Child> {
        info!("Restoring child: {}", child_id);

        let mut tx = self.db.begin().await?;

        let mut child = Self::load_child(&mut tx, child_id).await?;
        if !child.is_deleted() {
            return Err(DomainError::business(format!("Child {} is not deleted", child_id)));
        }

        child.deleted_at = None;
        child.updated_at = Utc::now();
        child_repository::update(&mut *tx, &child).await?;
        tx.commit().await?;

        info!("Restored child: {}", child_id);
        Ok(child)
    }

    pub async fn list_children(&self) -> DomainResult<Vec<Child>> {
        let mut conn = self.db.acquire().await?;
        let children = child_repository::list_active(&mut conn).await?;
        info!("Found {} active children", children.len());
        Ok(children)
    }

    /// Case-insensitive match on first or last name
    pub async fn search_children(&self, name: &str) -> DomainResult<Vec<Child>> {
        if name.trim().is_empty() {
            let mut errors = FieldErrors::new();
            errors.add("name", "must not be empty");
            errors.into_result()?;
        }

        let mut conn = self.db.acquire().await?;
        let children = child_repository::search_active_by_name(&mut conn, name).await?;
        info!("Search '{}' matched {} children", name.trim(), children.len());
        Ok(children)
    }

    pub async fn find_by_document(&self, document_number: &str) -> DomainResult<Child> {
        let mut conn = self.db.acquire().await?;
        child_repository::find_active_by_document(&mut conn, document_number.trim())
            .await?
            .ok_or_else(|| DomainError::not_found("Child", document_number.trim()))
    }

    pub async fn list_born_between(&self, from: NaiveDate, to: NaiveDate) -> DomainResult<Vec<Child>> {
        if from > to {
            return Err(DomainError::business("Start date must not be after end date"));
        }

        let mut conn = self.db.acquire().await?;
        Ok(child_repository::list_active_born_between(&mut conn, from, to).await?)
    }

    pub async fn list_without_guardians(&self) -> DomainResult<Vec<Child>> {
        let mut conn = self.db.acquire().await?;
        Ok(child_repository::list_active_without_guardians(&mut conn).await?)
    }

    /// Age in whole months as of `today`
    pub async fn age_in_months(&self, child_id: i64, today: NaiveDate) -> DomainResult<(Child, u32)> {
        let child = self.get_child(child_id).await?;
        let months = child.age_in_months(today);
        Ok((child, months))
    }

    pub async fn link_guardian(&self, child_id: i64, guardian_id: i64) -> DomainResult<()> {
        info!("Linking guardian {} to child {}", guardian_id, child_id);

        let mut tx = self.db.begin().await?;

        let child = Self::load_child(&mut tx, child_id).await?;
        if child.is_deleted() {
            return Err(DomainError::business(format!(
                "Cannot link a guardian to deleted child {}",
                child_id
            )));
        }
        if guardian_repository::find_by_id(&mut *tx, guardian_id).await?.is_none() {
            return Err(DomainError::not_found("Guardian", guardian_id));
        }
        if association_repository::is_linked(&mut *tx, child_id, guardian_id).await? {
            return Err(DomainError::business(format!(
                "Guardian {} is already linked to child {}",
                guardian_id, child_id
            )));
        }

        association_repository::link(&mut *tx, child_id, guardian_id, Utc::now()).await?;
        tx.commit().await?;

        Ok(())
    }

    pub async fn unlink_guardian(&self, child_id: i64, guardian_id: i64) -> DomainResult<()> {
        info!("Unlinking guardian {} from child {}", guardian_id, child_id);

        let mut tx = self.db.begin().await?;

        Self::load_child(&mut tx, child_id).await?;
        if guardian_repository::find_by_id(&mut *tx, guardian_id).await?.is_none() {
            return Err(DomainError::not_found("Guardian", guardian_id));
        }

        if !association_repository::unlink(&mut *tx, child_id, guardian_id).await? {
            warn!("Guardian {} was not linked to child {}", guardian_id, child_id);
            return Err(DomainError::business(format!(
                "Guardian {} is not linked to child {}",
                guardian_id, child_id
            )));
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn list_guardians(&self, child_id: i64) -> DomainResult<Vec<Guardian>> {
        let mut conn = self.db.acquire().await?;
        Self::load_child(&mut conn, child_id).await?;
        Ok(guardian_repository::list_by_child(&mut conn, child_id).await?)
    }

    pub async fn count_guardians(&self, child_id: i64) -> DomainResult<i64> {
        let mut conn = self.db.acquire().await?;
        Self::load_child(&mut conn, child_id).await?;
        Ok(guardian_repository::count_by_child(&mut conn, child_id).await?)
    }

    async fn load_child(conn: &mut sqlx::SqliteConnection, child_id: i64) -> DomainResult<Child> {
        child_repository::find_by_id(conn, child_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Child", child_id))
    }

    fn validate_create_request(request: &CreateChildRequest, today: NaiveDate) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        errors.require_text("first_name", &request.first_name, 100);
        errors.require_text("last_name", &request.last_name, 100);
        errors.require_text("document_number", &request.document_number, 50);
        check_birth_date(&mut errors, request.birth_date, today);
        check_measurements(
            &mut errors,
            request.blood_type.as_deref(),
            request.birth_weight_kg,
            request.birth_height_cm,
        );
        errors.into_result()
    }

    fn validate_update_request(request: &UpdateChildRequest, today: NaiveDate) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        errors.optional_text("first_name", request.first_name.as_deref(), 100);
        errors.optional_text("last_name", request.last_name.as_deref(), 100);
        errors.optional_text("document_number", request.document_number.as_deref(), 50);
        if let Some(birth_date) = request.birth_date {
            check_birth_date(&mut errors, birth_date, today);
        }
        check_measurements(
            &mut errors,
            request.blood_type.as_deref(),
            request.birth_weight_kg,
            request.birth_height_cm,
        );
        errors.into_result()
    }
}

fn check_birth_date(errors: &mut FieldErrors, birth_date: NaiveDate, today: NaiveDate) {
    if birth_date > today {
        errors.add("birth_date", "must not be in the future");
    }
}

fn check_measurements(
    errors: &mut FieldErrors,
    blood_type: Option<&str>,
    weight_kg: Option<f64>,
    height_cm: Option<f64>,
) {
    if let Some(blood_type) = blood_type.map(str::trim).filter(|b| !b.is_empty()) {
        if !BLOOD_TYPES.contains(&blood_type.to_uppercase().as_str()) {
            errors.add("blood_type", "must be one of A+, A-, B+, B-, AB+, AB-, O+, O-");
        }
    }
    if matches!(weight_kg, Some(w) if !(w > 0.0)) {
        errors.add("birth_weight_kg", "must be positive");
    }
    if matches!(height_cm, Some(h) if !(h > 0.0)) {
        errors.add("birth_height_cm", "must be positive");
    }
}
