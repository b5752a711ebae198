use chrono::Utc;
use shared::{CreateGuardianRequest, UpdateGuardianRequest};
use tracing::info;

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::{Child, Guardian};
use crate::domain::validation::{clean_optional, FieldErrors};
use crate::storage::repositories::{child_repository, guardian_repository};
use crate::storage::DbConnection;

/// Service for guardians and the children they are responsible for
#[derive(Clone)]
pub struct GuardianService {
    db: DbConnection,
}

impl GuardianService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    pub async fn create_guardian(&self, request: CreateGuardianRequest) -> DomainResult<Guardian> {
        info!("Creating guardian: document={}", request.document_number);

        Self::validate_create_request(&request)?;

        let now = Utc::now();
        let mut guardian = Guardian {
            id: 0,
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            document_number: request.document_number.trim().to_string(),
            phone: request.phone.trim().to_string(),
            email: clean_optional(request.email),
            address: clean_optional(request.address),
            relationship: request.relationship.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin().await?;

        if guardian_repository::document_in_use(&mut *tx, &guardian.document_number, None).await? {
            return Err(DomainError::duplicate(format!(
                "A guardian with document number {} already exists",
                guardian.document_number
            )));
        }

        guardian.id = guardian_repository::insert(&mut *tx, &guardian).await?;
        tx.commit().await?;

        info!("Created guardian with ID: {}", guardian.id);
        Ok(guardian)
    }

    pub async fn get_guardian(&self, guardian_id: i64) -> DomainResult<Guardian> {
        let mut conn = self.db.acquire().await?;
        Self::load_guardian(&mut conn, guardian_id).await
    }

    pub async fn update_guardian(
        &self,
        guardian_id: i64,
        request: UpdateGuardianRequest,
    ) -> DomainResult<Guardian> {
        info!("Updating guardian: {}", guardian_id);

        Self::validate_update_request(&request)?;

        let mut tx = self.db.begin().await?;
        let mut guardian = Self::load_guardian(&mut tx, guardian_id).await?;

        if let Some(document_number) = request.document_number {
            let document_number = document_number.trim().to_string();
            if document_number != guardian.document_number
                && guardian_repository::document_in_use(&mut *tx, &document_number, Some(guardian_id))
                    .await?
            {
                return Err(DomainError::duplicate(format!(
                    "A guardian with document number {} already exists",
                    document_number
                )));
            }
            guardian.document_number = document_number;
        }
        if let Some(first_name) = request.first_name {
            guardian.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = request.last_name {
            guardian.last_name = last_name.trim().to_string();
        }
        if let Some(phone) = request.phone {
            guardian.phone = phone.trim().to_string();
        }
        if request.email.is_some() {
            guardian.email = clean_optional(request.email);
        }
        if request.address.is_some() {
            guardian.address = clean_optional(request.address);
        }
        if let Some(relationship) = request.relationship {
            guardian.relationship = relationship.trim().to_string();
        }
        guardian.updated_at = Utc::now();

        guardian_repository::update(&mut *tx, &guardian).await?;
        tx.commit().await?;

        info!("Updated guardian: {}", guardian_id);
        Ok(guardian)
    }

    /// Hard delete; child links and guardian notifications cascade
    pub async fn delete_guardian(&self, guardian_id: i64) -> DomainResult<()> {
        info!("Deleting guardian: {}", guardian_id);

        let mut tx = self.db.begin().await?;
        if !guardian_repository::delete(&mut *tx, guardian_id).await? {
            return Err(DomainError::not_found("Guardian", guardian_id));
        }
        tx.commit().await?;

        info!("Deleted guardian: {}", guardian_id);
        Ok(())
    }

    pub async fn list_guardians(&self) -> DomainResult<Vec<Guardian>> {
        let mut conn = self.db.acquire().await?;
        let guardians = guardian_repository::list(&mut conn).await?;
        info!("Found {} guardians", guardians.len());
        Ok(guardians)
    }

    pub async fn search_guardians(&self, name: &str) -> DomainResult<Vec<Guardian>> {
        if name.trim().is_empty() {
            let mut errors = FieldErrors::new();
            errors.add("name", "must not be empty");
            errors.into_result()?;
        }

        let mut conn = self.db.acquire().await?;
        Ok(guardian_repository::search_by_name(&mut conn, name).await?)
    }

    pub async fn find_by_document(&self, document_number: &str) -> DomainResult<Guardian> {
        let mut conn = self.db.acquire().await?;
        guardian_repository::find_by_document(&mut conn, document_number.trim())
            .await?
            .ok_or_else(|| DomainError::not_found("Guardian", document_number.trim()))
    }

    /// Guardians with no active (not soft-deleted) child linked
    pub async fn list_without_children(&self) -> DomainResult<Vec<Guardian>> {
        let mut conn = self.db.acquire().await?;
        Ok(guardian_repository::list_without_active_children(&mut conn).await?)
    }

    pub async fn list_children(&self, guardian_id: i64) -> DomainResult<Vec<Child>> {
        let mut conn = self.db.acquire().await?;
        Self::load_guardian(&mut conn, guardian_id).await?;
        Ok(child_repository::list_active_by_guardian(&mut conn, guardian_id).await?)
    }

    pub async fn count_children(&self, guardian_id: i64) -> DomainResult<i64> {
        let mut conn = self.db.acquire().await?;
        Self::load_guardian(&mut conn, guardian_id).await?;
        Ok(child_repository::count_active_by_guardian(&mut conn, guardian_id).await?)
    }

    async fn load_guardian(conn: &mut sqlx::SqliteConnection, guardian_id: i64) -> DomainResult<Guardian> {
        guardian_repository::find_by_id(conn, guardian_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Guardian", guardian_id))
    }

    fn validate_create_request(request: &CreateGuardianRequest) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        errors.require_text("first_name", &request.first_name, 100);
        errors.require_text("last_name", &request.last_name, 100);
        errors.require_text("document_number", &request.document_number, 50);
        errors.require_text("phone", &request.phone, 30);
        errors.require_text("relationship", &request.relationship, 50);
        check_email(&mut errors, request.email.as_deref());
        errors.into_result()
    }

    fn validate_update_request(request: &UpdateGuardianRequest) -> DomainResult<()> {
        let mut errors = FieldErrors::new();
        errors.optional_text("first_name", request.first_name.as_deref(), 100);
        errors.optional_text("last_name", request.last_name.as_deref(), 100);
        errors.optional_text("document_number", request.document_number.as_deref(), 50);
        errors.optional_text("phone", request.phone.as_deref(), 30);
        errors.optional_text("relationship", request.relationship.as_deref(), 50);
        check_email(&mut errors, request.email.as_deref());
        errors.into_result()
    }
}

fn check_email(errors: &mut FieldErrors, email: Option<&str>) {
    if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
        if !email.contains('@') {
            errors.add("email", "must be a valid email address");
        }
    }
}
