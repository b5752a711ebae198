//! Vaccine stock kept per received batch.
//!
//! Quantity changes go through [`VaccineInventory`], which owns the
//! AVAILABLE/DEPLETED auto-transitions. Only [`InventoryService::update_status`]
//! sets a status explicitly, and nothing here expires batches on its own.

use chrono::{Duration, NaiveDate, Utc};
use shared::{CreateInventoryRequest, InventoryStatus};
use tracing::{info, warn};

use crate::domain::error::{DomainError, DomainResult};
use crate::domain::models::VaccineInventory;
use crate::domain::validation::{clean_optional, FieldErrors};
use crate::storage::repositories::{inventory_repository, vaccine_repository};
use crate::storage::DbConnection;

#[derive(Clone)]
pub struct InventoryService {
    db: DbConnection,
}

impl InventoryService {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Register a received batch
    pub async fn create_batch(&self, request: CreateInventoryRequest) -> DomainResult<VaccineInventory> {
        info!(
            "Adding batch {} of vaccine {} with quantity {}",
            request.batch_number, request.vaccine_id, request.quantity
        );

        let received_date = request.received_date.unwrap_or_else(|| Utc::now().date_naive());

        let mut errors = FieldErrors::new();
        errors.require_text("batch_number", &request.batch_number, 50);
        errors.require_non_negative("quantity", request.quantity);
        errors.optional_text("supplier", request.supplier.as_deref(), 100);
        if request.expiration_date < received_date {
            errors.add("expiration_date", "must not be before received_date");
        }
        errors.into_result()?;

        let mut tx = self.db.begin().await?;

        if vaccine_repository::find_by_id(&mut *tx, request.vaccine_id).await?.is_none() {
            return Err(DomainError::not_found("Vaccine", request.vaccine_id));
        }

        let batch_number = request.batch_number.trim().to_string();
        if inventory_repository::batch_exists(&mut *tx, request.vaccine_id, &batch_number).await? {
            return Err(DomainError::duplicate(format!(
                "Batch {} already exists for vaccine {}",
                batch_number, request.vaccine_id
            )));
        }

        let now = Utc::now();
        let mut batch = VaccineInventory {
            id: 0,
            vaccine_id: request.vaccine_id,
            batch_number,
            quantity: request.quantity,
            expiration_date: request.expiration_date,
            received_date,
            supplier: clean_optional(request.supplier),
            status: VaccineInventory::initial_status(request.quantity),
            created_at: now,
            updated_at: now,
        };
        batch.id = inventory_repository::insert(&mut *tx, &batch).await?;
        tx.commit().await?;

        info!("Created inventory batch with ID: {} ({})", batch.id, batch.status);
        Ok(batch)
    }

    pub async fn get_batch(&self, batch_id: i64) -> DomainResult<VaccineInventory> {
        let mut conn = self.db.acquire().await?;
        Self::load_batch(&mut conn, batch_id).await
    }

    pub async fn list_batches(&self) -> DomainResult<Vec<VaccineInventory>> {
        let mut conn = self.db.acquire().await?;
        Ok(inventory_repository::list(&mut conn).await?)
    }

    pub async fn list_by_vaccine(&self, vaccine_id: i64) -> DomainResult<Vec<VaccineInventory>> {
        let mut conn = self.db.acquire().await?;
        Self::ensure_vaccine(&mut conn, vaccine_id).await?;
        Ok(inventory_repository::list_by_vaccine(&mut conn, vaccine_id).await?)
    }

    pub async fn list_by_status(&self, status: InventoryStatus) -> DomainResult<Vec<VaccineInventory>> {
        let mut conn = self.db.acquire().await?;
        Ok(inventory_repository::list_by_status(&mut conn, status).await?)
    }

    /// Usable batches for a vaccine, earliest expiration first
    pub async fn list_available(&self, vaccine_id: i64, today: NaiveDate) -> DomainResult<Vec<VaccineInventory>> {
        let mut conn = self.db.acquire().await?;
        Self::ensure_vaccine(&mut conn, vaccine_id).await?;
        Ok(inventory_repository::list_usable_for_vaccine(&mut conn, vaccine_id, today).await?)
    }

    pub async fn total_available(&self, vaccine_id: i64, today: NaiveDate) -> DomainResult<i64> {
        let mut conn = self.db.acquire().await?;
        Self::ensure_vaccine(&mut conn, vaccine_id).await?;
        Ok(inventory_repository::total_usable_for_vaccine(&mut conn, vaccine_id, today).await?)
    }

    /// Batches with stock left that expire within `days` of `today`
    pub async fn list_expiring(&self, today: NaiveDate, days: i64) -> DomainResult<Vec<VaccineInventory>> {
        if !(0..=3650).contains(&days) {
            return Err(DomainError::business("Days must be between 0 and 3650"));
        }

        let until = today + Duration::days(days);
        let mut conn = self.db.acquire().await?;
        Ok(inventory_repository::list_expiring_between(&mut conn, today, until).await?)
    }

    /// AVAILABLE batches holding fewer than `threshold` doses
    pub async fn list_low_stock(&self, threshold: i32) -> DomainResult<Vec<VaccineInventory>> {
        if threshold < 1 {
            return Err(DomainError::business("Threshold must be at least 1"));
        }

        let mut conn = self.db.acquire().await?;
        Ok(inventory_repository::list_low_stock(&mut conn, threshold).await?)
    }

    pub async fn decrease_quantity(&self, batch_id: i64, amount: i32) -> DomainResult<VaccineInventory> {
        info!("Decreasing batch {} by {}", batch_id, amount);
        self.change_stock(batch_id, |batch| batch.decrease(amount)).await
    }

    pub async fn increase_quantity(&self, batch_id: i64, amount: i32) -> DomainResult<VaccineInventory> {
        info!("Increasing batch {} by {}", batch_id, amount);
        self.change_stock(batch_id, |batch| batch.increase(amount)).await
    }

    pub async fn set_quantity(&self, batch_id: i64, quantity: i32) -> DomainResult<VaccineInventory> {
        info!("Setting batch {} quantity to {}", batch_id, quantity);
        self.change_stock(batch_id, |batch| batch.set_quantity(quantity)).await
    }

    /// Explicit status change; quantity is left alone
    pub async fn update_status(&self, batch_id: i64, status: InventoryStatus) -> DomainResult<VaccineInventory> {
        info!("Setting batch {} status to {}", batch_id, status);
        self.change_stock(batch_id, |batch| {
            batch.status = status;
            Ok(())
        })
        .await
    }

    pub async fn delete_batch(&self, batch_id: i64) -> DomainResult<()> {
        info!("Deleting inventory batch: {}", batch_id);

        let mut tx = self.db.begin().await?;
        if !inventory_repository::delete(&mut *tx, batch_id).await? {
            return Err(DomainError::not_found("Inventory", batch_id));
        }
        tx.commit().await?;

        Ok(())
    }

    /// Load, mutate and store a batch in one transaction. A failed rule leaves
    /// the stored batch untouched.
    async fn change_stock<F>(&self, batch_id: i64, apply: F) -> DomainResult<VaccineInventory>
    where
        F: FnOnce(&mut VaccineInventory) -> DomainResult<()>,
    {
        let mut tx = self.db.begin().await?;
        let mut batch = Self::load_batch(&mut tx, batch_id).await?;
        let previous_status = batch.status;

        if let Err(e) = apply(&mut batch) {
            warn!("Stock change on batch {} rejected: {}", batch_id, e);
            return Err(e);
        }

        batch.updated_at = Utc::now();
        inventory_repository::update_stock(&mut *tx, &batch).await?;
        tx.commit().await?;

        if batch.status != previous_status {
            info!("Batch {} moved from {} to {}", batch_id, previous_status, batch.status);
        }
        Ok(batch)
    }

    async fn load_batch(conn: &mut sqlx::SqliteConnection, batch_id: i64) -> DomainResult<VaccineInventory> {
        inventory_repository::find_by_id(conn, batch_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Inventory", batch_id))
    }

    async fn ensure_vaccine(conn: &mut sqlx::SqliteConnection, vaccine_id: i64) -> DomainResult<()> {
        match vaccine_repository::find_by_id(conn, vaccine_id).await? {
            Some(_) => Ok(()),
            None => Err(DomainError::not_found("Vaccine", vaccine_id)),
        }
    }
}
