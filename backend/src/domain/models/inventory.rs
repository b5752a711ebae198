//! A received vaccine batch and its quantity rules.
//!
//! Quantity changes only ever move a batch between AVAILABLE and DEPLETED.
//! RESERVED, EXPIRED and RECALLED are left untouched until someone sets a
//! status explicitly, and nothing expires a batch automatically.

use chrono::{DateTime, NaiveDate, Utc};
use shared::InventoryStatus;

use crate::domain::error::{DomainError, DomainResult};

#[derive(Debug, Clone, PartialEq)]
pub struct VaccineInventory {
    pub id: i64,
    pub vaccine_id: i64,
    pub batch_number: String,
    pub quantity: i32,
    pub expiration_date: NaiveDate,
    pub received_date: NaiveDate,
    pub supplier: Option<String>,
    pub status: InventoryStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VaccineInventory {
    /// Status for a batch that is being received with `quantity` doses
    pub fn initial_status(quantity: i32) -> InventoryStatus {
        if quantity == 0 {
            InventoryStatus::Depleted
        } else {
            InventoryStatus::Available
        }
    }

    /// Take `amount` doses out of the batch. Fails without changing anything
    /// if the amount is negative or exceeds the remaining quantity.
    pub fn decrease(&mut self, amount: i32) -> DomainResult<()> {
        if amount < 0 {
            return Err(DomainError::business("Amount to decrease cannot be negative"));
        }
        if amount > self.quantity {
            return Err(DomainError::business(format!(
                "Insufficient stock in batch {}: requested {}, available {}",
                self.batch_number, amount, self.quantity
            )));
        }

        self.quantity -= amount;
        self.apply_quantity_status();
        Ok(())
    }

    /// Add `amount` doses to the batch
    pub fn increase(&mut self, amount: i32) -> DomainResult<()> {
        if amount < 0 {
            return Err(DomainError::business("Amount to increase cannot be negative"));
        }

        self.quantity = self
            .quantity
            .checked_add(amount)
            .ok_or_else(|| DomainError::business("Resulting quantity is too large"))?;
        self.apply_quantity_status();
        Ok(())
    }

    /// Overwrite the quantity, e.g. after a physical count
    pub fn set_quantity(&mut self, quantity: i32) -> DomainResult<()> {
        if quantity < 0 {
            return Err(DomainError::business("Quantity cannot be negative"));
        }

        self.quantity = quantity;
        self.apply_quantity_status();
        Ok(())
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiration_date < today
    }

    /// Whether doses can be drawn from this batch today
    pub fn is_usable(&self, today: NaiveDate) -> bool {
        self.status == InventoryStatus::Available && self.quantity > 0 && !self.is_expired(today)
    }

    fn apply_quantity_status(&mut self) {
        match self.status {
            InventoryStatus::Available if self.quantity == 0 => {
                self.status = InventoryStatus::Depleted;
            }
            InventoryStatus::Depleted if self.quantity > 0 => {
                self.status = InventoryStatus::Available;
            }
            _ => {}
        }
    }
}
