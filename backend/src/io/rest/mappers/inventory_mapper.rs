use shared::{InventoryBatch, InventoryListResponse};

use crate::domain::models::VaccineInventory;

pub struct InventoryMapper;

impl InventoryMapper {
    pub fn to_dto(domain: VaccineInventory) -> InventoryBatch {
        InventoryBatch {
            id: domain.id,
            vaccine_id: domain.vaccine_id,
            batch_number: domain.batch_number,
            quantity: domain.quantity,
            expiration_date: domain.expiration_date,
            received_date: domain.received_date,
            supplier: domain.supplier,
            status: domain.status,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }

    pub fn to_list_dto(batches: Vec<VaccineInventory>) -> InventoryListResponse {
        InventoryListResponse {
            batches: batches.into_iter().map(Self::to_dto).collect(),
        }
    }
}
