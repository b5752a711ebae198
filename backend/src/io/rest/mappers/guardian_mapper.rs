use shared::{Guardian as SharedGuardian, GuardianListResponse};

use crate::domain::models::Guardian as DomainGuardian;

pub struct GuardianMapper;

impl GuardianMapper {
    pub fn to_dto(domain: DomainGuardian) -> SharedGuardian {
        SharedGuardian {
            id: domain.id,
            first_name: domain.first_name,
            last_name: domain.last_name,
            document_number: domain.document_number,
            phone: domain.phone,
            email: domain.email,
            address: domain.address,
            relationship: domain.relationship,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }

    pub fn to_list_dto(guardians: Vec<DomainGuardian>) -> GuardianListResponse {
        GuardianListResponse {
            guardians: guardians.into_iter().map(Self::to_dto).collect(),
        }
    }
}
