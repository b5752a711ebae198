use shared::{Vaccine as SharedVaccine, VaccineListResponse};

use crate::domain::models::Vaccine as DomainVaccine;

pub struct VaccineMapper;

impl VaccineMapper {
    pub fn to_dto(domain: DomainVaccine) -> SharedVaccine {
        SharedVaccine {
            id: domain.id,
            name: domain.name,
            disease_prevented: domain.disease_prevented,
            manufacturer: domain.manufacturer,
            description: domain.description,
            dose_count: domain.dose_count,
            min_age_months: domain.min_age_months,
            min_storage_temp: domain.min_storage_temp,
            max_storage_temp: domain.max_storage_temp,
            active: domain.active,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }

    pub fn to_list_dto(vaccines: Vec<DomainVaccine>) -> VaccineListResponse {
        VaccineListResponse {
            vaccines: vaccines.into_iter().map(Self::to_dto).collect(),
        }
    }
}
