use shared::{VaccinationRecord as SharedRecord, VaccinationRecordListResponse};

use crate::domain::models::VaccinationRecord as DomainRecord;

pub struct VaccinationRecordMapper;

impl VaccinationRecordMapper {
    pub fn to_dto(domain: DomainRecord) -> SharedRecord {
        SharedRecord {
            id: domain.id,
            child_id: domain.child_id,
            vaccine_id: domain.vaccine_id,
            dose_number: domain.dose_number,
            batch_number: domain.batch_number,
            administered_by: domain.administered_by,
            administered_on: domain.administered_on,
            next_dose_date: domain.next_dose_date,
            site: domain.site,
            notes: domain.notes,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }

    pub fn to_list_dto(records: Vec<DomainRecord>) -> VaccinationRecordListResponse {
        VaccinationRecordListResponse {
            records: records.into_iter().map(Self::to_dto).collect(),
        }
    }
}
