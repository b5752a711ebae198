use shared::{ScheduleListResponse, VaccinationSchedule as SharedSchedule};

use crate::domain::models::VaccinationSchedule as DomainSchedule;

pub struct ScheduleMapper;

impl ScheduleMapper {
    pub fn to_dto(domain: DomainSchedule) -> SharedSchedule {
        SharedSchedule {
            id: domain.id,
            vaccine_id: domain.vaccine_id,
            country_code: domain.country_code,
            dose_number: domain.dose_number,
            age_months: domain.age_months,
            mandatory: domain.mandatory,
            notes: domain.notes,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }

    pub fn to_list_dto(schedules: Vec<DomainSchedule>) -> ScheduleListResponse {
        ScheduleListResponse {
            schedules: schedules.into_iter().map(Self::to_dto).collect(),
        }
    }
}
