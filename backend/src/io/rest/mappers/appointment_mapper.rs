use shared::{Appointment as SharedAppointment, AppointmentListResponse};

use crate::domain::models::Appointment as DomainAppointment;

pub struct AppointmentMapper;

impl AppointmentMapper {
    pub fn to_dto(domain: DomainAppointment) -> SharedAppointment {
        SharedAppointment {
            id: domain.id,
            child_id: domain.child_id,
            scheduled_at: domain.scheduled_at,
            reason: domain.reason,
            status: domain.status,
            created_by: domain.created_by,
            assigned_to: domain.assigned_to,
            vaccine_id: domain.vaccine_id,
            notes: domain.notes,
            created_at: domain.created_at,
            updated_at: domain.updated_at,
        }
    }

    pub fn to_list_dto(appointments: Vec<DomainAppointment>) -> AppointmentListResponse {
        AppointmentListResponse {
            appointments: appointments.into_iter().map(Self::to_dto).collect(),
        }
    }
}
