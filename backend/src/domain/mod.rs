//! # Domain Module
//!
//! Business rules for the immunization records service. Each service owns one
//! entity, validates requests, resolves references and writes through the
//! storage repositories inside a single transaction, so a failed rule never
//! leaves a partial write behind.
//!
//! Services hand back domain models; the REST layer maps them to the wire
//! DTOs in `shared`.

pub mod appointment_service;
pub mod auth_service;
pub mod child_service;
pub mod error;
pub mod guardian_service;
pub mod inventory_service;
pub mod models;
pub mod notification_service;
pub mod schedule_service;
pub mod user_service;
pub mod vaccination_record_service;
pub mod vaccine_service;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use appointment_service::AppointmentService;
pub use auth_service::{AuthService, Claims};
pub use child_service::ChildService;
pub use error::{DomainError, DomainResult};
pub use guardian_service::GuardianService;
pub use inventory_service::InventoryService;
pub use notification_service::NotificationService;
pub use schedule_service::ScheduleService;
pub use user_service::UserService;
pub use vaccination_record_service::VaccinationRecordService;
pub use vaccine_service::VaccineService;
