//! Conversions from domain models to the `shared` wire types.

pub mod appointment_mapper;
pub mod child_mapper;
pub mod guardian_mapper;
pub mod inventory_mapper;
pub mod notification_mapper;
pub mod schedule_mapper;
pub mod user_mapper;
pub mod vaccination_record_mapper;
pub mod vaccine_mapper;

pub use appointment_mapper::AppointmentMapper;
pub use child_mapper::ChildMapper;
pub use guardian_mapper::GuardianMapper;
pub use inventory_mapper::InventoryMapper;
pub use notification_mapper::NotificationMapper;
pub use schedule_mapper::ScheduleMapper;
pub use user_mapper::UserMapper;
pub use vaccination_record_mapper::VaccinationRecordMapper;
pub use vaccine_mapper::VaccineMapper;
