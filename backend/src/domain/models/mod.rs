pub mod appointment;
pub mod child;
pub mod guardian;
pub mod inventory;
pub mod notification;
pub mod schedule;
pub mod user;
pub mod vaccination_record;
pub mod vaccine;

pub use appointment::Appointment;
pub use child::Child;
pub use guardian::Guardian;
pub use inventory::VaccineInventory;
pub use notification::Notification;
pub use schedule::VaccinationSchedule;
pub use user::User;
pub use vaccination_record::VaccinationRecord;
pub use vaccine::Vaccine;
