use chrono::{DateTime, Utc};
use shared::AppointmentStatus;

use crate::domain::error::{DomainError, DomainResult};

#[derive(Debug, Clone, PartialEq)]
pub struct Appointment {
    pub id: i64,
    pub child_id: i64,
    pub scheduled_at: DateTime<Utc>,
    pub reason: String,
    pub status: AppointmentStatus,
    pub created_by: i64,
    pub assigned_to: Option<i64>,
    pub vaccine_id: Option<i64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Any status may follow any other; confirm/complete/cancel all end up here.
    pub fn set_status(&mut self, status: AppointmentStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }

    pub fn ensure_in_future(scheduled_at: DateTime<Utc>, now: DateTime<Utc>) -> DomainResult<()> {
        if scheduled_at <= now {
            return Err(DomainError::business("Appointment date must be in the future"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn appointment(status: AppointmentStatus) -> Appointment {
        let now = Utc::now();
        Appointment {
            id: 1,
            child_id: 1,
            scheduled_at: now + Duration::days(1),
            reason: "Checkup".to_string(),
            status,
            created_by: 1,
            assigned_to: None,
            vaccine_id: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_any_transition_is_allowed() {
        let mut a = appointment(AppointmentStatus::Scheduled);
        a.set_status(AppointmentStatus::Completed, Utc::now());
        assert_eq!(a.status, AppointmentStatus::Completed);

        a.set_status(AppointmentStatus::Scheduled, Utc::now());
        assert_eq!(a.status, AppointmentStatus::Scheduled);
    }

    #[test]
    fn test_future_check_is_strict() {
        let now = Utc::now();
        assert!(Appointment::ensure_in_future(now + Duration::minutes(1), now).is_ok());
        assert!(Appointment::ensure_in_future(now, now).is_err());
        assert!(Appointment::ensure_in_future(now - Duration::days(1), now).is_err());
    }
}
