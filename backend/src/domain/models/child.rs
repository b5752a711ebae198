use chrono::{DateTime, Datelike, NaiveDate, Utc};
use shared::Gender;

#[derive(Debug, Clone, PartialEq)]
pub struct Child {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub document_number: String,
    pub birth_date: NaiveDate,
    pub gender: Gender,
    pub blood_type: Option<String>,
    pub birth_weight_kg: Option<f64>,
    pub birth_height_cm: Option<f64>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Child {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn age_in_months(&self, today: NaiveDate) -> u32 {
        months_between(self.birth_date, today)
    }
}

/// Whole calendar months from `from` to `to`.
///
/// A month only counts once the day-of-month of `from` has been reached, so
/// 2024-01-31 to 2024-02-29 is 0 months. Returns 0 when `to` precedes `from`.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> u32 {
    if to <= from {
        return 0;
    }

    let mut months = (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32;
    if to.day() < from.day() {
        months -= 1;
    }

    months.max(0) as u32
}
