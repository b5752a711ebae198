use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct VaccinationSchedule {
    pub id: i64,
    pub vaccine_id: i64,
    /// Upper-case ISO 3166 alpha-2/alpha-3 code
    pub country_code: String,
    pub dose_number: i32,
    pub age_months: i32,
    pub mandatory: bool,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
