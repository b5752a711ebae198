use chrono::{DateTime, NaiveDate, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct VaccinationRecord {
    pub id: i64,
    pub child_id: i64,
    pub vaccine_id: i64,
    pub dose_number: i32,
    pub batch_number: String,
    pub administered_by: i64,
    pub administered_on: NaiveDate,
    pub next_dose_date: Option<NaiveDate>,
    pub site: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
