use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Vaccine {
    pub id: i64,
    pub name: String,
    pub disease_prevented: String,
    pub manufacturer: Option<String>,
    pub description: Option<String>,
    pub dose_count: i32,
    pub min_age_months: i32,
    pub min_storage_temp: f64,
    pub max_storage_temp: f64,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Vaccine {
    pub fn accepts_dose(&self, dose_number: i32) -> bool {
        (1..=self.dose_count).contains(&dose_number)
    }
}
