use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Guardian {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub document_number: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub relationship: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
