use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: i64,
    pub user_id: Option<i64>,
    pub guardian_id: Option<i64>,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn mark_read(&mut self, now: DateTime<Utc>) {
        if !self.read {
            self.read = true;
            self.read_at = Some(now);
        }
    }
}
