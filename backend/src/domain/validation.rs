//! Field-level input validation shared by the services.

use std::collections::BTreeMap;

use super::error::DomainError;

/// Collects per-field validation messages before failing the request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldErrors {
    errors: BTreeMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error; the first message for a field wins
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn require_text(&mut self, field: &str, value: &str, max_len: usize) {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            self.add(field, "must not be empty");
        } else if trimmed.chars().count() > max_len {
            self.add(field, format!("must be at most {} characters", max_len));
        }
    }

    /// Like `require_text`, for optional fields that were supplied
    pub fn optional_text(&mut self, field: &str, value: Option<&str>, max_len: usize) {
        if let Some(value) = value {
            self.require_text(field, value, max_len);
        }
    }

    pub fn require_positive(&mut self, field: &str, value: i32) {
        if value < 1 {
            self.add(field, "must be at least 1");
        }
    }

    pub fn require_non_negative(&mut self, field: &str, value: i32) {
        if value < 0 {
            self.add(field, "must not be negative");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.errors
    }

    pub fn into_result(self) -> Result<(), DomainError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self))
        }
    }
}

/// Trim a supplied optional string, turning blank input into `None`
pub fn clean_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
