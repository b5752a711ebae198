pub mod appointment_repository;
pub mod association_repository;
pub mod child_repository;
pub mod guardian_repository;
pub mod inventory_repository;
pub mod notification_repository;
pub mod schedule_repository;
pub mod user_repository;
pub mod vaccination_record_repository;
pub mod vaccine_repository;

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;

/// Read a TEXT column holding one of the shared enum labels
pub(crate) fn get_enum<T>(row: &SqliteRow, column: &str) -> Result<T>
where
    T: FromStr<Err = shared::ParseEnumError>,
{
    let raw: String = row.try_get(column)?;
    Ok(raw.parse::<T>()?)
}

/// `%fragment%` pattern for case-insensitive LIKE searches. The query must
/// declare `ESCAPE '\'` so `%` and `_` in the fragment match literally.
pub(crate) fn like_pattern(fragment: &str) -> String {
    let mut pattern = String::from("%");
    for c in fragment.trim().to_lowercase().chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("  Rojas "), "%rojas%");
        assert_eq!(like_pattern("50%"), "%50\\%%");
        assert_eq!(like_pattern("a_b"), "%a\\_b%");
        assert_eq!(like_pattern("c:\\x"), "%c:\\\\x%");
    }
}
