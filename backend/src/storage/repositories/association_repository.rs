//! The `child_guardians` join table.

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

pub async fn link(
    conn: &mut SqliteConnection,
    child_id: i64,
    guardian_id: i64,
    linked_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query("INSERT INTO child_guardians (child_id, guardian_id, created_at) VALUES (?, ?, ?)")
        .bind(child_id)
        .bind(guardian_id)
        .bind(linked_at)
        .execute(conn)
        .await?;
    Ok(())
}

/// Returns true if a link was removed
pub async fn unlink(conn: &mut SqliteConnection, child_id: i64, guardian_id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM child_guardians WHERE child_id = ? AND guardian_id = ?")
        .bind(child_id)
        .bind(guardian_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn is_linked(conn: &mut SqliteConnection, child_id: i64, guardian_id: i64) -> Result<bool> {
    let row = sqlx::query("SELECT 1 FROM child_guardians WHERE child_id = ? AND guardian_id = ?")
        .bind(child_id)
        .bind(guardian_id)
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}
