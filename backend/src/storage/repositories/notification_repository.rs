use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::models::Notification;

const SELECT_NOTIFICATION: &str = r#"
    SELECT id, user_id, guardian_id, title, message, read, read_at, created_at
    FROM notifications
"#;

fn map_row(row: &SqliteRow) -> Result<Notification> {
    Ok(Notification {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        guardian_id: row.try_get("guardian_id")?,
        title: row.try_get("title")?,
        message: row.try_get("message")?,
        read: row.try_get("read")?,
        read_at: row.try_get("read_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn map_rows(rows: Vec<SqliteRow>) -> Result<Vec<Notification>> {
    rows.iter().map(map_row).collect()
}

pub async fn insert(conn: &mut SqliteConnection, notification: &Notification) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, guardian_id, title, message, read, read_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(notification.user_id)
    .bind(notification.guardian_id)
    .bind(&notification.title)
    .bind(&notification.message)
    .bind(notification.read)
    .bind(notification.read_at)
    .bind(notification.created_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Notification>> {
    let row = sqlx::query(&format!("{SELECT_NOTIFICATION} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn mark_read(conn: &mut SqliteConnection, notification: &Notification) -> Result<()> {
    sqlx::query("UPDATE notifications SET read = ?, read_at = ? WHERE id = ?")
        .bind(notification.read)
        .bind(notification.read_at)
        .bind(notification.id)
        .execute(conn)
        .await?;
    Ok(())
}

/// Returns the number of notifications that changed
pub async fn mark_all_read_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query("UPDATE notifications SET read = 1, read_at = ? WHERE user_id = ? AND read = 0")
        .bind(now)
        .bind(user_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Newest first
pub async fn list_for_user(
    conn: &mut SqliteConnection,
    user_id: i64,
    unread_only: bool,
) -> Result<Vec<Notification>> {
    let rows = sqlx::query(&format!(
        "{SELECT_NOTIFICATION} WHERE user_id = ? AND (? = 0 OR read = 0) ORDER BY created_at DESC, id DESC"
    ))
    .bind(user_id)
    .bind(unread_only)
    .fetch_all(conn)
    .await?;
    map_rows(rows)
}

pub async fn list_for_guardian(conn: &mut SqliteConnection, guardian_id: i64) -> Result<Vec<Notification>> {
    let rows = sqlx::query(&format!(
        "{SELECT_NOTIFICATION} WHERE guardian_id = ? ORDER BY created_at DESC, id DESC"
    ))
    .bind(guardian_id)
    .fetch_all(conn)
    .await?;
    map_rows(rows)
}

pub async fn count_unread_for_user(conn: &mut SqliteConnection, user_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND read = 0")
        .bind(user_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}
