use anyhow::Result;
use chrono::{DateTime, Utc};
use shared::AppointmentStatus;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::get_enum;
use crate::domain::models::Appointment;

const SELECT_APPOINTMENT: &str = r#"
    SELECT id, child_id, scheduled_at, reason, status, created_by, assigned_to,
           vaccine_id, notes, created_at, updated_at
    FROM appointments
"#;

fn map_row(row: &SqliteRow) -> Result<Appointment> {
    Ok(Appointment {
        id: row.try_get("id")?,
        child_id: row.try_get("child_id")?,
        scheduled_at: row.try_get("scheduled_at")?,
        reason: row.try_get("reason")?,
        status: get_enum(row, "status")?,
        created_by: row.try_get("created_by")?,
        assigned_to: row.try_get("assigned_to")?,
        vaccine_id: row.try_get("vaccine_id")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_rows(rows: Vec<SqliteRow>) -> Result<Vec<Appointment>> {
    rows.iter().map(map_row).collect()
}

pub async fn insert(conn: &mut SqliteConnection, appointment: &Appointment) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO appointments (child_id, scheduled_at, reason, status, created_by,
                                  assigned_to, vaccine_id, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(appointment.child_id)
    .bind(appointment.scheduled_at)
    .bind(&appointment.reason)
    .bind(appointment.status.as_str())
    .bind(appointment.created_by)
    .bind(appointment.assigned_to)
    .bind(appointment.vaccine_id)
    .bind(&appointment.notes)
    .bind(appointment.created_at)
    .bind(appointment.updated_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Appointment>> {
    let row = sqlx::query(&format!("{SELECT_APPOINTMENT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn update(conn: &mut SqliteConnection, appointment: &Appointment) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE appointments
        SET scheduled_at = ?, reason = ?, status = ?, assigned_to = ?, notes = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(appointment.scheduled_at)
    .bind(&appointment.reason)
    .bind(appointment.status.as_str())
    .bind(appointment.assigned_to)
    .bind(&appointment.notes)
    .bind(appointment.updated_at)
    .bind(appointment.id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM appointments WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Appointment>> {
    let rows = sqlx::query(&format!("{SELECT_APPOINTMENT} ORDER BY scheduled_at, id"))
        .fetch_all(conn)
        .await?;
    map_rows(rows)
}

pub async fn list_by_child(conn: &mut SqliteConnection, child_id: i64) -> Result<Vec<Appointment>> {
    let rows = sqlx::query(&format!(
        "{SELECT_APPOINTMENT} WHERE child_id = ? ORDER BY scheduled_at, id"
    ))
    .bind(child_id)
    .fetch_all(conn)
    .await?;
    map_rows(rows)
}

pub async fn list_by_assignee(conn: &mut SqliteConnection, user_id: i64) -> Result<Vec<Appointment>> {
    let rows = sqlx::query(&format!(
        "{SELECT_APPOINTMENT} WHERE assigned_to = ? ORDER BY scheduled_at, id"
    ))
    .bind(user_id)
    .fetch_all(conn)
    .await?;
    map_rows(rows)
}

pub async fn list_by_status(conn: &mut SqliteConnection, status: AppointmentStatus) -> Result<Vec<Appointment>> {
    let rows = sqlx::query(&format!(
        "{SELECT_APPOINTMENT} WHERE status = ? ORDER BY scheduled_at, id"
    ))
    .bind(status.as_str())
    .fetch_all(conn)
    .await?;
    map_rows(rows)
}

/// Appointments scheduled between `from` and `to`, both inclusive
pub async fn list_between(
    conn: &mut SqliteConnection,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Appointment>> {
    let rows = sqlx::query(&format!(
        "{SELECT_APPOINTMENT} WHERE scheduled_at >= ? AND scheduled_at <= ? ORDER BY scheduled_at, id"
    ))
    .bind(from)
    .bind(to)
    .fetch_all(conn)
    .await?;
    map_rows(rows)
}

/// Future appointments that are still expected to happen
pub async fn list_upcoming(conn: &mut SqliteConnection, now: DateTime<Utc>) -> Result<Vec<Appointment>> {
    let rows = sqlx::query(&format!(
        r#"{SELECT_APPOINTMENT}
        WHERE scheduled_at > ? AND status IN (?, ?)
        ORDER BY scheduled_at, id"#
    ))
    .bind(now)
    .bind(AppointmentStatus::Scheduled.as_str())
    .bind(AppointmentStatus::Confirmed.as_str())
    .fetch_all(conn)
    .await?;
    map_rows(rows)
}
