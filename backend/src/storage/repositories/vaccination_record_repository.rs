use anyhow::Result;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::models::VaccinationRecord;

const SELECT_RECORD: &str = r#"
    SELECT id, child_id, vaccine_id, dose_number, batch_number, administered_by,
           administered_on, next_dose_date, site, notes, created_at, updated_at
    FROM vaccination_records
"#;

fn map_row(row: &SqliteRow) -> Result<VaccinationRecord> {
    Ok(VaccinationRecord {
        id: row.try_get("id")?,
        child_id: row.try_get("child_id")?,
        vaccine_id: row.try_get("vaccine_id")?,
        dose_number: row.try_get("dose_number")?,
        batch_number: row.try_get("batch_number")?,
        administered_by: row.try_get("administered_by")?,
        administered_on: row.try_get("administered_on")?,
        next_dose_date: row.try_get("next_dose_date")?,
        site: row.try_get("site")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_rows(rows: Vec<SqliteRow>) -> Result<Vec<VaccinationRecord>> {
    rows.iter().map(map_row).collect()
}

pub async fn insert(conn: &mut SqliteConnection, record: &VaccinationRecord) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO vaccination_records (child_id, vaccine_id, dose_number, batch_number,
                                         administered_by, administered_on, next_dose_date,
                                         site, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.child_id)
    .bind(record.vaccine_id)
    .bind(record.dose_number)
    .bind(&record.batch_number)
    .bind(record.administered_by)
    .bind(record.administered_on)
    .bind(record.next_dose_date)
    .bind(&record.site)
    .bind(&record.notes)
    .bind(record.created_at)
    .bind(record.updated_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<VaccinationRecord>> {
    let row = sqlx::query(&format!("{SELECT_RECORD} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn update(conn: &mut SqliteConnection, record: &VaccinationRecord) -> Result<()> {
    sqlx::query(
        "UPDATE vaccination_records SET next_dose_date = ?, site = ?, notes = ?, updated_at = ? WHERE id = ?",
    )
    .bind(record.next_dose_date)
    .bind(&record.site)
    .bind(&record.notes)
    .bind(record.updated_at)
    .bind(record.id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM vaccination_records WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Whether the child already has this dose of this vaccine on file
pub async fn dose_exists(
    conn: &mut SqliteConnection,
    child_id: i64,
    vaccine_id: i64,
    dose_number: i32,
) -> Result<bool> {
    let row = sqlx::query(
        "SELECT 1 FROM vaccination_records WHERE child_id = ? AND vaccine_id = ? AND dose_number = ?",
    )
    .bind(child_id)
    .bind(vaccine_id)
    .bind(dose_number)
    .fetch_optional(conn)
    .await?;

    Ok(row.is_some())
}

pub async fn list_by_child(conn: &mut SqliteConnection, child_id: i64) -> Result<Vec<VaccinationRecord>> {
    let rows = sqlx::query(&format!(
        "{SELECT_RECORD} WHERE child_id = ? ORDER BY administered_on, id"
    ))
    .bind(child_id)
    .fetch_all(conn)
    .await?;

    map_rows(rows)
}

pub async fn count_by_child(conn: &mut SqliteConnection, child_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM vaccination_records WHERE child_id = ?")
        .bind(child_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub async fn list_by_vaccine(conn: &mut SqliteConnection, vaccine_id: i64) -> Result<Vec<VaccinationRecord>> {
    let rows = sqlx::query(&format!(
        "{SELECT_RECORD} WHERE vaccine_id = ? ORDER BY administered_on, id"
    ))
    .bind(vaccine_id)
    .fetch_all(conn)
    .await?;

    map_rows(rows)
}

/// Records administered between `from` and `to`, both inclusive
pub async fn list_administered_between(
    conn: &mut SqliteConnection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<VaccinationRecord>> {
    let rows = sqlx::query(&format!(
        "{SELECT_RECORD} WHERE administered_on BETWEEN ? AND ? ORDER BY administered_on, id"
    ))
    .bind(from)
    .bind(to)
    .fetch_all(conn)
    .await?;

    map_rows(rows)
}

/// Records whose next dose falls between `from` and `to`, skipping soft-deleted children
pub async fn list_next_doses_between(
    conn: &mut SqliteConnection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<VaccinationRecord>> {
    let rows = sqlx::query(&format!(
        r#"{SELECT_RECORD}
        WHERE next_dose_date BETWEEN ? AND ?
          AND child_id IN (SELECT id FROM children WHERE deleted_at IS NULL)
        ORDER BY next_dose_date, id"#
    ))
    .bind(from)
    .bind(to)
    .fetch_all(conn)
    .await?;

    map_rows(rows)
}
