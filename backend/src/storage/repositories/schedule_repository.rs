use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::models::VaccinationSchedule;

const SELECT_SCHEDULE: &str = r#"
    SELECT id, vaccine_id, country_code, dose_number, age_months, mandatory, notes,
           created_at, updated_at
    FROM vaccination_schedules
"#;

fn map_row(row: &SqliteRow) -> Result<VaccinationSchedule> {
    Ok(VaccinationSchedule {
        id: row.try_get("id")?,
        vaccine_id: row.try_get("vaccine_id")?,
        country_code: row.try_get("country_code")?,
        dose_number: row.try_get("dose_number")?,
        age_months: row.try_get("age_months")?,
        mandatory: row.try_get("mandatory")?,
        notes: row.try_get("notes")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_rows(rows: Vec<SqliteRow>) -> Result<Vec<VaccinationSchedule>> {
    rows.iter().map(map_row).collect()
}

pub async fn insert(conn: &mut SqliteConnection, schedule: &VaccinationSchedule) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO vaccination_schedules (vaccine_id, country_code, dose_number, age_months,
                                           mandatory, notes, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(schedule.vaccine_id)
    .bind(&schedule.country_code)
    .bind(schedule.dose_number)
    .bind(schedule.age_months)
    .bind(schedule.mandatory)
    .bind(&schedule.notes)
    .bind(schedule.created_at)
    .bind(schedule.updated_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<VaccinationSchedule>> {
    let row = sqlx::query(&format!("{SELECT_SCHEDULE} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn exists_for_dose(
    conn: &mut SqliteConnection,
    vaccine_id: i64,
    country_code: &str,
    dose_number: i32,
) -> Result<bool> {
    let row = sqlx::query(
        "SELECT 1 FROM vaccination_schedules WHERE vaccine_id = ? AND country_code = ? AND dose_number = ?",
    )
    .bind(vaccine_id)
    .bind(country_code)
    .bind(dose_number)
    .fetch_optional(conn)
    .await?;

    Ok(row.is_some())
}

pub async fn update(conn: &mut SqliteConnection, schedule: &VaccinationSchedule) -> Result<()> {
    sqlx::query(
        "UPDATE vaccination_schedules SET age_months = ?, mandatory = ?, notes = ?, updated_at = ? WHERE id = ?",
    )
    .bind(schedule.age_months)
    .bind(schedule.mandatory)
    .bind(&schedule.notes)
    .bind(schedule.updated_at)
    .bind(schedule.id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM vaccination_schedules WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Schedule entries for a country, ordered by age then dose
pub async fn list_by_country(
    conn: &mut SqliteConnection,
    country_code: &str,
    mandatory_only: bool,
) -> Result<Vec<VaccinationSchedule>> {
    let rows = sqlx::query(&format!(
        r#"{SELECT_SCHEDULE}
        WHERE country_code = ? AND (? = 0 OR mandatory = 1)
        ORDER BY age_months, vaccine_id, dose_number"#
    ))
    .bind(country_code)
    .bind(mandatory_only)
    .fetch_all(conn)
    .await?;

    map_rows(rows)
}

pub async fn list_by_vaccine(conn: &mut SqliteConnection, vaccine_id: i64) -> Result<Vec<VaccinationSchedule>> {
    let rows = sqlx::query(&format!(
        "{SELECT_SCHEDULE} WHERE vaccine_id = ? ORDER BY country_code, dose_number"
    ))
    .bind(vaccine_id)
    .fetch_all(conn)
    .await?;

    map_rows(rows)
}

/// Entries a child of `age_months` should already have received
pub async fn list_due_by_age(
    conn: &mut SqliteConnection,
    country_code: &str,
    age_months: i32,
) -> Result<Vec<VaccinationSchedule>> {
    let rows = sqlx::query(&format!(
        r#"{SELECT_SCHEDULE}
        WHERE country_code = ? AND age_months <= ?
        ORDER BY age_months, vaccine_id, dose_number"#
    ))
    .bind(country_code)
    .bind(age_months)
    .fetch_all(conn)
    .await?;

    map_rows(rows)
}
