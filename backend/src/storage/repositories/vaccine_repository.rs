use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::like_pattern;
use crate::domain::models::Vaccine;

const SELECT_VACCINE: &str = r#"
    SELECT id, name, disease_prevented, manufacturer, description, dose_count,
           min_age_months, min_storage_temp, max_storage_temp, active,
           created_at, updated_at
    FROM vaccines
"#;

fn map_row(row: &SqliteRow) -> Result<Vaccine> {
    Ok(Vaccine {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        disease_prevented: row.try_get("disease_prevented")?,
        manufacturer: row.try_get("manufacturer")?,
        description: row.try_get("description")?,
        dose_count: row.try_get("dose_count")?,
        min_age_months: row.try_get("min_age_months")?,
        min_storage_temp: row.try_get("min_storage_temp")?,
        max_storage_temp: row.try_get("max_storage_temp")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_rows(rows: Vec<SqliteRow>) -> Result<Vec<Vaccine>> {
    rows.iter().map(map_row).collect()
}

pub async fn insert(conn: &mut SqliteConnection, vaccine: &Vaccine) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO vaccines (name, disease_prevented, manufacturer, description, dose_count,
                              min_age_months, min_storage_temp, max_storage_temp, active,
                              created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&vaccine.name)
    .bind(&vaccine.disease_prevented)
    .bind(&vaccine.manufacturer)
    .bind(&vaccine.description)
    .bind(vaccine.dose_count)
    .bind(vaccine.min_age_months)
    .bind(vaccine.min_storage_temp)
    .bind(vaccine.max_storage_temp)
    .bind(vaccine.active)
    .bind(vaccine.created_at)
    .bind(vaccine.updated_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Vaccine>> {
    let row = sqlx::query(&format!("{SELECT_VACCINE} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

/// Name comparison is case-insensitive
pub async fn name_in_use(conn: &mut SqliteConnection, name: &str, exclude_id: Option<i64>) -> Result<bool> {
    let row = sqlx::query(
        "SELECT 1 FROM vaccines WHERE LOWER(name) = LOWER(?) AND (? IS NULL OR id <> ?) LIMIT 1",
    )
    .bind(name)
    .bind(exclude_id)
    .bind(exclude_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.is_some())
}

pub async fn update(conn: &mut SqliteConnection, vaccine: &Vaccine) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE vaccines
        SET name = ?, disease_prevented = ?, manufacturer = ?, description = ?, dose_count = ?,
            min_age_months = ?, min_storage_temp = ?, max_storage_temp = ?, active = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&vaccine.name)
    .bind(&vaccine.disease_prevented)
    .bind(&vaccine.manufacturer)
    .bind(&vaccine.description)
    .bind(vaccine.dose_count)
    .bind(vaccine.min_age_months)
    .bind(vaccine.min_storage_temp)
    .bind(vaccine.max_storage_temp)
    .bind(vaccine.active)
    .bind(vaccine.updated_at)
    .bind(vaccine.id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM vaccines WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Whether records, inventory batches, schedules or appointments point at the vaccine
pub async fn is_referenced(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let referenced: i64 = sqlx::query_scalar(
        r#"
        SELECT EXISTS (SELECT 1 FROM vaccination_records WHERE vaccine_id = ?1)
            OR EXISTS (SELECT 1 FROM vaccine_inventory WHERE vaccine_id = ?1)
            OR EXISTS (SELECT 1 FROM vaccination_schedules WHERE vaccine_id = ?1)
            OR EXISTS (SELECT 1 FROM appointments WHERE vaccine_id = ?1)
        "#,
    )
    .bind(id)
    .fetch_one(conn)
    .await?;

    Ok(referenced != 0)
}

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Vaccine>> {
    let rows = sqlx::query(&format!("{SELECT_VACCINE} ORDER BY name"))
        .fetch_all(conn)
        .await?;
    map_rows(rows)
}

pub async fn list_active(conn: &mut SqliteConnection) -> Result<Vec<Vaccine>> {
    let rows = sqlx::query(&format!("{SELECT_VACCINE} WHERE active = 1 ORDER BY name"))
        .fetch_all(conn)
        .await?;
    map_rows(rows)
}

pub async fn search_by_disease(conn: &mut SqliteConnection, fragment: &str) -> Result<Vec<Vaccine>> {
    let rows = sqlx::query(&format!(
        "{SELECT_VACCINE} WHERE LOWER(disease_prevented) LIKE ? ESCAPE '\\' ORDER BY name"
    ))
    .bind(like_pattern(fragment))
    .fetch_all(conn)
    .await?;
    map_rows(rows)
}

/// Active vaccines whose minimum age has been reached at `age_months`
pub async fn list_applicable_at_age(conn: &mut SqliteConnection, age_months: i32) -> Result<Vec<Vaccine>> {
    let rows = sqlx::query(&format!(
        "{SELECT_VACCINE} WHERE active = 1 AND min_age_months <= ? ORDER BY min_age_months, name"
    ))
    .bind(age_months)
    .fetch_all(conn)
    .await?;
    map_rows(rows)
}
