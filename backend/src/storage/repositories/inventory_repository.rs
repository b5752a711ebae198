use anyhow::Result;
use chrono::NaiveDate;
use shared::InventoryStatus;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::get_enum;
use crate::domain::models::VaccineInventory;

const SELECT_BATCH: &str = r#"
    SELECT id, vaccine_id, batch_number, quantity, expiration_date, received_date,
           supplier, status, created_at, updated_at
    FROM vaccine_inventory
"#;

fn map_row(row: &SqliteRow) -> Result<VaccineInventory> {
    Ok(VaccineInventory {
        id: row.try_get("id")?,
        vaccine_id: row.try_get("vaccine_id")?,
        batch_number: row.try_get("batch_number")?,
        quantity: row.try_get("quantity")?,
        expiration_date: row.try_get("expiration_date")?,
        received_date: row.try_get("received_date")?,
        supplier: row.try_get("supplier")?,
        status: get_enum(row, "status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_rows(rows: Vec<SqliteRow>) -> Result<Vec<VaccineInventory>> {
    rows.iter().map(map_row).collect()
}

pub async fn insert(conn: &mut SqliteConnection, batch: &VaccineInventory) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO vaccine_inventory (vaccine_id, batch_number, quantity, expiration_date,
                                       received_date, supplier, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(batch.vaccine_id)
    .bind(&batch.batch_number)
    .bind(batch.quantity)
    .bind(batch.expiration_date)
    .bind(batch.received_date)
    .bind(&batch.supplier)
    .bind(batch.status.as_str())
    .bind(batch.created_at)
    .bind(batch.updated_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<VaccineInventory>> {
    let row = sqlx::query(&format!("{SELECT_BATCH} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn batch_exists(conn: &mut SqliteConnection, vaccine_id: i64, batch_number: &str) -> Result<bool> {
    let row = sqlx::query("SELECT 1 FROM vaccine_inventory WHERE vaccine_id = ? AND batch_number = ?")
        .bind(vaccine_id)
        .bind(batch_number)
        .fetch_optional(conn)
        .await?;

    Ok(row.is_some())
}

/// Write back quantity and status after a stock movement or status change
pub async fn update_stock(conn: &mut SqliteConnection, batch: &VaccineInventory) -> Result<()> {
    sqlx::query("UPDATE vaccine_inventory SET quantity = ?, status = ?, updated_at = ? WHERE id = ?")
        .bind(batch.quantity)
        .bind(batch.status.as_str())
        .bind(batch.updated_at)
        .bind(batch.id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM vaccine_inventory WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<VaccineInventory>> {
    let rows = sqlx::query(&format!("{SELECT_BATCH} ORDER BY expiration_date, id"))
        .fetch_all(conn)
        .await?;
    map_rows(rows)
}

pub async fn list_by_vaccine(conn: &mut SqliteConnection, vaccine_id: i64) -> Result<Vec<VaccineInventory>> {
    let rows = sqlx::query(&format!(
        "{SELECT_BATCH} WHERE vaccine_id = ? ORDER BY expiration_date, id"
    ))
    .bind(vaccine_id)
    .fetch_all(conn)
    .await?;
    map_rows(rows)
}

pub async fn list_by_status(conn: &mut SqliteConnection, status: InventoryStatus) -> Result<Vec<VaccineInventory>> {
    let rows = sqlx::query(&format!(
        "{SELECT_BATCH} WHERE status = ? ORDER BY expiration_date, id"
    ))
    .bind(status.as_str())
    .fetch_all(conn)
    .await?;
    map_rows(rows)
}

/// Batches that can be used on `today`, earliest expiration first
pub async fn list_usable_for_vaccine(
    conn: &mut SqliteConnection,
    vaccine_id: i64,
    today: NaiveDate,
) -> Result<Vec<VaccineInventory>> {
    let rows = sqlx::query(&format!(
        r#"{SELECT_BATCH}
        WHERE vaccine_id = ? AND status = ? AND quantity > 0 AND expiration_date >= ?
        ORDER BY expiration_date, id"#
    ))
    .bind(vaccine_id)
    .bind(InventoryStatus::Available.as_str())
    .bind(today)
    .fetch_all(conn)
    .await?;
    map_rows(rows)
}

pub async fn total_usable_for_vaccine(
    conn: &mut SqliteConnection,
    vaccine_id: i64,
    today: NaiveDate,
) -> Result<i64> {
    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(quantity), 0)
        FROM vaccine_inventory
        WHERE vaccine_id = ? AND status = ? AND quantity > 0 AND expiration_date >= ?
        "#,
    )
    .bind(vaccine_id)
    .bind(InventoryStatus::Available.as_str())
    .bind(today)
    .fetch_one(conn)
    .await?;
    Ok(total)
}

/// Batches with stock left whose expiration falls between `from` and `until`
pub async fn list_expiring_between(
    conn: &mut SqliteConnection,
    from: NaiveDate,
    until: NaiveDate,
) -> Result<Vec<VaccineInventory>> {
    let rows = sqlx::query(&format!(
        r#"{SELECT_BATCH}
        WHERE expiration_date BETWEEN ? AND ? AND quantity > 0
        ORDER BY expiration_date, id"#
    ))
    .bind(from)
    .bind(until)
    .fetch_all(conn)
    .await?;
    map_rows(rows)
}

/// AVAILABLE batches holding fewer than `threshold` doses
pub async fn list_low_stock(conn: &mut SqliteConnection, threshold: i32) -> Result<Vec<VaccineInventory>> {
    let rows = sqlx::query(&format!(
        "{SELECT_BATCH} WHERE status = ? AND quantity < ? ORDER BY quantity, id"
    ))
    .bind(InventoryStatus::Available.as_str())
    .bind(threshold)
    .fetch_all(conn)
    .await?;
    map_rows(rows)
}
