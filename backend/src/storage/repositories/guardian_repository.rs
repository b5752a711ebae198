use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::like_pattern;
use crate::domain::models::Guardian;

const SELECT_GUARDIAN: &str = r#"
    SELECT id, first_name, last_name, document_number, phone, email, address,
           relationship, created_at, updated_at
    FROM guardians
"#;

fn map_row(row: &SqliteRow) -> Result<Guardian> {
    Ok(Guardian {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        document_number: row.try_get("document_number")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        address: row.try_get("address")?,
        relationship: row.try_get("relationship")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_rows(rows: Vec<SqliteRow>) -> Result<Vec<Guardian>> {
    rows.iter().map(map_row).collect()
}

pub async fn insert(conn: &mut SqliteConnection, guardian: &Guardian) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO guardians (first_name, last_name, document_number, phone, email, address,
                               relationship, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&guardian.first_name)
    .bind(&guardian.last_name)
    .bind(&guardian.document_number)
    .bind(&guardian.phone)
    .bind(&guardian.email)
    .bind(&guardian.address)
    .bind(&guardian.relationship)
    .bind(guardian.created_at)
    .bind(guardian.updated_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Guardian>> {
    let row = sqlx::query(&format!("{SELECT_GUARDIAN} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn find_by_document(conn: &mut SqliteConnection, document_number: &str) -> Result<Option<Guardian>> {
    let row = sqlx::query(&format!("{SELECT_GUARDIAN} WHERE document_number = ?"))
        .bind(document_number)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn document_in_use(
    conn: &mut SqliteConnection,
    document_number: &str,
    exclude_id: Option<i64>,
) -> Result<bool> {
    let row = sqlx::query(
        "SELECT 1 FROM guardians WHERE document_number = ? AND (? IS NULL OR id <> ?) LIMIT 1",
    )
    .bind(document_number)
    .bind(exclude_id)
    .bind(exclude_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.is_some())
}

pub async fn update(conn: &mut SqliteConnection, guardian: &Guardian) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE guardians
        SET first_name = ?, last_name = ?, document_number = ?, phone = ?, email = ?,
            address = ?, relationship = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&guardian.first_name)
    .bind(&guardian.last_name)
    .bind(&guardian.document_number)
    .bind(&guardian.phone)
    .bind(&guardian.email)
    .bind(&guardian.address)
    .bind(&guardian.relationship)
    .bind(guardian.updated_at)
    .bind(guardian.id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Hard delete; join rows and notifications cascade
pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM guardians WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Guardian>> {
    let rows = sqlx::query(&format!("{SELECT_GUARDIAN} ORDER BY last_name, first_name, id"))
        .fetch_all(conn)
        .await?;

    map_rows(rows)
}

pub async fn search_by_name(conn: &mut SqliteConnection, fragment: &str) -> Result<Vec<Guardian>> {
    let rows = sqlx::query(&format!(
        r#"{SELECT_GUARDIAN}
        WHERE LOWER(first_name) LIKE ?1 ESCAPE '\'
           OR LOWER(last_name) LIKE ?1 ESCAPE '\'
           OR LOWER(first_name || ' ' || last_name) LIKE ?1 ESCAPE '\'
        ORDER BY last_name, first_name, id"#
    ))
    .bind(like_pattern(fragment))
    .fetch_all(conn)
    .await?;

    map_rows(rows)
}

pub async fn list_by_child(conn: &mut SqliteConnection, child_id: i64) -> Result<Vec<Guardian>> {
    let rows = sqlx::query(&format!(
        r#"{SELECT_GUARDIAN}
        WHERE id IN (SELECT guardian_id FROM child_guardians WHERE child_id = ?)
        ORDER BY last_name, first_name, id"#
    ))
    .bind(child_id)
    .fetch_all(conn)
    .await?;

    map_rows(rows)
}

pub async fn count_by_child(conn: &mut SqliteConnection, child_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM child_guardians WHERE child_id = ?")
        .bind(child_id)
        .fetch_one(conn)
        .await?;
    Ok(count)
}

/// Guardians with no links to a child that is still active
pub async fn list_without_active_children(conn: &mut SqliteConnection) -> Result<Vec<Guardian>> {
    let rows = sqlx::query(&format!(
        r#"{SELECT_GUARDIAN}
        WHERE NOT EXISTS (
            SELECT 1
            FROM child_guardians cg
            JOIN children c ON c.id = cg.child_id
            WHERE cg.guardian_id = guardians.id AND c.deleted_at IS NULL
        )
        ORDER BY last_name, first_name, id"#
    ))
    .fetch_all(conn)
    .await?;

    map_rows(rows)
}
