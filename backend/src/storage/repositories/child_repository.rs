use anyhow::Result;
use chrono::NaiveDate;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::{get_enum, like_pattern};
use crate::domain::models::Child;

const SELECT_CHILD: &str = r#"
    SELECT id, first_name, last_name, document_number, birth_date, gender,
           blood_type, birth_weight_kg, birth_height_cm, deleted_at,
           created_at, updated_at
    FROM children
"#;

fn map_row(row: &SqliteRow) -> Result<Child> {
    Ok(Child {
        id: row.try_get("id")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        document_number: row.try_get("document_number")?,
        birth_date: row.try_get("birth_date")?,
        gender: get_enum(row, "gender")?,
        blood_type: row.try_get("blood_type")?,
        birth_weight_kg: row.try_get("birth_weight_kg")?,
        birth_height_cm: row.try_get("birth_height_cm")?,
        deleted_at: row.try_get("deleted_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_rows(rows: Vec<SqliteRow>) -> Result<Vec<Child>> {
    rows.iter().map(map_row).collect()
}

/// Store a new child and return its id
pub async fn insert(conn: &mut SqliteConnection, child: &Child) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO children (first_name, last_name, document_number, birth_date, gender,
                              blood_type, birth_weight_kg, birth_height_cm, deleted_at,
                              created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&child.first_name)
    .bind(&child.last_name)
    .bind(&child.document_number)
    .bind(child.birth_date)
    .bind(child.gender.as_str())
    .bind(&child.blood_type)
    .bind(child.birth_weight_kg)
    .bind(child.birth_height_cm)
    .bind(child.deleted_at)
    .bind(child.created_at)
    .bind(child.updated_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Get a child by id, including soft-deleted ones
pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<Child>> {
    let row = sqlx::query(&format!("{SELECT_CHILD} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn find_active_by_document(
    conn: &mut SqliteConnection,
    document_number: &str,
) -> Result<Option<Child>> {
    let row = sqlx::query(&format!(
        "{SELECT_CHILD} WHERE document_number = ? AND deleted_at IS NULL"
    ))
    .bind(document_number)
    .fetch_optional(conn)
    .await?;

    row.as_ref().map(map_row).transpose()
}

/// Whether any child (deleted or not) other than `exclude_id` uses the document number
pub async fn document_in_use(
    conn: &mut SqliteConnection,
    document_number: &str,
    exclude_id: Option<i64>,
) -> Result<bool> {
    let row = sqlx::query(
        "SELECT 1 FROM children WHERE document_number = ? AND (? IS NULL OR id <> ?) LIMIT 1",
    )
    .bind(document_number)
    .bind(exclude_id)
    .bind(exclude_id)
    .fetch_optional(conn)
    .await?;

    Ok(row.is_some())
}

/// Persist every mutable column of the child, including `deleted_at`
pub async fn update(conn: &mut SqliteConnection, child: &Child) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE children
        SET first_name = ?, last_name = ?, document_number = ?, birth_date = ?, gender = ?,
            blood_type = ?, birth_weight_kg = ?, birth_height_cm = ?, deleted_at = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&child.first_name)
    .bind(&child.last_name)
    .bind(&child.document_number)
    .bind(child.birth_date)
    .bind(child.gender.as_str())
    .bind(&child.blood_type)
    .bind(child.birth_weight_kg)
    .bind(child.birth_height_cm)
    .bind(child.deleted_at)
    .bind(child.updated_at)
    .bind(child.id)
    .execute(conn)
    .await?;
    Ok(())
}

/// List children that are not soft-deleted, ordered by name
pub async fn list_active(conn: &mut SqliteConnection) -> Result<Vec<Child>> {
    let rows = sqlx::query(&format!(
        "{SELECT_CHILD} WHERE deleted_at IS NULL ORDER BY last_name, first_name, id"
    ))
    .fetch_all(conn)
    .await?;

    map_rows(rows)
}

/// Case-insensitive match on first name, last name or "first last"
pub async fn search_active_by_name(conn: &mut SqliteConnection, fragment: &str) -> Result<Vec<Child>> {
    let pattern = like_pattern(fragment);
    let rows = sqlx::query(&format!(
        r#"{SELECT_CHILD}
        WHERE deleted_at IS NULL
          AND (LOWER(first_name) LIKE ?1 ESCAPE '\'
               OR LOWER(last_name) LIKE ?1 ESCAPE '\'
               OR LOWER(first_name || ' ' || last_name) LIKE ?1 ESCAPE '\')
        ORDER BY last_name, first_name, id"#
    ))
    .bind(pattern)
    .fetch_all(conn)
    .await?;

    map_rows(rows)
}

/// Children born between `from` and `to`, both inclusive
pub async fn list_active_born_between(
    conn: &mut SqliteConnection,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<Child>> {
    let rows = sqlx::query(&format!(
        "{SELECT_CHILD} WHERE deleted_at IS NULL AND birth_date BETWEEN ? AND ? ORDER BY birth_date, id"
    ))
    .bind(from)
    .bind(to)
    .fetch_all(conn)
    .await?;

    map_rows(rows)
}

pub async fn list_active_without_guardians(conn: &mut SqliteConnection) -> Result<Vec<Child>> {
    let rows = sqlx::query(&format!(
        r#"{SELECT_CHILD}
        WHERE deleted_at IS NULL
          AND NOT EXISTS (SELECT 1 FROM child_guardians cg WHERE cg.child_id = children.id)
        ORDER BY last_name, first_name, id"#
    ))
    .fetch_all(conn)
    .await?;

    map_rows(rows)
}

pub async fn list_active_by_guardian(conn: &mut SqliteConnection, guardian_id: i64) -> Result<Vec<Child>> {
    let rows = sqlx::query(&format!(
        r#"{SELECT_CHILD}
        WHERE deleted_at IS NULL
          AND id IN (SELECT child_id FROM child_guardians WHERE guardian_id = ?)
        ORDER BY last_name, first_name, id"#
    ))
    .bind(guardian_id)
    .fetch_all(conn)
    .await?;

    map_rows(rows)
}

pub async fn count_active_by_guardian(conn: &mut SqliteConnection, guardian_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM child_guardians cg
        JOIN children c ON c.id = cg.child_id
        WHERE cg.guardian_id = ? AND c.deleted_at IS NULL
        "#,
    )
    .bind(guardian_id)
    .fetch_one(conn)
    .await?;

    Ok(count)
}
