use anyhow::Result;
use shared::Role;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::get_enum;
use crate::domain::models::User;

const SELECT_USER: &str = r#"
    SELECT id, username, email, password_hash, full_name, role, active, created_at, updated_at
    FROM users
"#;

fn map_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        full_name: row.try_get("full_name")?,
        role: get_enum(row, "role")?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn map_rows(rows: Vec<SqliteRow>) -> Result<Vec<User>> {
    rows.iter().map(map_row).collect()
}

pub async fn insert(conn: &mut SqliteConnection, user: &User) -> Result<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (username, email, password_hash, full_name, role, active,
                           created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.username)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.full_name)
    .bind(user.role.as_str())
    .bind(user.active)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{SELECT_USER} WHERE id = ?"))
        .bind(id)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn find_by_username(conn: &mut SqliteConnection, username: &str) -> Result<Option<User>> {
    let row = sqlx::query(&format!("{SELECT_USER} WHERE username = ?"))
        .bind(username)
        .fetch_optional(conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn username_in_use(conn: &mut SqliteConnection, username: &str) -> Result<bool> {
    let row = sqlx::query("SELECT 1 FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(conn)
        .await?;
    Ok(row.is_some())
}

/// Email comparison is case-insensitive
pub async fn email_in_use(conn: &mut SqliteConnection, email: &str, exclude_id: Option<i64>) -> Result<bool> {
    let row = sqlx::query(
        "SELECT 1 FROM users WHERE LOWER(email) = LOWER(?) AND (? IS NULL OR id <> ?) LIMIT 1",
    )
    .bind(email)
    .bind(exclude_id)
    .bind(exclude_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.is_some())
}

pub async fn update(conn: &mut SqliteConnection, user: &User) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE users
        SET email = ?, password_hash = ?, full_name = ?, role = ?, active = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.full_name)
    .bind(user.role.as_str())
    .bind(user.active)
    .bind(user.updated_at)
    .bind(user.id)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn count(conn: &mut SqliteConnection) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(conn)
        .await?;
    Ok(count)
}

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!("{SELECT_USER} ORDER BY username"))
        .fetch_all(conn)
        .await?;
    map_rows(rows)
}

pub async fn list_by_role(conn: &mut SqliteConnection, role: Role) -> Result<Vec<User>> {
    let rows = sqlx::query(&format!("{SELECT_USER} WHERE role = ? ORDER BY username"))
        .bind(role.as_str())
        .fetch_all(conn)
        .await?;
    map_rows(rows)
}
