use anyhow::Result;
use sqlx::pool::PoolConnection;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool, Transaction};
use std::sync::Arc;

/// DbConnection owns the SQLite pool and the schema bootstrap
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Create a new database connection
    pub async fn new(url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url).await?
        }

        // Connect to the database (sqlx turns foreign key enforcement on)
        let pool = SqlitePool::connect(url).await?;

        Self::setup_schema(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Initialize a test database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    /// Get a reference to the connection pool
    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Check out a pooled connection for read-only work
    pub async fn acquire(&self) -> Result<PoolConnection<Sqlite>, sqlx::Error> {
        self.pool.acquire().await
    }

    /// Start a transaction. Dropping it without `commit` rolls back.
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Set up the required database schema
    async fn setup_schema(pool: &SqlitePool) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(pool).await?;
        }
        Ok(())
    }
}

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        email TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        full_name TEXT NOT NULL,
        role TEXT NOT NULL,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS children (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        document_number TEXT NOT NULL UNIQUE,
        birth_date TEXT NOT NULL,
        gender TEXT NOT NULL,
        blood_type TEXT,
        birth_weight_kg REAL,
        birth_height_cm REAL,
        deleted_at TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_children_active
    ON children(deleted_at, last_name, first_name);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS guardians (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        document_number TEXT NOT NULL UNIQUE,
        phone TEXT NOT NULL,
        email TEXT,
        address TEXT,
        relationship TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS child_guardians (
        child_id INTEGER NOT NULL REFERENCES children(id) ON DELETE CASCADE,
        guardian_id INTEGER NOT NULL REFERENCES guardians(id) ON DELETE CASCADE,
        created_at TEXT NOT NULL,
        PRIMARY KEY (child_id, guardian_id)
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_child_guardians_guardian
    ON child_guardians(guardian_id);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vaccines (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        disease_prevented TEXT NOT NULL,
        manufacturer TEXT,
        description TEXT,
        dose_count INTEGER NOT NULL CHECK (dose_count >= 1),
        min_age_months INTEGER NOT NULL CHECK (min_age_months >= 0),
        min_storage_temp REAL NOT NULL,
        max_storage_temp REAL NOT NULL,
        active INTEGER NOT NULL DEFAULT 1,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vaccination_schedules (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        vaccine_id INTEGER NOT NULL REFERENCES vaccines(id),
        country_code TEXT NOT NULL,
        dose_number INTEGER NOT NULL,
        age_months INTEGER NOT NULL,
        mandatory INTEGER NOT NULL DEFAULT 1,
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (vaccine_id, country_code, dose_number)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vaccination_records (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        child_id INTEGER NOT NULL REFERENCES children(id),
        vaccine_id INTEGER NOT NULL REFERENCES vaccines(id),
        dose_number INTEGER NOT NULL,
        batch_number TEXT NOT NULL,
        administered_by INTEGER NOT NULL REFERENCES users(id),
        administered_on TEXT NOT NULL,
        next_dose_date TEXT,
        site TEXT,
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_vaccination_records_child
    ON vaccination_records(child_id, administered_on);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS vaccine_inventory (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        vaccine_id INTEGER NOT NULL REFERENCES vaccines(id),
        batch_number TEXT NOT NULL,
        quantity INTEGER NOT NULL CHECK (quantity >= 0),
        expiration_date TEXT NOT NULL,
        received_date TEXT NOT NULL,
        supplier TEXT,
        status TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        UNIQUE (vaccine_id, batch_number)
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS appointments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        child_id INTEGER NOT NULL REFERENCES children(id),
        scheduled_at TEXT NOT NULL,
        reason TEXT NOT NULL,
        status TEXT NOT NULL,
        created_by INTEGER NOT NULL REFERENCES users(id),
        assigned_to INTEGER REFERENCES users(id),
        vaccine_id INTEGER REFERENCES vaccines(id),
        notes TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_appointments_scheduled_at
    ON appointments(scheduled_at);
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS notifications (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER REFERENCES users(id) ON DELETE CASCADE,
        guardian_id INTEGER REFERENCES guardians(id) ON DELETE CASCADE,
        title TEXT NOT NULL,
        message TEXT NOT NULL,
        read INTEGER NOT NULL DEFAULT 0,
        read_at TEXT,
        created_at TEXT NOT NULL,
        CHECK ((user_id IS NULL) <> (guardian_id IS NULL))
    );
    "#,
];

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_schema_is_created() {
        let db = DbConnection::init_test().await.expect("Failed to create test database");

        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .fetch_all(db.pool())
            .await
            .expect("Failed to list tables");
        let tables: Vec<String> = rows.iter().map(|row| row.get("name")).collect();

        for expected in [
            "appointments",
            "child_guardians",
            "children",
            "guardians",
            "notifications",
            "users",
            "vaccination_records",
            "vaccination_schedules",
            "vaccine_inventory",
            "vaccines",
        ] {
            assert!(tables.iter().any(|t| t == expected), "missing table {}", expected);
        }
    }

    #[tokio::test]
    async fn test_schema_setup_is_idempotent() {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        DbConnection::setup_schema(db.pool())
            .await
            .expect("Second schema setup should succeed");
    }

    #[tokio::test]
    async fn test_foreign_keys_are_enforced() {
        let db = DbConnection::init_test().await.expect("Failed to create test database");

        let result = sqlx::query(
            "INSERT INTO child_guardians (child_id, guardian_id, created_at) VALUES (99, 99, 'now')",
        )
        .execute(db.pool())
        .await;

        assert!(result.is_err(), "orphan join row should violate the foreign key");
    }
}
