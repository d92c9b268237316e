use sqlx::SqlitePool;
use tracing::{info, warn};

use super::StoreError;

const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS members (
        regno TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        designation TEXT,
        department TEXT,
        year TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS attendance (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        regno TEXT NOT NULL,
        date TEXT NOT NULL,
        time TEXT,
        present INTEGER NOT NULL DEFAULT 1,
        FOREIGN KEY(regno) REFERENCES members(regno)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_attendance_date ON attendance(date)",
];

const UNIQUE_DAY_INDEX: &str =
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_attendance_regno_date ON attendance(regno, date)";

pub(super) async fn ensure_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    for statement in SCHEMA_STATEMENTS {
        sqlx::query(statement).execute(pool).await?;
    }

    if !has_column(pool, "attendance", "time").await? {
        info!("Adding missing attendance.time column");
        sqlx::query("ALTER TABLE attendance ADD COLUMN time TEXT")
            .execute(pool)
            .await?;
    }

    // Stores written before the index existed may already hold two events for
    // one member and day. Keep serving them; inserts still check first.
    if let Err(e) = sqlx::query(UNIQUE_DAY_INDEX).execute(pool).await {
        let duplicate = e
            .as_database_error()
            .is_some_and(|db_err| db_err.is_unique_violation());
        if !duplicate {
            return Err(e.into());
        }
        warn!(error = %e, "Duplicate attendance rows present, per-day unique index not created");
    }

    Ok(())
}

async fn has_column(pool: &SqlitePool, table: &str, column: &str) -> Result<bool, StoreError> {
    let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info(?)")
        .bind(table)
        .fetch_all(pool)
        .await?;
    Ok(columns.iter().any(|c| c == column))
}
