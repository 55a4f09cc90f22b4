//! Database initialization
//!
//! Creates the SQLite database on first run and brings the schema up to
//! date. All statements are idempotent, so startup re-runs are safe.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Use sqlite options to create database if it doesn't exist
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers while a submission writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    init_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables (idempotent, safe to call multiple times)
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_events_table(pool).await?;
    create_submissions_table(pool).await?;
    Ok(())
}

/// Event records persisted by the submission composer
pub async fn create_events_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS events (
            event_id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            status TEXT NOT NULL,
            payload TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_owner ON events(owner_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Submission attempt records, one row per attempt, keyed by the generated
/// event id. Updated after every state transition.
pub async fn create_submissions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS submissions (
            event_id TEXT PRIMARY KEY,
            owner_id TEXT NOT NULL,
            state TEXT NOT NULL,
            storage_path TEXT NOT NULL,
            uploads_completed INTEGER NOT NULL DEFAULT 0,
            uploads_total INTEGER NOT NULL DEFAULT 0,
            current_operation TEXT NOT NULL DEFAULT '',
            upload_failures TEXT NOT NULL DEFAULT '[]',
            error TEXT,
            started_at TIMESTAMP NOT NULL,
            ended_at TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_submissions_owner ON submissions(owner_id)")
        .execute(pool)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> SqlitePool {
        SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory pool")
    }

    #[tokio::test]
    async fn test_init_schema_creates_tables() {
        let pool = memory_pool().await;
        init_schema(&pool).await.expect("schema init");

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .expect("list tables");

        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        assert!(names.contains(&"events"));
        assert!(names.contains(&"submissions"));
    }

    #[tokio::test]
    async fn test_init_schema_is_idempotent() {
        let pool = memory_pool().await;
        init_schema(&pool).await.expect("first init");
        init_schema(&pool).await.expect("second init");
    }

    #[tokio::test]
    async fn test_init_database_creates_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("evhub.db");

        let pool = init_database(&db_path).await.expect("init database");
        assert!(db_path.exists());

        sqlx::query("SELECT COUNT(*) FROM events")
            .fetch_one(&pool)
            .await
            .expect("events table queryable");
    }
}
