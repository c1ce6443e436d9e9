/// Database module for the class schedule
///
/// The schedule lives in a single SQLite table, `class_reservations`. Aula
/// only reads it; `Database::new` exists so `aula setup` and tests can create
/// the schema. Lookups go through the [`ScheduleStore`] trait so the query
/// resolver can be tested against [`InMemoryStore`].
use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::{ConnectOptions, Executor};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

pub mod memory;
pub mod schedule;

// Re-export commonly used types
pub use memory::InMemoryStore;
pub use schedule::{ScheduleRepository, ScheduleStore};

/// Database connection pool
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create or open the database and make sure the schema exists
    ///
    /// This will:
    /// 1. Create the database file (and its directory) if it doesn't exist
    /// 2. Enable WAL mode
    /// 3. Run migrations to set up the schema
    pub async fn new(db_path: &Path) -> Result<Self> {
        info!("Initializing database at: {}", db_path.display());

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create database directory")?;
        }

        let connection_string = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        debug!("Database connection established");

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    /// Open an existing schedule database without touching its schema
    ///
    /// Fails if the file does not exist; run `aula setup` or point
    /// `store.database_path` at the schedule first.
    pub async fn open(db_path: &Path) -> Result<Self> {
        debug!("Opening schedule database at: {}", db_path.display());

        let connection_string = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)?
            .create_if_missing(false)
            .disable_statement_logging();

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .with_context(|| format!("Failed to open schedule database {}", db_path.display()))?;

        Ok(Self { pool })
    }

    /// Run database migrations
    ///
    /// Migrations use `IF NOT EXISTS` and can be run multiple times safely.
    async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        self.pool
            .execute(include_str!("../../migrations/001_initial.sql"))
            .await
            .context("Failed to execute migration 001_initial.sql")?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection
    ///
    /// Checkpoints the WAL, if any, and closes all connections in the pool.
    pub async fn close(self) -> Result<()> {
        info!("Closing database connection");

        sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
            .execute(&self.pool)
            .await
            .context("Failed to flush WAL")?;

        self.pool.close().await;

        info!("Database connection closed");
        Ok(())
    }

    /// Create a schedule repository
    pub fn schedule(&self) -> ScheduleRepository {
        ScheduleRepository::new(self.pool.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_database_creation() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("schedule.db");

        let db = Database::new(&db_path).await.unwrap();
        assert!(db_path.exists());

        let result = sqlx::query("SELECT 1").fetch_one(db.pool()).await;
        assert!(result.is_ok());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_migrations_create_schedule_table() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("schedule.db");

        let db = Database::new(&db_path).await.unwrap();

        let tables: Vec<String> =
            sqlx::query_scalar("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
                .fetch_all(db.pool())
                .await
                .unwrap();
        assert!(tables.contains(&"class_reservations".to_string()));

        db.close().await.unwrap();

        // Running the migration again is harmless
        let db = Database::new(&db_path).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_missing_database_fails() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("missing.db");

        assert!(Database::open(&db_path).await.is_err());
        assert!(!db_path.exists());
    }

    #[tokio::test]
    async fn test_close_reports_checkpoint_failure() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("schedule.db");

        let db = Database::new(&db_path).await.unwrap();
        db.pool().close().await;

        let err = db.close().await.unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to flush WAL"));
    }
}
