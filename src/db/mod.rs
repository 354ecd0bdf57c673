mod clients;
mod reports;
mod stats;
mod users;

use std::fs;
use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        is_admin BOOLEAN NOT NULL DEFAULT FALSE,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS clients (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        phone TEXT,
        company TEXT,
        address TEXT,
        city TEXT,
        country TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    // client_ids is deliberately not a foreign key: reports outlive clients
    r#"
    CREATE TABLE IF NOT EXISTS reports (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        kind TEXT NOT NULL,
        title TEXT NOT NULL,
        description TEXT,
        client_ids TEXT NOT NULL DEFAULT '',
        format TEXT NOT NULL,
        file_path TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS report_data (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        report_id INTEGER NOT NULL UNIQUE REFERENCES reports (id),
        payload TEXT NOT NULL,
        created_at TEXT NOT NULL
    )
    "#,
];

/// Handle to the SQLite store. Opened once at startup, passed by reference
/// to every layer and closed explicitly on shutdown.
pub struct Database {
    pool: SqlitePool,
    path: PathBuf,
}

impl Database {
    /// Open the database file, creating it and its schema if absent
    pub async fn connect(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .foreign_keys(true);

        // One writer by construction, so one connection is enough
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self {
            pool,
            path: path.to_path_buf(),
        };
        db.create_schema().await?;

        info!(path = %path.display(), "database opened");
        Ok(db)
    }

    async fn create_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("schema ready");
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the connection. Pending writes are already committed.
    pub async fn close(self) {
        self.pool.close().await;
        info!(path = %self.path.display(), "database closed");
    }
}

/// Open the database named by the configuration
pub async fn init(config: &Config) -> Result<Database> {
    Database::connect(config.database_path()).await
}

#[cfg(test)]
pub(crate) mod test_support {
    use tempfile::TempDir;

    use super::Database;

    /// A fresh database in its own temporary directory. Keep the `TempDir`
    /// alive for as long as the database is used.
    pub async fn open_temp_db() -> (TempDir, Database) {
        let dir = TempDir::new().unwrap();
        let db = Database::connect(&dir.path().join("data").join("test.db"))
            .await
            .unwrap();
        (dir, db)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::open_temp_db;
    use super::*;

    #[tokio::test]
    async fn test_connect_creates_file_and_parent_dirs() {
        let (dir, db) = open_temp_db().await;
        assert!(dir.path().join("data").join("test.db").exists());
        assert_eq!(db.count_users().await.unwrap(), 0);
        db.close().await;
    }

    #[tokio::test]
    async fn test_reopen_keeps_data() {
        let (dir, db) = open_temp_db().await;
        let path = db.path().to_path_buf();
        db.create_user("admin", "hash", true).await.unwrap();
        db.close().await;

        let reopened = Database::connect(&path).await.unwrap();
        assert_eq!(reopened.count_users().await.unwrap(), 1);
        reopened.close().await;
        drop(dir);
    }
}
