// ABOUTME: SQLite persistence for conversation history, usage counters, and the stored API key
// ABOUTME: Owns the connection pool, schema creation, and the store traits the service depends on
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

//! # Database Management
//!
//! One SQLite file holds everything Karenifier keeps between runs. Each concern
//! is exposed through its own trait so the service can be exercised against
//! alternative stores:
//!
//! - [`ConversationStore`]: completed runs, most recent first
//! - [`UsageCounters`]: visit and run counters stored as text
//! - [`CredentialStore`]: the user's API key

mod conversations;
mod credentials;
mod usage;

pub use conversations::ConversationStore;
pub use credentials::CredentialStore;
pub use usage::UsageCounters;

use std::path::Path;
use std::str::FromStr;

use karenifier_core::errors::{AppError, AppResult, ErrorCode};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

/// Pool size for on-disk databases
const MAX_FILE_CONNECTIONS: u32 = 4;

/// Database manager for history, counters and settings
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if needed) the database at `database_url` and run migrations
    ///
    /// In-memory URLs get a single connection, since every SQLite connection
    /// to `:memory:` sees its own private database.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid, the parent directory cannot be
    /// created, or the connection or migrations fail.
    pub async fn new(database_url: &str) -> AppResult<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .map_err(|e| AppError::config(format!("Invalid database URL '{database_url}': {e}")))?
            .create_if_missing(true);

        let in_memory = database_url.contains(":memory:") || database_url.contains("mode=memory");
        if !in_memory {
            if let Some(parent) = options.get_filename().parent() {
                ensure_directory(parent).await?;
            }
        }

        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { MAX_FILE_CONNECTIONS })
            .connect_with(options)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")).with_source(e))?;

        let db = Self { pool };
        db.migrate().await?;

        info!(in_memory, "Database ready");
        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables that do not exist yet
    ///
    /// # Errors
    ///
    /// Returns an error if a schema statement fails.
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS conversations (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id INTEGER NOT NULL,
                query TEXT NOT NULL,
                helpful_response TEXT NOT NULL,
                karen_response TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_conversations_id ON conversations(id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS usage_counters (
                name TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        debug!("Database migrations applied");
        Ok(())
    }
}

async fn ensure_directory(path: &Path) -> AppResult<()> {
    if path.as_os_str().is_empty() {
        return Ok(());
    }
    tokio::fs::create_dir_all(path).await.map_err(|e| {
        AppError::new(
            ErrorCode::StorageError,
            format!("Failed to create data directory {}: {e}", path.display()),
        )
        .with_source(e)
    })
}
