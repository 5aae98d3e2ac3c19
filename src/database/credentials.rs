// ABOUTME: Local storage for the user's Gemini API key in the settings table
// ABOUTME: Loading skips a stored value that no longer forms a valid credential
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

use async_trait::async_trait;
use chrono::Utc;
use karenifier_core::constants::storage_keys;
use karenifier_core::errors::{AppError, AppResult};
use karenifier_core::models::Credential;
use tracing::{info, warn};
use zeroize::Zeroizing;

use super::Database;

/// Persistent home of the API key between runs
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// The stored key, if any
    async fn load(&self) -> AppResult<Option<Credential>>;

    /// Replace the stored key
    async fn store(&self, credential: &Credential) -> AppResult<()>;

    /// Remove the stored key, returning whether one was present
    async fn clear(&self) -> AppResult<bool>;
}

#[async_trait]
impl CredentialStore for Database {
    async fn load(&self) -> AppResult<Option<Credential>> {
        let stored = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?1")
            .bind(storage_keys::API_KEY)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to load API key: {e}")))?;

        let Some(raw) = stored.map(Zeroizing::new) else {
            return Ok(None);
        };

        match Credential::new(raw.as_str()) {
            Ok(credential) => Ok(Some(credential)),
            Err(e) => {
                warn!(error = %e, "Ignoring unusable stored API key");
                Ok(None)
            }
        }
    }

    async fn store(&self, credential: &Credential) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO settings (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = ?2,
                updated_at = ?3
            ",
        )
        .bind(storage_keys::API_KEY)
        .bind(credential.expose())
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to store API key: {e}")))?;

        info!("API key stored");
        Ok(())
    }

    async fn clear(&self) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM settings WHERE key = ?1")
            .bind(storage_keys::API_KEY)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to clear API key: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
