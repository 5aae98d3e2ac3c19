// ABOUTME: Visit and run counters persisted as text values
// ABOUTME: Missing or unparsable values read as zero, increments are read-then-write
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

use async_trait::async_trait;
use karenifier_core::constants::storage_keys;
use karenifier_core::errors::{AppError, AppResult};
use karenifier_core::models::UsageStats;
use tracing::warn;

use super::Database;

/// Monotonic usage counters
#[async_trait]
pub trait UsageCounters: Send + Sync {
    /// Count one application load, returning the new value
    async fn increment_visit(&self) -> AppResult<u64>;

    /// Count one fully successful pipeline run, returning the new value
    async fn increment_run(&self) -> AppResult<u64>;

    /// Current values
    async fn read(&self) -> UsageStats;
}

impl Database {
    async fn read_counter(&self, name: &str) -> u64 {
        let stored = sqlx::query_scalar::<_, String>("SELECT value FROM usage_counters WHERE name = ?1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await;

        match stored {
            Ok(Some(value)) => value.trim().parse().unwrap_or_else(|_| {
                warn!(counter = name, value = %value, "Unparsable counter value, reading as 0");
                0
            }),
            Ok(None) => 0,
            Err(e) => {
                warn!(counter = name, error = %e, "Counter unreadable, reading as 0");
                0
            }
        }
    }

    async fn increment_counter(&self, name: &str) -> AppResult<u64> {
        let next = self.read_counter(name).await.saturating_add(1);

        sqlx::query(
            r"
            INSERT INTO usage_counters (name, value)
            VALUES (?1, ?2)
            ON CONFLICT(name) DO UPDATE SET value = ?2
            ",
        )
        .bind(name)
        .bind(next.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to update counter {name}: {e}")))?;

        Ok(next)
    }
}

#[async_trait]
impl UsageCounters for Database {
    async fn increment_visit(&self) -> AppResult<u64> {
        self.increment_counter(storage_keys::VISITS).await
    }

    async fn increment_run(&self) -> AppResult<u64> {
        self.increment_counter(storage_keys::RUNS).await
    }

    async fn read(&self) -> UsageStats {
        UsageStats {
            visits: self.read_counter(storage_keys::VISITS).await,
            runs: self.read_counter(storage_keys::RUNS).await,
        }
    }
}
