// ABOUTME: Conversation history persistence in append order, newest first, tolerant of unreadable rows
// ABOUTME: Conversations are appended only after both pipeline stages succeed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

use async_trait::async_trait;
use karenifier_core::errors::{AppError, AppResult};
use karenifier_core::models::Conversation;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::warn;

use super::Database;

/// Ordered history of completed runs
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Place a conversation at the head of the history
    async fn append(&self, conversation: &Conversation) -> AppResult<()>;

    /// All conversations, most recent first
    ///
    /// Unreadable storage yields an empty list rather than an error.
    async fn list(&self) -> Vec<Conversation>;

    /// Look up a single conversation by id
    ///
    /// Ids are timestamps, so two runs can share one; the latest wins.
    async fn find(&self, id: i64) -> AppResult<Option<Conversation>>;

    /// Remove every conversation, returning how many were removed
    async fn clear(&self) -> AppResult<u64>;
}

fn decode_row(row: &SqliteRow) -> Result<Conversation, sqlx::Error> {
    Ok(Conversation {
        id: row.try_get("id")?,
        query: row.try_get("query")?,
        helpful_response: row.try_get("helpful_response")?,
        karen_response: row.try_get("karen_response")?,
    })
}

#[async_trait]
impl ConversationStore for Database {
    async fn append(&self, conversation: &Conversation) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO conversations (id, query, helpful_response, karen_response, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(conversation.id)
        .bind(&conversation.query)
        .bind(&conversation.helpful_response)
        .bind(&conversation.karen_response)
        .bind(conversation.created_at().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to save conversation: {e}")))?;

        Ok(())
    }

    async fn list(&self) -> Vec<Conversation> {
        let rows = match sqlx::query(
            r"
            SELECT id, query, helpful_response, karen_response
            FROM conversations
            ORDER BY seq DESC
            ",
        )
        .fetch_all(&self.pool)
        .await
        {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "Conversation history unreadable, treating as empty");
                return Vec::new();
            }
        };

        rows.iter()
            .filter_map(|row| match decode_row(row) {
                Ok(conversation) => Some(conversation),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable conversation row");
                    None
                }
            })
            .collect()
    }

    async fn find(&self, id: i64) -> AppResult<Option<Conversation>> {
        let row = sqlx::query(
            r"
            SELECT id, query, helpful_response, karen_response
            FROM conversations
            WHERE id = ?1
            ORDER BY seq DESC
            LIMIT 1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to get conversation: {e}")))?;

        row.as_ref()
            .map(decode_row)
            .transpose()
            .map_err(|e| AppError::database(format!("Failed to decode conversation {id}: {e}")))
    }

    async fn clear(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM conversations")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to clear history: {e}")))?;

        Ok(result.rows_affected())
    }
}
