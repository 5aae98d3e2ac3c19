// ABOUTME: Conversation record for one completed helpful-then-Karen pipeline run
// ABOUTME: Identifiers are creation timestamps in milliseconds, strictly increasing per process
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

static LAST_CONVERSATION_ID: AtomicI64 = AtomicI64::new(0);

/// Generate a fresh conversation identifier
///
/// The identifier is the current Unix time in milliseconds, bumped forward when
/// two conversations are created within the same millisecond so that ids stay
/// unique and ordered by creation.
#[must_use]
pub fn next_conversation_id() -> i64 {
    let now = Utc::now().timestamp_millis();
    let mut last = LAST_CONVERSATION_ID.load(Ordering::Relaxed);
    loop {
        let candidate = now.max(last + 1);
        match LAST_CONVERSATION_ID.compare_exchange_weak(
            last,
            candidate,
            Ordering::AcqRel,
            Ordering::Relaxed,
        ) {
            Ok(_) => return candidate,
            Err(observed) => last = observed,
        }
    }
}

/// A persisted record of one full two-stage run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Creation timestamp in milliseconds, increasing within one process
    pub id: i64,
    /// The query the user submitted
    pub query: String,
    /// Complete text of the helpful stage
    pub helpful_response: String,
    /// Complete text of the Karen stage
    pub karen_response: String,
}

impl Conversation {
    /// Create a conversation with a freshly generated identifier
    #[must_use]
    pub fn new(
        query: impl Into<String>,
        helpful_response: impl Into<String>,
        karen_response: impl Into<String>,
    ) -> Self {
        Self {
            id: next_conversation_id(),
            query: query.into(),
            helpful_response: helpful_response.into(),
            karen_response: karen_response.into(),
        }
    }

    /// When the conversation was created
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.id)
            .single()
            .unwrap_or_default()
    }
}
