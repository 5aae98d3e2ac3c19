// ABOUTME: Core data models shared between the pipeline, storage, and CLI
// ABOUTME: Re-exports conversation records, usage counters, and the credential newtype
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

//! Core data models

/// Persisted record of one complete helpful-then-Karen run
pub mod conversation;

/// Opaque API credential with redacted formatting
pub mod credential;

/// Visit and run counters
pub mod usage;

pub use conversation::{next_conversation_id, Conversation};
pub use credential::{ApiKeySource, Credential};
pub use usage::UsageStats;
