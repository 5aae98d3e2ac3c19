// ABOUTME: Main library entry point for Karenifier
// ABOUTME: Streams a helpful LLM answer, then Karen's sarcastic rephrasing, and keeps history
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

#![deny(unsafe_code)]

//! # Karenifier
//!
//! Sends a question to Google Gemini with a helpful persona, streams the
//! answer, then feeds that answer back under the "Karen" persona and streams
//! her rephrasing.
//!
//! ## Architecture
//!
//! - **llm**: `LlmProvider` trait, Gemini provider, SSE parsing, persona prompts
//! - **pipeline**: the two sequential stages and the credential/service error split
//! - **database**: `SQLite` history, usage counters, and stored API key
//! - **service**: validation, one-at-a-time submission, bookkeeping after a run
//! - **config** / **logging**: environment-driven settings and tracing setup
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use karenifier::config::KarenifierConfig;
//! use karenifier::database::Database;
//! use karenifier::llm::GeminiProvider;
//! use karenifier::pipeline::ResponsePipeline;
//! use karenifier::service::KarenifierService;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = KarenifierConfig::from_env();
//!     let provider = GeminiProvider::with_settings(
//!         config.api_base_url.clone(),
//!         config.model.clone(),
//!         config.request_timeout,
//!     )?;
//!     let database = Database::new(&config.database_url.to_connection_string()).await?;
//!     let pipeline = ResponsePipeline::new(Arc::new(provider), config.model.clone());
//!     let service = KarenifierService::with_database(pipeline, &database)
//!         .with_env_credential(config.env_api_key.clone());
//!
//!     let conversation = service
//!         .submit("Why is my latte cold?", &mut |t: &str| print!("{t}"), &mut |t: &str| print!("{t}"))
//!         .await?;
//!     println!("\nSaved as {}", conversation.id);
//!     Ok(())
//! }
//! ```

/// Environment-driven configuration
pub mod config;

/// `SQLite` persistence for history, counters and the stored key
pub mod database;

/// LLM provider abstraction and the Gemini implementation
pub mod llm;

/// Logging configuration and setup
pub mod logging;

/// Two-stage helpful-then-Karen response pipeline
pub mod pipeline;

/// Application service wrapping the pipeline with storage and policy
pub mod service;

pub use karenifier_core::{constants, errors, models};
