// ABOUTME: Application service tying the pipeline to history, counters, and credential storage
// ABOUTME: Validates queries, allows one submission at a time, and discards rejected stored keys
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

//! # Karenifier Service
//!
//! Caller-side policy around the [`ResponsePipeline`]:
//!
//! - queries are trimmed and must be non-empty and within the length cap
//! - only one submission may be in flight; a second one is rejected as `Busy`
//! - a credential refused by the provider is removed from the local store
//! - a successful run is saved to history and counted; failures to record it
//!   are logged and do not fail the run

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use karenifier_core::constants::limits;
use karenifier_core::errors::{AppError, AppResult};
use karenifier_core::models::{ApiKeySource, Conversation, Credential, UsageStats};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::database::{ConversationStore, CredentialStore, Database, UsageCounters};
use crate::pipeline::{PipelineError, ResponsePipeline};

/// Why a submission did not produce a conversation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// Query was empty after trimming
    #[error("Please enter a query.")]
    EmptyQuery,
    /// Query exceeded the character cap
    #[error("Your query is {length} characters long; the limit is {max}.")]
    QueryTooLong {
        /// Characters submitted
        length: usize,
        /// Characters allowed
        max: usize,
    },
    /// No key in the environment or the local store
    #[error("No API key is configured.")]
    MissingCredential,
    /// Another submission is still running
    #[error("A request is already in progress.")]
    Busy,
    /// A pipeline stage failed
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    /// Failure outside the pipeline taxonomy
    #[error("An unexpected error occurred. {message}")]
    Unexpected {
        /// Underlying detail
        message: String,
    },
}

impl SubmitError {
    /// Message suitable for showing to the user
    #[must_use]
    pub fn user_message(&self) -> String {
        self.to_string()
    }

    /// Whether the failure was a refused credential
    #[must_use]
    pub const fn is_credential(&self) -> bool {
        matches!(self, Self::Pipeline(PipelineError::Credential { .. }))
    }
}

impl From<AppError> for SubmitError {
    fn from(error: AppError) -> Self {
        Self::Unexpected {
            message: error.message,
        }
    }
}

/// A credential together with where it was found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    /// The key
    pub credential: Credential,
    /// Its origin
    pub source: ApiKeySource,
}

/// Releases the in-flight flag when dropped
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Karenifier application service
pub struct KarenifierService {
    pipeline: ResponsePipeline,
    conversations: Arc<dyn ConversationStore>,
    counters: Arc<dyn UsageCounters>,
    credentials: Arc<dyn CredentialStore>,
    env_credential: Option<Credential>,
    max_query_chars: usize,
    busy: AtomicBool,
}

impl KarenifierService {
    /// Create a service over explicit stores
    #[must_use]
    pub fn new(
        pipeline: ResponsePipeline,
        conversations: Arc<dyn ConversationStore>,
        counters: Arc<dyn UsageCounters>,
        credentials: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            pipeline,
            conversations,
            counters,
            credentials,
            env_credential: None,
            max_query_chars: limits::MAX_QUERY_CHARS,
            busy: AtomicBool::new(false),
        }
    }

    /// Create a service whose stores all live in one database
    #[must_use]
    pub fn with_database(pipeline: ResponsePipeline, database: &Database) -> Self {
        Self::new(
            pipeline,
            Arc::new(database.clone()),
            Arc::new(database.clone()),
            Arc::new(database.clone()),
        )
    }

    /// Use a key from the environment ahead of the stored one
    #[must_use]
    pub fn with_env_credential(mut self, credential: Option<Credential>) -> Self {
        self.env_credential = credential;
        self
    }

    /// Override the query length cap
    #[must_use]
    pub const fn with_max_query_chars(mut self, max_query_chars: usize) -> Self {
        self.max_query_chars = max_query_chars;
        self
    }

    /// Whether a submission is currently running
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Count one application load
    ///
    /// # Errors
    ///
    /// Returns an error if the counter cannot be written.
    pub async fn record_visit(&self) -> AppResult<u64> {
        self.counters.increment_visit().await
    }

    /// Find the key to use: the environment first, then the local store
    ///
    /// # Errors
    ///
    /// Returns an error if the local store cannot be read.
    pub async fn resolve_credential(&self) -> AppResult<Option<ResolvedCredential>> {
        if let Some(credential) = &self.env_credential {
            return Ok(Some(ResolvedCredential {
                credential: credential.clone(),
                source: ApiKeySource::Environment,
            }));
        }

        Ok(self
            .credentials
            .load()
            .await?
            .map(|credential| ResolvedCredential {
                credential,
                source: ApiKeySource::Stored,
            }))
    }

    /// Trim and check a query against the length cap
    ///
    /// # Errors
    ///
    /// Returns `EmptyQuery` or `QueryTooLong`.
    pub fn validate_query<'q>(&self, query: &'q str) -> Result<&'q str, SubmitError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(SubmitError::EmptyQuery);
        }
        let length = trimmed.chars().count();
        if length > self.max_query_chars {
            return Err(SubmitError::QueryTooLong {
                length,
                max: self.max_query_chars,
            });
        }
        Ok(trimmed)
    }

    /// Run the full pipeline for a query
    ///
    /// Fragments of each stage are handed to the matching callback as they arrive.
    ///
    /// # Errors
    ///
    /// Returns a validation error, `MissingCredential`, `Busy`, or the pipeline failure.
    pub async fn submit(
        &self,
        query: &str,
        on_helpful_chunk: &mut (dyn FnMut(&str) + Send),
        on_karen_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> Result<Conversation, SubmitError> {
        let query = self.validate_query(query)?;
        let _guard = BusyGuard::acquire(&self.busy).ok_or(SubmitError::Busy)?;

        let resolved = self
            .resolve_credential()
            .await?
            .ok_or(SubmitError::MissingCredential)?;
        debug!(source = resolved.source.description(), "Using API key");

        let outcome = self
            .pipeline
            .run(query, &resolved.credential, on_helpful_chunk, on_karen_chunk)
            .await;

        let conversation = match outcome {
            Ok(conversation) => conversation,
            Err(error) => {
                if error.is_credential() {
                    self.discard_rejected_credential(resolved.source).await;
                }
                return Err(error.into());
            }
        };

        if let Err(e) = self.conversations.append(&conversation).await {
            warn!(error = %e, "Failed to save conversation to history");
        }
        match self.counters.increment_run().await {
            Ok(runs) => info!(runs, "Run recorded"),
            Err(e) => warn!(error = %e, "Failed to update run counter"),
        }

        Ok(conversation)
    }

    async fn discard_rejected_credential(&self, source: ApiKeySource) {
        match source {
            ApiKeySource::Environment => {
                warn!("API key from the environment was rejected; unset or replace GEMINI_API_KEY");
            }
            ApiKeySource::Stored => match self.credentials.clear().await {
                Ok(_) => info!("Removed rejected API key from the local store"),
                Err(e) => warn!(error = %e, "Failed to remove rejected API key"),
            },
        }
    }

    /// Past conversations, most recent first
    pub async fn history(&self) -> Vec<Conversation> {
        self.conversations.list().await
    }

    /// A single past conversation
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn find_conversation(&self, id: i64) -> AppResult<Option<Conversation>> {
        self.conversations.find(id).await
    }

    /// Remove every past conversation
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn clear_history(&self) -> AppResult<u64> {
        let removed = self.conversations.clear().await?;
        info!(removed, "History cleared");
        Ok(removed)
    }

    /// Visit and run counters
    pub async fn usage_stats(&self) -> UsageStats {
        self.counters.read().await
    }

    /// Save a new key, optionally checking it with the provider first
    ///
    /// # Errors
    ///
    /// Returns a `Credential` pipeline error when verification rejects the key,
    /// a `Service` error when verification cannot complete, and `Unexpected`
    /// when the key cannot be stored.
    pub async fn set_credential(
        &self,
        credential: &Credential,
        verify: bool,
    ) -> Result<(), SubmitError> {
        if verify {
            self.pipeline.verify_credential(credential).await?;
        }
        self.credentials.store(credential).await?;
        if self.env_credential.is_some() {
            warn!("GEMINI_API_KEY is set and takes precedence over the stored key");
        }
        Ok(())
    }

    /// Forget the stored key, returning whether one was present
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    pub async fn clear_credential(&self) -> AppResult<bool> {
        self.credentials.clear().await
    }
}
