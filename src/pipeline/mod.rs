// ABOUTME: Two-stage response pipeline: a helpful answer, then Karen's rephrasing of it
// ABOUTME: Streams each stage's fragments to the caller and classifies stage failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

//! # Response Pipeline
//!
//! Runs two sequential streamed calls against an [`LlmProvider`]:
//!
//! 1. **Helpful**: the user's query wrapped in the helpful persona prompt.
//! 2. **Karen**: the complete helpful answer embedded verbatim in the Karen prompt.
//!
//! Stage 2 never starts before stage 1 has fully completed. Fragments are
//! delivered to the caller's callback in arrival order as they come off the
//! wire; a stage's result is the concatenation of exactly those fragments.

mod errors;

pub use errors::{
    classify_failure, PipelineError, INVALID_CREDENTIAL_MESSAGE, NETWORK_ERROR_MESSAGE,
};

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::pin::Pin;
use std::sync::Arc;

use futures_util::{future, Stream, StreamExt};
use karenifier_core::models::{Conversation, Credential};
use tracing::{debug, info, instrument, warn};

use crate::llm::prompts::Persona;
use crate::llm::LlmProvider;

/// Finite, single-pass stream of one stage's text fragments
pub type StageStream = Pin<Box<dyn Stream<Item = Result<String, PipelineError>> + Send>>;

/// Orchestrates the helpful and Karen stages against one provider
pub struct ResponsePipeline {
    provider: Arc<dyn LlmProvider>,
    model: String,
}

impl ResponsePipeline {
    /// Create a pipeline using an explicit model
    #[must_use]
    pub fn new(provider: Arc<dyn LlmProvider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Create a pipeline using the provider's default model
    #[must_use]
    pub fn with_default_model(provider: Arc<dyn LlmProvider>) -> Self {
        let model = provider.default_model().to_owned();
        Self { provider, model }
    }

    /// Model used for both stages
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Ask the provider whether it accepts a credential
    ///
    /// # Errors
    ///
    /// Returns `Credential` when the key is refused, `Service` when the check
    /// itself fails.
    pub async fn verify_credential(&self, credential: &Credential) -> Result<(), PipelineError> {
        let accepted = self
            .provider
            .health_check(credential)
            .await
            .map_err(|e| classify_failure(&e))?;

        if accepted {
            Ok(())
        } else {
            Err(PipelineError::credential())
        }
    }

    /// Open one stage as a pull-based stream of text fragments
    ///
    /// Empty fragments are skipped. The stream ends after the provider
    /// finishes, or right after the first error.
    ///
    /// # Errors
    ///
    /// Returns a `Service` error for empty input, and a classified error when
    /// the provider refuses to open the stream.
    pub async fn stage_stream(
        &self,
        persona: Persona,
        input: &str,
        credential: &Credential,
    ) -> Result<StageStream, PipelineError> {
        if input.trim().is_empty() {
            return Err(PipelineError::service(format!(
                "Nothing to send to the {} stage",
                persona.label()
            )));
        }

        let request = persona.config().build_request(input, &self.model);
        let chunks = self
            .provider
            .complete_stream(&request, credential)
            .await
            .map_err(|e| {
                warn!(stage = persona.label(), error = %e, "Stage failed to start");
                classify_failure(&e)
            })?;

        let mut failed = false;
        let fragments = chunks
            .take_while(move |item| {
                let keep = !failed;
                failed |= item.is_err();
                future::ready(keep)
            })
            .filter_map(move |item| {
                future::ready(match item {
                    Ok(chunk) if chunk.delta.is_empty() => None,
                    Ok(chunk) => Some(Ok(chunk.delta)),
                    Err(e) => {
                        warn!(stage = persona.label(), error = %e, "Stage failed mid-stream");
                        Some(Err(classify_failure(&e)))
                    }
                })
            });

        Ok(Box::pin(fragments))
    }

    async fn run_stage(
        &self,
        persona: Persona,
        input: &str,
        credential: &Credential,
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> Result<String, PipelineError> {
        let mut fragments = self.stage_stream(persona, input, credential).await?;
        let mut text = String::new();
        let mut count = 0_usize;

        while let Some(fragment) = fragments.next().await {
            let fragment = fragment?;
            on_chunk(&fragment);
            text.push_str(&fragment);
            count += 1;
        }

        debug!(
            stage = persona.label(),
            fragments = count,
            chars = text.chars().count(),
            "Stage completed"
        );
        Ok(text)
    }

    /// Stream the helpful answer to a query
    ///
    /// # Errors
    ///
    /// Returns `Credential` when the provider refuses the key, `Service` otherwise.
    pub async fn run_helpful_stage(
        &self,
        query: &str,
        credential: &Credential,
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> Result<String, PipelineError> {
        self.run_stage(Persona::Helpful, query, credential, on_chunk)
            .await
    }

    /// Stream Karen's rephrasing of a complete helpful answer
    ///
    /// # Errors
    ///
    /// Returns `Service` for an empty answer, otherwise as for the helpful stage.
    pub async fn run_karen_stage(
        &self,
        helpful_text: &str,
        credential: &Credential,
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> Result<String, PipelineError> {
        self.run_stage(Persona::Karen, helpful_text, credential, on_chunk)
            .await
    }

    /// Run both stages and produce the conversation record
    ///
    /// Nothing is produced unless both stages succeed. Fragments already
    /// delivered from the helpful stage stand even if the Karen stage fails.
    ///
    /// # Errors
    ///
    /// Returns the first stage failure.
    #[instrument(skip_all, fields(model = %self.model, provider = self.provider.name()))]
    pub async fn run(
        &self,
        query: &str,
        credential: &Credential,
        on_helpful_chunk: &mut (dyn FnMut(&str) + Send),
        on_karen_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> Result<Conversation, PipelineError> {
        let helpful = self
            .run_helpful_stage(query, credential, on_helpful_chunk)
            .await?;
        let karen = self
            .run_karen_stage(&helpful, credential, on_karen_chunk)
            .await?;

        let conversation = Conversation::new(query, helpful, karen);
        info!(conversation_id = conversation.id, "Pipeline run completed");
        Ok(conversation)
    }
}

impl Debug for ResponsePipeline {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ResponsePipeline")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .finish()
    }
}
