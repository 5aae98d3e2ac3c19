// ABOUTME: Google Gemini provider implementation streaming over the generateContent SSE API
// ABOUTME: Maps Gemini HTTP and payload errors onto credential vs service failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

//! # Gemini Provider
//!
//! Implementation of the `LlmProvider` trait for Google's Gemini models using
//! `models/{model}:streamGenerateContent?alt=sse`.
//!
//! The API key travels in the `x-goog-api-key` header, never in the URL, so it
//! cannot leak through logged request URLs or transport error messages.
//!
//! ## Example
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use karenifier::llm::{ChatMessage, ChatRequest, GeminiProvider, LlmProvider};
//! use karenifier_core::errors::AppError;
//! use karenifier_core::models::Credential;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AppError> {
//!     let provider = GeminiProvider::new()?;
//!     let credential = Credential::new(std::env::var("GEMINI_API_KEY").unwrap_or_default())?;
//!     let request = ChatRequest::new(vec![ChatMessage::user("What is a latte?")]);
//!     let mut stream = provider.complete_stream(&request, &credential).await?;
//!     while let Some(chunk) = stream.next().await {
//!         print!("{}", chunk?.delta);
//!     }
//!     Ok(())
//! }
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use async_trait::async_trait;
use karenifier_core::constants::{defaults, limits, service_names};
use karenifier_core::errors::{AppError, ErrorCode};
use karenifier_core::models::Credential;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use super::sse_parser::{create_sse_stream, transport_error};
use super::{ChatMessage, ChatRequest, ChatStream, LlmProvider, MessageRole, StreamChunk};

/// Header carrying the API key
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Substring Gemini uses when rejecting a malformed or unknown key
const INVALID_KEY_MARKER: &str = "API key not valid";

// ============================================================================
// API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ContentPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    /// Set on thought-summary parts, which are not part of the answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    thought: Option<bool>,
}

impl ContentPart {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_owned()),
            thought: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    candidate_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

/// One SSE payload of a streamed response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamingResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<GeminiError>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    code: Option<u16>,
    message: String,
    #[serde(default)]
    status: Option<String>,
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Google Gemini LLM provider
pub struct GeminiProvider {
    client: Client,
    base_url: String,
    default_model: String,
}

impl GeminiProvider {
    /// Create a provider against the public Gemini endpoint with default settings
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new() -> Result<Self, AppError> {
        Self::with_settings(
            defaults::GEMINI_API_BASE_URL,
            defaults::GEMINI_MODEL,
            Duration::from_secs(limits::DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Create a provider with an explicit base URL, model and request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_settings(
        base_url: impl Into<String>,
        default_model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            default_model: default_model.into(),
        })
    }

    fn build_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{model}:{method}", self.base_url)
    }

    /// Convert chat messages to Gemini contents plus the separate system instruction
    fn convert_messages(messages: &[ChatMessage]) -> (Vec<GeminiContent>, Option<GeminiContent>) {
        let mut contents = Vec::new();
        let mut system_instruction = None;

        for message in messages {
            let part = ContentPart::text(&message.content);
            match message.role {
                MessageRole::System => {
                    system_instruction = Some(GeminiContent {
                        role: None,
                        parts: vec![part],
                    });
                }
                MessageRole::User => contents.push(GeminiContent {
                    role: Some("user".to_owned()),
                    parts: vec![part],
                }),
            }
        }

        (contents, system_instruction)
    }

    fn build_gemini_request(request: &ChatRequest) -> GeminiRequest {
        let (contents, system_instruction) = Self::convert_messages(&request.messages);

        let has_generation_settings =
            request.max_tokens.is_some() || request.thinking_budget.is_some();

        let generation_config = has_generation_settings.then(|| GenerationConfig {
            max_output_tokens: request.max_tokens,
            candidate_count: 1,
            thinking_config: request
                .thinking_budget
                .map(|thinking_budget| ThinkingConfig { thinking_budget }),
        });

        GeminiRequest {
            contents,
            system_instruction,
            generation_config,
        }
    }

    /// Serialize the wire request for a chat request
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn request_body(request: &ChatRequest) -> Result<serde_json::Value, AppError> {
        Ok(serde_json::to_value(Self::build_gemini_request(request))?)
    }

    /// Parse one SSE `data:` payload of a streamed response
    ///
    /// Returns `None` for payloads with no answer text and no finish reason
    /// (thought summaries, metadata-only events). A payload that is not a
    /// valid response object is an error and ends the stream.
    #[must_use]
    pub fn parse_stream_event(json_str: &str) -> Option<Result<StreamChunk, AppError>> {
        let response = match serde_json::from_str::<StreamingResponse>(json_str) {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Malformed Gemini streaming chunk");
                return Some(Err(AppError::new(
                    ErrorCode::SerializationError,
                    format!("Malformed response from Gemini: {e}"),
                )
                .with_source(e)));
            }
        };

        if let Some(error) = response.error {
            let status = error.code.unwrap_or_default();
            return Some(Err(Self::classify_api_error(status, &error)));
        }

        let candidate = response.candidates?.into_iter().next()?;
        let delta: String = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter(|part| part.thought != Some(true))
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();

        if delta.is_empty() && candidate.finish_reason.is_none() {
            return None;
        }

        Some(Ok(StreamChunk {
            delta,
            is_final: candidate.finish_reason.is_some(),
            finish_reason: candidate.finish_reason,
        }))
    }

    /// Map a non-success HTTP response to the error taxonomy
    #[must_use]
    pub fn map_api_error(status: u16, response_text: &str) -> AppError {
        let parsed = serde_json::from_str::<ErrorEnvelope>(response_text)
            .ok()
            .and_then(|envelope| envelope.error);

        match parsed {
            Some(error) => Self::classify_api_error(status, &error),
            None => Self::classify_api_error(
                status,
                &GeminiError {
                    code: Some(status),
                    message: response_text.to_owned(),
                    status: None,
                },
            ),
        }
    }

    fn classify_api_error(status: u16, error: &GeminiError) -> AppError {
        let message = error.message.as_str();
        let status_name = error.status.as_deref().unwrap_or_default();

        let credential_rejected = matches!(status, 401 | 403)
            || status_name == "PERMISSION_DENIED"
            || status_name == "UNAUTHENTICATED"
            || message.contains(INVALID_KEY_MARKER);

        if credential_rejected {
            return AppError::external_auth(service_names::GEMINI, message);
        }

        if status == 429 || status_name == "RESOURCE_EXHAUSTED" {
            return AppError::new(
                ErrorCode::ExternalRateLimited,
                Self::extract_quota_message(message),
            );
        }

        AppError::external_service(
            service_names::GEMINI,
            format!("Gemini API error ({status}): {message}"),
        )
    }

    /// Turn Gemini's "Please retry in 6.4s." hint into a friendly message
    fn extract_quota_message(message: &str) -> String {
        const RETRY_PREFIX: &str = "Please retry in ";

        let seconds = message.find(RETRY_PREFIX).and_then(|pos| {
            let after = &message[pos + RETRY_PREFIX.len()..];
            let end = after.find('s')?;
            after[..end].parse::<f64>().ok()
        });

        match seconds {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            Some(seconds) => format!(
                "AI service quota exceeded. Please try again in {} seconds.",
                seconds.ceil() as u64
            ),
            None => "AI service quota exceeded. Please wait a moment and try again.".to_owned(),
        }
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    #[instrument(skip(self, request, credential), fields(model = %request.model.as_deref().unwrap_or(&self.default_model)))]
    async fn complete_stream(
        &self,
        request: &ChatRequest,
        credential: &Credential,
    ) -> Result<ChatStream, AppError> {
        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let url = self.build_url(model, "streamGenerateContent");
        let gemini_request = Self::build_gemini_request(request);

        debug!("Starting streaming request to Gemini API");

        let response = self
            .client
            .post(&url)
            .query(&[("alt", "sse")])
            .header(API_KEY_HEADER, credential.expose())
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| transport_error(service_names::GEMINI, &e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_owned());
            error!(status = %status, "Gemini API error");
            return Err(Self::map_api_error(status.as_u16(), &error_text));
        }

        Ok(create_sse_stream(
            response.bytes_stream(),
            Self::parse_stream_event,
            service_names::GEMINI,
        ))
    }

    #[instrument(skip(self, credential))]
    async fn health_check(&self, credential: &Credential) -> Result<bool, AppError> {
        let url = format!("{}/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, credential.expose())
            .send()
            .await
            .map_err(|e| transport_error(service_names::GEMINI, &e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }

        let error_text = response.text().await.unwrap_or_default();
        let error = Self::map_api_error(status.as_u16(), &error_text);
        if error.code.is_credential_failure() {
            debug!(status = %status, "Gemini rejected the API key");
            return Ok(false);
        }
        Err(error)
    }
}

impl Debug for GeminiProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .field("default_model", &self.default_model)
            .finish_non_exhaustive()
    }
}
