// ABOUTME: LLM provider abstraction for streamed text generation against a hosted model API
// ABOUTME: Defines the request/stream types and the LlmProvider contract used by the pipeline
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

//! # LLM Provider Interface
//!
//! This module defines the contract the response pipeline uses to talk to a
//! hosted text-generation API.
//!
//! ## Key Concepts
//!
//! - **`LlmProvider`**: Async trait opening a streamed completion for a request
//! - **`ChatMessage`**: Role-based message structure
//! - **`ChatRequest`**: Model, output cap and thinking budget for one call
//!
//! The credential is never stored on a provider. It is passed to every call so
//! the same provider instance can serve whichever key the caller currently holds.
//!
//! ## Example: Streaming a Completion
//!
//! ```rust,no_run
//! use futures_util::StreamExt;
//! use karenifier::llm::{ChatMessage, ChatRequest, LlmProvider};
//! use karenifier_core::models::Credential;
//!
//! async fn example(provider: &dyn LlmProvider, credential: &Credential) {
//!     let request = ChatRequest::new(vec![ChatMessage::user("Why is my latte cold?")]);
//!     if let Ok(mut stream) = provider.complete_stream(&request, credential).await {
//!         while let Some(Ok(chunk)) = stream.next().await {
//!             print!("{}", chunk.delta);
//!         }
//!     }
//! }
//! ```

mod gemini;
pub mod prompts;
pub mod sse_parser;

pub use gemini::GeminiProvider;
pub use prompts::PersonaConfig;

use std::pin::Pin;

use async_trait::async_trait;
use karenifier_core::errors::AppError;
use karenifier_core::models::Credential;
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;

// ============================================================================
// Message Types
// ============================================================================

/// Role of a message in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instruction message
    System,
    /// User input message
    User,
}

/// A single message in a chat conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender
    pub role: MessageRole,
    /// Content of the message
    pub content: String,
}

impl ChatMessage {
    /// Create a new chat message
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a system message
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Create a user message
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }
}

// ============================================================================
// Request/Stream Types
// ============================================================================

/// Configuration for a single streamed completion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// Conversation messages (system instruction first, if any)
    pub messages: Vec<ChatMessage>,
    /// Model identifier (provider-specific)
    pub model: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
    /// Tokens the model may spend thinking before answering
    pub thinking_budget: Option<u32>,
}

impl ChatRequest {
    /// Create a new chat request with messages
    #[must_use]
    pub const fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
            max_tokens: None,
            thinking_budget: None,
        }
    }

    /// Set the model to use
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the maximum tokens
    #[must_use]
    pub const fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Set the thinking budget
    #[must_use]
    pub const fn with_thinking_budget(mut self, budget: u32) -> Self {
        self.thinking_budget = Some(budget);
        self
    }

    /// The system instruction, if the request carries one
    #[must_use]
    pub fn system_instruction(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
    }

    /// The last user message, which carries the prompt text
    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
    }
}

/// A chunk of a streaming response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Content delta for this chunk
    pub delta: String,
    /// Whether this is the final chunk
    pub is_final: bool,
    /// Finish reason if final
    pub finish_reason: Option<String>,
}

impl StreamChunk {
    /// A non-final text fragment
    #[must_use]
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            is_final: false,
            finish_reason: None,
        }
    }
}

/// Stream type for chat completion responses
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, AppError>> + Send>>;

// ============================================================================
// Provider Trait
// ============================================================================

/// Remote text-generation client
///
/// A stream returned from [`LlmProvider::complete_stream`] is finite and
/// single-pass: it yields fragments in generation order and ends when the
/// provider signals completion. Failures, before or during streaming, are
/// reported as `AppError` whose `ErrorCode` distinguishes credential refusals
/// from other service failures.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Unique provider identifier (e.g., "gemini")
    fn name(&self) -> &'static str;

    /// Default model to use if not specified in request
    fn default_model(&self) -> &str;

    /// Open a streamed completion
    async fn complete_stream(
        &self,
        request: &ChatRequest,
        credential: &Credential,
    ) -> Result<ChatStream, AppError>;

    /// Check whether the credential is accepted by the provider
    async fn health_check(&self, credential: &Credential) -> Result<bool, AppError>;
}
