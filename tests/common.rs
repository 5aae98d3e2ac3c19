// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides a scripted LLM provider, in-memory databases, and a one-shot HTTP server
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors
#![allow(
    dead_code,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
//! Shared test utilities for `karenifier`

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use futures_util::stream;
use karenifier::database::Database;
use karenifier::errors::AppError;
use karenifier::llm::{ChatRequest, ChatStream, LlmProvider, StreamChunk};
use karenifier::models::Credential;
use karenifier::pipeline::ResponsePipeline;
use karenifier::service::KarenifierService;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Standard test database setup
pub async fn create_test_database() -> Database {
    init_test_logging();
    Database::new("sqlite::memory:")
        .await
        .expect("in-memory database should open")
}

pub fn test_credential() -> Credential {
    Credential::new("test-api-key").unwrap()
}

// ============================================================================
// Scripted provider
// ============================================================================

/// What the mock returns for one `complete_stream` call
pub enum MockResponse {
    /// Open successfully and yield these items in order
    Stream(Vec<Result<String, AppError>>),
    /// Refuse to open the stream
    OpenError(AppError),
}

impl MockResponse {
    pub fn text(fragments: &[&str]) -> Self {
        Self::Stream(fragments.iter().map(|f| Ok((*f).to_owned())).collect())
    }
}

/// Provider that replays scripted responses and records every request
#[derive(Default)]
pub struct MockProvider {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<ChatRequest>>,
    credentials_seen: Mutex<Vec<String>>,
    rejects_key: bool,
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl MockProvider {
    pub fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    /// `health_check` reports the key as refused
    pub fn rejecting_key(mut self) -> Self {
        self.rejects_key = true;
        self
    }

    /// Each call signals `started` then waits for `release` before streaming
    pub fn gated(mut self, started: Arc<Notify>, release: Arc<Notify>) -> Self {
        self.gate = Some((started, release));
        self
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn credentials_seen(&self) -> Vec<String> {
        self.credentials_seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn default_model(&self) -> &str {
        "mock-model"
    }

    async fn complete_stream(
        &self,
        request: &ChatRequest,
        credential: &Credential,
    ) -> Result<ChatStream, AppError> {
        self.requests.lock().unwrap().push(request.clone());
        self.credentials_seen
            .lock()
            .unwrap()
            .push(credential.expose().to_owned());

        if let Some((started, release)) = &self.gate {
            started.notify_one();
            release.notified().await;
        }

        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AppError::internal("no scripted response left"))?;

        match response {
            MockResponse::OpenError(error) => Err(error),
            MockResponse::Stream(items) => {
                let clean_finish = items.iter().all(Result::is_ok);
                let mut chunks: Vec<Result<StreamChunk, AppError>> = items
                    .into_iter()
                    .map(|item| item.map(StreamChunk::text))
                    .collect();
                if clean_finish {
                    chunks.push(Ok(StreamChunk {
                        delta: String::new(),
                        is_final: true,
                        finish_reason: Some("STOP".to_owned()),
                    }));
                }
                Ok(Box::pin(stream::iter(chunks)))
            }
        }
    }

    async fn health_check(&self, _credential: &Credential) -> Result<bool, AppError> {
        Ok(!self.rejects_key)
    }
}

pub fn create_test_pipeline(provider: &Arc<MockProvider>) -> ResponsePipeline {
    ResponsePipeline::new(provider.clone(), "mock-model")
}

pub fn create_test_service(provider: &Arc<MockProvider>, database: &Database) -> KarenifierService {
    KarenifierService::with_database(create_test_pipeline(provider), database)
}

// ============================================================================
// One-shot HTTP server
// ============================================================================

/// Raw request received by [`serve_once`]
#[derive(Debug)]
pub struct CapturedRequest {
    /// Request line and headers
    pub head: String,
    /// Request body
    pub body: String,
}

impl CapturedRequest {
    pub fn request_line(&self) -> &str {
        self.head.lines().next().unwrap_or_default()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.lines().skip(1).find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then_some(value.trim())
        })
    }
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Serve exactly one HTTP response on a random local port
///
/// Returns the base URL and a receiver for the captured request.
pub async fn serve_once(
    status: u16,
    content_type: &'static str,
    body: String,
) -> (String, oneshot::Receiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buffer = Vec::new();
        let mut chunk = [0_u8; 4096];

        let header_end = loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break buffer.len();
            }
            buffer.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find_subsequence(&buffer, b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (key, value) = line.split_once(':')?;
                if key.trim().eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);

        while buffer.len() < header_end + content_length {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..n]);
        }
        let request_body = String::from_utf8_lossy(&buffer[header_end..]).into_owned();

        let reason = match status {
            200 => "OK",
            400 => "Bad Request",
            403 => "Forbidden",
            429 => "Too Many Requests",
            _ => "Internal Server Error",
        };
        let response = format!(
            "HTTP/1.1 {status} {reason}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();

        tx.send(CapturedRequest {
            head,
            body: request_body,
        })
        .ok();
    });

    (format!("http://{addr}"), rx)
}

/// Gemini SSE body made of one event per text fragment, the last one carrying `STOP`
pub fn gemini_sse_body(fragments: &[&str]) -> String {
    let last = fragments.len().saturating_sub(1);
    fragments
        .iter()
        .enumerate()
        .map(|(index, text)| {
            let mut candidate = serde_json::json!({
                "content": { "role": "model", "parts": [{ "text": text }] }
            });
            if index == last {
                candidate["finishReason"] = serde_json::json!("STOP");
            }
            format!("data: {}\r\n\r\n", serde_json::json!({ "candidates": [candidate] }))
        })
        .collect()
}
