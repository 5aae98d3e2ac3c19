// ABOUTME: Line-buffering SSE (Server-Sent Events) parser for streamed LLM responses
// ABOUTME: Handles events split across reads, batched events, and multi-byte text on read boundaries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

//! # SSE Stream Parser
//!
//! Converts the raw byte stream of an HTTP response into provider chunks.
//!
//! TCP reads do not line up with SSE event boundaries, so the parser keeps
//! three guarantees:
//!
//! 1. **Batched events**: every event contained in one read is emitted, in order.
//! 2. **Split events**: a `data:` line cut across two reads is reassembled before
//!    it is handed to the provider's JSON parser.
//! 3. **Split characters**: bytes are buffered undecoded until a full line is
//!    available, so a multi-byte UTF-8 character cut across reads is not mangled.
//!
//! ```text
//! let stream = create_sse_stream(
//!     response.bytes_stream(),
//!     |json_str| { /* parse provider-specific JSON */ },
//!     "Gemini",
//! );
//! ```

use std::collections::VecDeque;
use std::mem;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::stream::unfold;
use futures_util::{Stream, StreamExt};
use karenifier_core::errors::{AppError, ErrorCode};

use super::{ChatStream, StreamChunk};

const DATA_PREFIX: &[u8] = b"data:";

/// A parsed SSE event from the stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// A `data:` payload with the prefix stripped
    Data(String),
    /// A `data:` payload whose bytes are not valid UTF-8
    InvalidUtf8,
}

/// Line buffer that turns arbitrary byte reads into complete SSE events
#[derive(Debug, Default)]
pub struct SseLineBuffer {
    pending: Vec<u8>,
}

impl SseLineBuffer {
    /// Create a new empty line buffer
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Feed one read worth of bytes, returning every event completed by it
    ///
    /// A trailing partial line stays buffered for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        self.pending.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(newline) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            events.extend(parse_line(&line));
        }
        events
    }

    /// Flush whatever remains once the byte stream has ended
    pub fn flush(&mut self) -> Vec<SseEvent> {
        let remaining = mem::take(&mut self.pending);
        parse_line(&remaining).into_iter().collect()
    }

    /// Whether a partial line is waiting for more bytes
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Parse a single SSE line
///
/// Empty lines separate events; `event:`, `id:`, `retry:` and `:` comment
/// lines carry nothing the providers need and are dropped.
fn parse_line(raw: &[u8]) -> Option<SseEvent> {
    let payload = raw.trim_ascii().strip_prefix(DATA_PREFIX)?.trim_ascii_start();
    if payload.is_empty() {
        return None;
    }
    match std::str::from_utf8(payload) {
        Ok(data) => Some(SseEvent::Data(data.to_owned())),
        Err(_) => Some(SseEvent::InvalidUtf8),
    }
}

/// Map a transport failure while reading the body to the error taxonomy
#[must_use]
pub fn transport_error(provider_name: &str, error: &reqwest::Error) -> AppError {
    if error.is_connect() || error.is_timeout() {
        AppError::external_unavailable(provider_name, format!("fetch failed: {error}"))
    } else {
        AppError::external_service(provider_name, format!("Stream read error: {error}"))
    }
}

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

struct SseStreamState<F> {
    bytes: ByteStream,
    parser: SseLineBuffer,
    pending: VecDeque<Result<StreamChunk, AppError>>,
    parse_data: F,
    provider_name: &'static str,
    finished: bool,
}

impl<F> SseStreamState<F>
where
    F: Fn(&str) -> Option<Result<StreamChunk, AppError>>,
{
    fn enqueue(&mut self, events: Vec<SseEvent>) {
        for event in events {
            match event {
                SseEvent::Data(json_str) => {
                    if let Some(result) = (self.parse_data)(&json_str) {
                        self.pending.push_back(result);
                    }
                }
                SseEvent::InvalidUtf8 => self.pending.push_back(Err(AppError::new(
                    ErrorCode::SerializationError,
                    format!(
                        "Malformed response from {}: payload is not valid UTF-8",
                        self.provider_name
                    ),
                ))),
            }
        }
    }
}

/// Create a chunk stream from a raw HTTP byte stream
///
/// `parse_data` converts one `data:` payload into a chunk; returning `None`
/// skips payloads that carry no output. The stream ends after the byte stream
/// ends, or right after the first error (a body read failure, a payload that
/// is not UTF-8, or a parse error returned by `parse_data`).
pub fn create_sse_stream<S, F>(byte_stream: S, parse_data: F, provider_name: &'static str) -> ChatStream
where
    S: Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    F: Fn(&str) -> Option<Result<StreamChunk, AppError>> + Send + 'static,
{
    let state = SseStreamState {
        bytes: Box::pin(byte_stream),
        parser: SseLineBuffer::new(),
        pending: VecDeque::new(),
        parse_data,
        provider_name,
        finished: false,
    };

    let stream = unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                if item.is_err() {
                    state.finished = true;
                    state.pending.clear();
                }
                return Some((item, state));
            }

            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(bytes)) => {
                    let events = state.parser.feed(&bytes);
                    state.enqueue(events);
                }
                Some(Err(e)) => {
                    state.finished = true;
                    let error = transport_error(state.provider_name, &e);
                    return Some((Err(error), state));
                }
                None => {
                    state.finished = true;
                    let events = state.parser.flush();
                    state.enqueue(events);
                }
            }
        }
    });

    // Empty non-final deltas carry nothing for the caller
    let filtered = stream.filter(|result| {
        futures_util::future::ready(
            result
                .as_ref()
                .map_or(true, |chunk| !chunk.delta.is_empty() || chunk.is_final),
        )
    });

    Box::pin(filtered)
}
