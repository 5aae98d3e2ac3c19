// ABOUTME: Integration tests for the two-stage helpful-then-Karen response pipeline
// ABOUTME: Verifies stage ordering, fragment delivery, prompt construction, and failure classification
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::{Arc, Mutex};

use common::{create_test_pipeline, init_test_logging, test_credential, MockProvider, MockResponse};
use futures_util::StreamExt;
use karenifier::errors::AppError;
use karenifier::llm::prompts::{Persona, KAREN_SYSTEM_PROMPT};
use karenifier::pipeline::{PipelineError, INVALID_CREDENTIAL_MESSAGE, NETWORK_ERROR_MESSAGE};

const HELPFUL_SUFFIX: &str = "\n\n(Please provide a helpful, concise response under 200 words).";

#[tokio::test]
async fn test_latte_run_streams_both_stages_in_order() {
    init_test_logging();
    let provider = Arc::new(MockProvider::new(vec![
        MockResponse::text(&["Lattes ", "cool ", "quickly."]),
        MockResponse::text(&["Oh, ", "honey."]),
    ]));
    let pipeline = create_test_pipeline(&provider);

    let mut helpful_seen = Vec::new();
    let mut karen_seen = Vec::new();
    let conversation = pipeline
        .run(
            "Why is my latte cold?",
            &test_credential(),
            &mut |t: &str| helpful_seen.push(t.to_owned()),
            &mut |t: &str| karen_seen.push(t.to_owned()),
        )
        .await
        .unwrap();

    assert_eq!(helpful_seen, vec!["Lattes ", "cool ", "quickly."]);
    assert_eq!(karen_seen, vec!["Oh, ", "honey."]);
    assert_eq!(conversation.query, "Why is my latte cold?");
    assert_eq!(conversation.helpful_response, "Lattes cool quickly.");
    assert_eq!(conversation.karen_response, "Oh, honey.");

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);

    let helpful = &requests[0];
    assert_eq!(helpful.system_instruction(), None);
    assert_eq!(
        helpful.prompt(),
        Some(format!("Why is my latte cold?{HELPFUL_SUFFIX}").as_str())
    );
    assert_eq!(helpful.max_tokens, Some(250));
    assert_eq!(helpful.model.as_deref(), Some("mock-model"));

    let karen = &requests[1];
    assert_eq!(karen.system_instruction(), Some(KAREN_SYSTEM_PROMPT));
    assert_eq!(
        karen.prompt(),
        Some(
            "Here is a dreadfully earnest response my assistant provided: \"Lattes cool quickly.\". \
             Now, rephrase it with the wit and disdain it so clearly deserves."
        )
    );
    assert_eq!(karen.max_tokens, Some(200));
    assert_eq!(provider.credentials_seen(), vec!["test-api-key", "test-api-key"]);
}

#[tokio::test]
async fn test_every_helpful_fragment_precedes_first_karen_fragment() {
    init_test_logging();
    let provider = Arc::new(MockProvider::new(vec![
        MockResponse::text(&["Lattes ", "cool quickly ", "due to low thermal mass."]),
        MockResponse::text(&["Oh, ", "honestly, ", "a cold latte? ", "Speak to my barista."]),
    ]));
    let pipeline = create_test_pipeline(&provider);

    let events = Mutex::new(Vec::new());
    pipeline
        .run(
            "Why is my latte cold?",
            &test_credential(),
            &mut |t: &str| events.lock().unwrap().push(("helpful", t.to_owned())),
            &mut |t: &str| events.lock().unwrap().push(("karen", t.to_owned())),
        )
        .await
        .unwrap();

    let events = events.into_inner().unwrap();
    let stages: Vec<&str> = events.iter().map(|(stage, _)| *stage).collect();
    assert_eq!(
        stages,
        vec!["helpful", "helpful", "helpful", "karen", "karen", "karen", "karen"]
    );
    assert_eq!(events[2].1, "due to low thermal mass.");
    assert_eq!(events[3].1, "Oh, ");
}

#[tokio::test]
async fn test_helpful_credential_failure_skips_karen_stage() {
    init_test_logging();
    let provider = Arc::new(MockProvider::new(vec![MockResponse::OpenError(
        AppError::external_auth("Gemini", "API key not valid. Please pass a valid API key."),
    )]));
    let pipeline = create_test_pipeline(&provider);

    let mut karen_calls = 0;
    let error = pipeline
        .run("hi", &test_credential(), &mut |_: &str| {}, &mut |_: &str| karen_calls += 1)
        .await
        .unwrap_err();

    assert!(error.is_credential());
    assert_eq!(error.user_message(), INVALID_CREDENTIAL_MESSAGE);
    assert_eq!(provider.call_count(), 1);
    assert_eq!(karen_calls, 0);
}

#[tokio::test]
async fn test_karen_failure_keeps_delivered_helpful_fragments() {
    init_test_logging();
    let provider = Arc::new(MockProvider::new(vec![
        MockResponse::text(&["Answer."]),
        MockResponse::Stream(vec![
            Ok("Well".to_owned()),
            Err(AppError::external_service("Gemini", "Gemini API error (500): overloaded")),
        ]),
    ]));
    let pipeline = create_test_pipeline(&provider);

    let mut helpful_seen = Vec::new();
    let mut karen_seen = Vec::new();
    let error = pipeline
        .run(
            "q",
            &test_credential(),
            &mut |t: &str| helpful_seen.push(t.to_owned()),
            &mut |t: &str| karen_seen.push(t.to_owned()),
        )
        .await
        .unwrap_err();

    assert!(matches!(error, PipelineError::Service { .. }));
    assert!(error.user_message().contains("overloaded"));
    assert_eq!(helpful_seen, vec!["Answer."]);
    assert_eq!(karen_seen, vec!["Well"]);
}

#[tokio::test]
async fn test_mid_stream_invalid_key_text_is_credential_failure() {
    init_test_logging();
    let provider = Arc::new(MockProvider::new(vec![MockResponse::Stream(vec![Err(
        AppError::external_service("Gemini", "API key not valid"),
    )])]));
    let pipeline = create_test_pipeline(&provider);

    let error = pipeline
        .run_helpful_stage("q", &test_credential(), &mut |_: &str| {})
        .await
        .unwrap_err();

    assert!(error.is_credential());
}

#[tokio::test]
async fn test_network_failure_is_service_error_with_network_message() {
    init_test_logging();
    let provider = Arc::new(MockProvider::new(vec![MockResponse::OpenError(
        AppError::external_unavailable("Gemini", "fetch failed: connection refused"),
    )]));
    let pipeline = create_test_pipeline(&provider);

    let error = pipeline
        .run_helpful_stage("q", &test_credential(), &mut |_: &str| {})
        .await
        .unwrap_err();

    assert_eq!(error, PipelineError::service(NETWORK_ERROR_MESSAGE));
}

#[tokio::test]
async fn test_empty_helpful_answer_fails_karen_stage_without_calling_provider() {
    init_test_logging();
    let provider = Arc::new(MockProvider::new(vec![MockResponse::text(&[])]));
    let pipeline = create_test_pipeline(&provider);

    let error = pipeline
        .run("q", &test_credential(), &mut |_: &str| {}, &mut |_: &str| {})
        .await
        .unwrap_err();

    assert!(matches!(error, PipelineError::Service { .. }));
    assert_eq!(provider.call_count(), 1);
}

#[tokio::test]
async fn test_empty_fragments_are_not_delivered() {
    init_test_logging();
    let provider = Arc::new(MockProvider::new(vec![MockResponse::text(&["", "a", "", "b"])]));
    let pipeline = create_test_pipeline(&provider);

    let mut seen = Vec::new();
    let text = pipeline
        .run_helpful_stage("q", &test_credential(), &mut |t: &str| seen.push(t.to_owned()))
        .await
        .unwrap();

    assert_eq!(seen, vec!["a", "b"]);
    assert_eq!(text, "ab");
}

#[tokio::test]
async fn test_multibyte_fragments_concatenate_exactly() {
    init_test_logging();
    let fragments = ["Caf\u{e9} ", "\u{2615} ", "\u{1F485}"];
    let provider = Arc::new(MockProvider::new(vec![MockResponse::text(&fragments)]));
    let pipeline = create_test_pipeline(&provider);

    let text = pipeline
        .run_helpful_stage("q", &test_credential(), &mut |_: &str| {})
        .await
        .unwrap();

    assert_eq!(text, fragments.concat());
}

#[tokio::test]
async fn test_karen_stage_embeds_text_verbatim() {
    init_test_logging();
    let provider = Arc::new(MockProvider::new(vec![MockResponse::text(&["fine."])]));
    let pipeline = create_test_pipeline(&provider);
    let helpful = "Use \"quotes\" and\nnewlines { braces }";

    pipeline
        .run_karen_stage(helpful, &test_credential(), &mut |_: &str| {})
        .await
        .unwrap();

    let requests = provider.requests();
    assert!(requests[0].prompt().unwrap().contains(helpful));
}

#[tokio::test]
async fn test_stage_stream_is_pull_based() {
    init_test_logging();
    let provider = Arc::new(MockProvider::new(vec![MockResponse::Stream(vec![
        Ok("one ".to_owned()),
        Ok("two".to_owned()),
        Err(AppError::external_service("Gemini", "boom")),
        Ok("never".to_owned()),
    ])]));
    let pipeline = create_test_pipeline(&provider);

    let items: Vec<_> = pipeline
        .stage_stream(Persona::Helpful, "q", &test_credential())
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(items.len(), 3);
    assert_eq!(items[0], Ok("one ".to_owned()));
    assert_eq!(items[1], Ok("two".to_owned()));
    assert!(items[2].is_err());
}

#[tokio::test]
async fn test_verify_credential_maps_refusal() {
    init_test_logging();
    let accepting = Arc::new(MockProvider::new(vec![]));
    assert!(create_test_pipeline(&accepting)
        .verify_credential(&test_credential())
        .await
        .is_ok());

    let rejecting = Arc::new(MockProvider::new(vec![]).rejecting_key());
    let error = create_test_pipeline(&rejecting)
        .verify_credential(&test_credential())
        .await
        .unwrap_err();
    assert!(error.is_credential());
}
