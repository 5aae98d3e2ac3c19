// ABOUTME: Ask command for the karenifier CLI
// ABOUTME: Streams the helpful answer and then Karen's rephrasing to stdout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

use anyhow::{anyhow, bail, Result};
use karenifier::constants::EXAMPLE_QUERIES;
use karenifier::llm::prompts::Persona;
use karenifier::models::ApiKeySource;
use karenifier::service::{KarenifierService, SubmitError};
use tracing::info;

use crate::helpers::display::{print_fragment, print_heading};

/// Pick the query from `--example` or the positional words
pub fn resolve_query(example: Option<usize>, words: &[String]) -> Result<String> {
    match example {
        Some(number) => EXAMPLE_QUERIES
            .get(number.wrapping_sub(1))
            .map(|query| (*query).to_owned())
            .ok_or_else(|| {
                anyhow!(
                    "Example {number} does not exist; choose 1 to {}",
                    EXAMPLE_QUERIES.len()
                )
            }),
        None => Ok(words.join(" ")),
    }
}

/// Run the pipeline for one query
pub async fn run(service: &KarenifierService, query: &str) -> Result<()> {
    service
        .validate_query(query)
        .map_err(|e| anyhow!(e.user_message()))?;

    // Resolved up front so a rejected key can be reported by where it came from
    let source = service.resolve_credential().await?.map(|r| r.source);

    print_heading(Persona::Helpful.label());
    let mut on_helpful = |text: &str| print_fragment(text);
    let mut karen_started = false;
    let mut on_karen = |text: &str| {
        if !karen_started {
            karen_started = true;
            println!();
            print_heading(Persona::Karen.label());
        }
        print_fragment(text);
    };

    match service.submit(query, &mut on_helpful, &mut on_karen).await {
        Ok(conversation) => {
            println!();
            info!(conversation_id = conversation.id, "Conversation saved");
            Ok(())
        }
        Err(SubmitError::MissingCredential) => {
            bail!("No API key is configured. Run `karenifier key set` or set GEMINI_API_KEY.")
        }
        Err(error) if error.is_credential() => {
            println!();
            let advice = match source {
                Some(ApiKeySource::Environment) => "Update GEMINI_API_KEY and try again.",
                _ => "The stored key was removed. Run `karenifier key set` to add a new one.",
            };
            bail!("{} {advice}", error.user_message())
        }
        Err(error) => {
            println!();
            bail!("{}", error.user_message())
        }
    }
}
