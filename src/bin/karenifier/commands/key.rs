// ABOUTME: API key commands for the karenifier CLI
// ABOUTME: Stores (optionally verified), clears, and reports the Gemini API key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

use anyhow::{Context, Result};
use karenifier::models::Credential;
use karenifier::service::KarenifierService;
use tokio::io::{self, AsyncBufReadExt, BufReader};
use zeroize::Zeroizing;

async fn read_key_from_stdin() -> Result<Zeroizing<String>> {
    eprint!("Gemini API key: ");
    let mut line = Zeroizing::new(String::new());
    BufReader::new(io::stdin())
        .read_line(&mut line)
        .await
        .context("Failed to read API key from stdin")?;
    Ok(line)
}

/// Store a key
pub async fn set(service: &KarenifierService, key: Option<String>, verify: bool) -> Result<()> {
    let raw = match key {
        Some(key) => Zeroizing::new(key),
        None => read_key_from_stdin().await?,
    };
    let credential = Credential::new(raw.as_str())?;

    if verify {
        println!("Checking key with Gemini...");
    }
    service
        .set_credential(&credential, verify)
        .await
        .map_err(|e| anyhow::anyhow!(e.user_message()))?;

    println!("API key {} saved.", credential.masked());
    Ok(())
}

/// Remove the stored key
pub async fn clear(service: &KarenifierService) -> Result<()> {
    if service.clear_credential().await? {
        println!("Stored API key removed.");
    } else {
        println!("No stored API key.");
    }
    Ok(())
}

/// Report the key in use
pub async fn status(service: &KarenifierService) -> Result<()> {
    match service.resolve_credential().await? {
        Some(resolved) => println!(
            "Using API key {} from the {}.",
            resolved.credential.masked(),
            resolved.source.description()
        ),
        None => println!("No API key configured. Run `karenifier key set`."),
    }
    Ok(())
}
