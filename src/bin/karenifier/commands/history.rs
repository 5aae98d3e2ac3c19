// ABOUTME: History commands for the karenifier CLI
// ABOUTME: Lists, shows, and clears saved conversations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

use anyhow::{bail, Result};
use karenifier::service::KarenifierService;

use crate::helpers::display::{print_conversation, print_conversation_summary};

/// List conversations, most recent first
pub async fn list(service: &KarenifierService) {
    let conversations = service.history().await;
    if conversations.is_empty() {
        println!("No conversations yet.");
        return;
    }
    for conversation in &conversations {
        print_conversation_summary(conversation);
    }
}

/// Show one conversation
pub async fn show(service: &KarenifierService, id: i64) -> Result<()> {
    match service.find_conversation(id).await? {
        Some(conversation) => {
            print_conversation(&conversation);
            Ok(())
        }
        None => bail!("No conversation with ID {id}"),
    }
}

/// Delete all conversations
pub async fn clear(service: &KarenifierService) -> Result<()> {
    let removed = service.clear_history().await?;
    println!("Removed {removed} conversation(s).");
    Ok(())
}
