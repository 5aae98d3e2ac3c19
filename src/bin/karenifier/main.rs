// ABOUTME: Karenifier CLI - ask a question, get a helpful answer, then Karen's take on it
// ABOUTME: Also lists examples, manages history, shows usage stats, and stores the API key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors
//!
//! Usage:
//! ```bash
//! # Store a Gemini API key (prompted on stdin when omitted)
//! karenifier key set AIza...
//!
//! # Ask a question
//! karenifier ask Why is my latte cold?
//!
//! # Ask one of the built-in example questions
//! karenifier ask --example 2
//!
//! # Browse and clear past conversations
//! karenifier history
//! karenifier history show 1735689600000
//! karenifier history clear
//!
//! # Visit and run counters
//! karenifier stats
//! ```

mod commands;
mod helpers;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use karenifier::config::KarenifierConfig;
use karenifier::database::Database;
use karenifier::llm::GeminiProvider;
use karenifier::logging::LoggingConfig;
use karenifier::pipeline::ResponsePipeline;
use karenifier::service::KarenifierService;
use tracing::{debug, warn};

#[derive(Parser)]
#[command(
    name = "karenifier",
    version,
    about = "Ask a question, get a helpful answer, then let Karen have her say",
    long_about = "Streams a concise answer from Google Gemini, then streams a condescending rephrasing of that answer."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Database URL override
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum Command {
    /// Ask a question
    Ask {
        /// Use one of the built-in example questions (1-based, see `examples`)
        #[arg(long, short = 'e', conflicts_with = "query")]
        example: Option<usize>,

        /// The question
        #[arg(trailing_var_arg = true, required_unless_present = "example")]
        query: Vec<String>,
    },

    /// List the built-in example questions
    Examples,

    /// Show or clear past conversations
    History {
        #[command(subcommand)]
        action: Option<HistoryCommand>,
    },

    /// Show visit and run counters
    Stats,

    /// Manage the stored Gemini API key
    Key {
        #[command(subcommand)]
        action: KeyCommand,
    },
}

#[non_exhaustive]
#[derive(Subcommand)]
enum HistoryCommand {
    /// List conversations, most recent first
    List,

    /// Show one conversation in full
    Show {
        /// Conversation ID
        id: i64,
    },

    /// Delete every conversation
    Clear,
}

#[non_exhaustive]
#[derive(Subcommand)]
enum KeyCommand {
    /// Store a key (read from stdin when omitted)
    Set {
        /// The API key
        key: Option<String>,

        /// Store without checking the key against the API
        #[arg(long)]
        no_verify: bool,
    },

    /// Remove the stored key
    Clear,

    /// Show which key is in use
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    LoggingConfig::from_env().verbose(cli.verbose).init()?;

    let mut config = KarenifierConfig::from_env();
    if let Some(url) = cli.database_url.as_deref() {
        config = config.with_database_url(url);
    }
    debug!(database = %config.database_url, model = %config.model, "Configuration loaded");

    let database = Database::new(&config.database_url.to_connection_string())
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))?;

    let provider = GeminiProvider::with_settings(
        config.api_base_url.clone(),
        config.model.clone(),
        config.request_timeout,
    )?;
    let pipeline = ResponsePipeline::new(Arc::new(provider), config.model.clone());
    let service = KarenifierService::with_database(pipeline, &database)
        .with_env_credential(config.env_api_key.clone())
        .with_max_query_chars(config.max_query_chars);

    if let Err(e) = service.record_visit().await {
        warn!(error = %e, "Failed to record visit");
    }

    match cli.command {
        Command::Ask { example, query } => {
            let query = commands::ask::resolve_query(example, &query)?;
            commands::ask::run(&service, &query).await?;
        }
        Command::Examples => helpers::display::print_examples(),
        Command::History { action } => match action.unwrap_or(HistoryCommand::List) {
            HistoryCommand::List => commands::history::list(&service).await,
            HistoryCommand::Show { id } => commands::history::show(&service, id).await?,
            HistoryCommand::Clear => commands::history::clear(&service).await?,
        },
        Command::Stats => helpers::display::print_stats(service.usage_stats().await),
        Command::Key { action } => match action {
            KeyCommand::Set { key, no_verify } => {
                commands::key::set(&service, key, !no_verify).await?;
            }
            KeyCommand::Clear => commands::key::clear(&service).await?,
            KeyCommand::Status => commands::key::status(&service).await?,
        },
    }

    Ok(())
}
