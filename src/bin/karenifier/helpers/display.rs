// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors
// ABOUTME: Output formatting helpers for the karenifier CLI
// ABOUTME: Prints streamed fragments, history entries, examples, and usage counters

use std::io::{self, Write};

use karenifier::constants::EXAMPLE_QUERIES;
use karenifier::models::{Conversation, UsageStats};

const PREVIEW_CHARS: usize = 60;

/// Write a fragment to stdout immediately
pub fn print_fragment(text: &str) {
    let mut out = io::stdout().lock();
    write!(out, "{text}").and_then(|()| out.flush()).ok();
}

/// Print a section heading
pub fn print_heading(title: &str) {
    println!("\n{title}");
    println!("{}", "=".repeat(title.chars().count()));
}

/// List the example queries, numbered from 1
pub fn print_examples() {
    println!("Not sure what to ask? Try one of these:");
    for (index, query) in EXAMPLE_QUERIES.iter().enumerate() {
        println!("  {}. {query}", index + 1);
    }
    println!("\nRun `karenifier ask --example <N>` to use one.");
}

/// Print the usage counters
pub fn print_stats(stats: UsageStats) {
    println!("Visits: {}", stats.visits);
    println!("Runs:   {}", stats.runs);
}

fn preview(text: &str) -> String {
    let single_line = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if single_line.chars().count() <= PREVIEW_CHARS {
        return single_line;
    }
    let cut: String = single_line.chars().take(PREVIEW_CHARS - 1).collect();
    format!("{cut}…")
}

/// One-line history entry
pub fn print_conversation_summary(conversation: &Conversation) {
    println!(
        "[{}] {}  {}",
        conversation.id,
        conversation.created_at().format("%Y-%m-%d %H:%M"),
        preview(&conversation.query)
    );
}

/// Full history entry
pub fn print_conversation(conversation: &Conversation) {
    println!(
        "Conversation {} ({})",
        conversation.id,
        conversation.created_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
    print_heading("You asked");
    println!("{}", conversation.query);
    print_heading("Helpful Assistant");
    println!("{}", conversation.helpful_response);
    print_heading("Karen");
    println!("{}", conversation.karen_response);
}
