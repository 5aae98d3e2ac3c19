// ABOUTME: Static persona configurations for the helpful and Karen pipeline stages
// ABOUTME: Karen's system instruction is loaded at compile time from a markdown file
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

//! # Persona Prompts
//!
//! Two fixed personas shape the two pipeline stages:
//!
//! - **Helpful**: answers the user's query directly and briefly, no system instruction.
//! - **Karen**: rephrases the helpful answer with disdain, governed by the rules in
//!   `karen_system.md`.
//!
//! Both stages run with a zero thinking budget so the whole output cap is spent
//! on visible text.

use karenifier_core::constants::limits;

use super::{ChatMessage, ChatRequest};

/// Karen persona system instruction
pub const KAREN_SYSTEM_PROMPT: &str = include_str!("karen_system.md");

/// Which stage persona to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Persona {
    /// Direct, concise answer
    Helpful,
    /// Sarcastic rephrasing of the helpful answer
    Karen,
}

impl Persona {
    /// Static configuration for this persona
    #[must_use]
    pub const fn config(self) -> &'static PersonaConfig {
        match self {
            Self::Helpful => &PersonaConfig::HELPFUL,
            Self::Karen => &PersonaConfig::KAREN,
        }
    }

    /// Label used in logs and CLI headings
    #[must_use]
    pub const fn label(self) -> &'static str {
        self.config().name
    }
}

/// Immutable persona configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonaConfig {
    /// Display name
    pub name: &'static str,
    /// System instruction sent alongside the prompt
    pub system_instruction: Option<&'static str>,
    /// Text placed before the stage input
    pub prompt_prefix: &'static str,
    /// Text placed after the stage input
    pub prompt_suffix: &'static str,
    /// Output token cap
    pub max_output_tokens: u32,
    /// Thinking token budget
    pub thinking_budget: Option<u32>,
}

impl PersonaConfig {
    /// The helpful assistant
    pub const HELPFUL: Self = Self {
        name: "Helpful Assistant",
        system_instruction: None,
        prompt_prefix: "",
        prompt_suffix: "\n\n(Please provide a helpful, concise response under 200 words).",
        max_output_tokens: limits::HELPFUL_MAX_OUTPUT_TOKENS,
        thinking_budget: Some(limits::STAGE_THINKING_BUDGET),
    };

    /// Karen
    pub const KAREN: Self = Self {
        name: "Karen",
        system_instruction: Some(KAREN_SYSTEM_PROMPT),
        prompt_prefix: "Here is a dreadfully earnest response my assistant provided: \"",
        prompt_suffix: "\". Now, rephrase it with the wit and disdain it so clearly deserves.",
        max_output_tokens: limits::KAREN_MAX_OUTPUT_TOKENS,
        thinking_budget: Some(limits::STAGE_THINKING_BUDGET),
    };

    /// Wrap the stage input in this persona's prompt template
    ///
    /// The input is embedded verbatim.
    #[must_use]
    pub fn render_prompt(&self, input: &str) -> String {
        format!("{}{input}{}", self.prompt_prefix, self.prompt_suffix)
    }

    /// Build the request for one stage call
    #[must_use]
    pub fn build_request(&self, input: &str, model: &str) -> ChatRequest {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.system_instruction {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(self.render_prompt(input)));

        let mut request = ChatRequest::new(messages)
            .with_model(model)
            .with_max_tokens(self.max_output_tokens);
        if let Some(budget) = self.thinking_budget {
            request = request.with_thinking_budget(budget);
        }
        request
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_helpful_prompt_has_no_system_instruction() {
        let request = PersonaConfig::HELPFUL.build_request("Why is my latte cold?", "m");
        assert_eq!(request.system_instruction(), None);
        assert_eq!(
            request.prompt(),
            Some("Why is my latte cold?\n\n(Please provide a helpful, concise response under 200 words).")
        );
        assert_eq!(request.max_tokens, Some(250));
        assert_eq!(request.thinking_budget, Some(0));
        assert_eq!(request.model.as_deref(), Some("m"));
    }

    #[test]
    fn test_karen_prompt_embeds_text_verbatim() {
        let text = "Lattes cool \"quickly\".";
        let request = PersonaConfig::KAREN.build_request(text, "m");
        assert_eq!(request.system_instruction(), Some(KAREN_SYSTEM_PROMPT));
        assert!(request.prompt().is_some_and(|p| p.contains(text)));
        assert_eq!(request.max_tokens, Some(200));
    }

    #[test]
    fn test_karen_rules_loaded() {
        assert!(KAREN_SYSTEM_PROMPT.contains("RULES:"));
        assert!(KAREN_SYSTEM_PROMPT.contains("under 150 words"));
    }
}
