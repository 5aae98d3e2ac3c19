// ABOUTME: Application constants for limits, defaults, and persisted storage keys
// ABOUTME: Central place for magic numbers and strings shared by library and CLI
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

//! Application-wide constants organized by domain

/// Input and output limits
pub mod limits {
    /// Maximum characters accepted for a single query
    pub const MAX_QUERY_CHARS: usize = 500;

    /// Output token cap for the helpful stage
    pub const HELPFUL_MAX_OUTPUT_TOKENS: u32 = 250;

    /// Output token cap for the Karen stage
    pub const KAREN_MAX_OUTPUT_TOKENS: u32 = 200;

    /// Thinking budget for both stages (0 disables model thinking)
    pub const STAGE_THINKING_BUDGET: u32 = 0;

    /// Default HTTP request timeout in seconds
    pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
}

/// Default values used when configuration is absent
pub mod defaults {
    /// Default Gemini model
    pub const GEMINI_MODEL: &str = "gemini-2.5-flash";

    /// Default Gemini API base URL
    pub const GEMINI_API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

    /// Directory name under the platform data dir
    pub const DATA_DIR_NAME: &str = "karenifier";

    /// Database file name inside the data dir
    pub const DATABASE_FILE_NAME: &str = "karenifier.db";
}

/// Environment variable names
pub mod env_config {
    /// Gemini API key override
    pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";
    /// Gemini API base URL override
    pub const GEMINI_API_BASE_URL: &str = "GEMINI_API_BASE_URL";
    /// Database URL override
    pub const DATABASE_URL: &str = "KARENIFIER_DATABASE_URL";
    /// Model override
    pub const MODEL: &str = "KARENIFIER_MODEL";
    /// Request timeout override (seconds)
    pub const REQUEST_TIMEOUT_SECS: &str = "KARENIFIER_REQUEST_TIMEOUT_SECS";
    /// Query length cap override
    pub const MAX_QUERY_CHARS: &str = "KARENIFIER_MAX_QUERY_CHARS";
}

/// Keys under which counters and settings are persisted
pub mod storage_keys {
    /// Page-visit counter (one per application load)
    pub const VISITS: &str = "karenifier-page-visits";
    /// Completed-run counter
    pub const RUNS: &str = "karenifier-app-runs";
    /// Stored Gemini API key
    pub const API_KEY: &str = "gemini-api-key";
}

/// Service names used in error messages and logs
pub mod service_names {
    /// Binary / service name
    pub const KARENIFIER: &str = "karenifier";
    /// Gemini provider display name
    pub const GEMINI: &str = "Gemini";
}

/// Example queries offered to users who do not know what to ask
pub const EXAMPLE_QUERIES: &[&str] = &[
    "Why is my latte cold?",
    "Explain quantum physics like I'll call your manager.",
    "How do I complain about the universe's return policy?",
    "Tell someone their parking is ATROCIOUS.",
];
