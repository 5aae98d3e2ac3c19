// ABOUTME: Environment-driven runtime configuration for the Karenifier library and CLI
// ABOUTME: Resolves database location, model, API endpoint, timeouts, and query limits
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

//! Configuration module for Karenifier
//!
//! Every setting has a default and may be overridden by an environment
//! variable. Unparsable numeric overrides fall back to the default with a
//! warning instead of aborting the run.

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use karenifier_core::constants::{defaults, env_config, limits};
use karenifier_core::models::Credential;
use tracing::warn;

/// Type-safe database location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseUrl {
    /// `SQLite` database with file path
    SQLite {
        /// Path to `SQLite` database file
        path: PathBuf,
    },
    /// In-memory `SQLite` (for testing)
    Memory,
}

impl DatabaseUrl {
    /// Parse from a `sqlite:` URL or a bare file path
    #[must_use]
    pub fn parse_url(s: &str) -> Self {
        let path_str = s.strip_prefix("sqlite:").unwrap_or(s);
        let path_str = path_str.strip_prefix("//").unwrap_or(path_str);
        if path_str == ":memory:" {
            Self::Memory
        } else {
            Self::SQLite {
                path: PathBuf::from(path_str),
            }
        }
    }

    /// Default on-disk location under the platform data directory
    ///
    /// Falls back to `./data` when the platform has no data directory.
    #[must_use]
    pub fn default_location() -> Self {
        let base = dirs::data_dir().map_or_else(
            || PathBuf::from("data"),
            |dir| dir.join(defaults::DATA_DIR_NAME),
        );
        Self::SQLite {
            path: base.join(defaults::DATABASE_FILE_NAME),
        }
    }

    /// Convert to connection string
    #[must_use]
    pub fn to_connection_string(&self) -> String {
        match self {
            Self::SQLite { path } => format!("sqlite:{}", path.display()),
            Self::Memory => "sqlite::memory:".into(),
        }
    }

    /// Check if this is an in-memory database
    #[must_use]
    pub const fn is_memory(&self) -> bool {
        matches!(self, Self::Memory)
    }
}

impl Display for DatabaseUrl {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.to_connection_string())
    }
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct KarenifierConfig {
    /// Where history, counters and the stored key live
    pub database_url: DatabaseUrl,
    /// Model used for both pipeline stages
    pub model: String,
    /// Gemini REST base URL
    pub api_base_url: String,
    /// Per-request HTTP timeout
    pub request_timeout: Duration,
    /// Longest accepted query, in characters
    pub max_query_chars: usize,
    /// Key supplied through `GEMINI_API_KEY`, if any
    pub env_api_key: Option<Credential>,
}

impl Default for KarenifierConfig {
    fn default() -> Self {
        Self {
            database_url: DatabaseUrl::default_location(),
            model: defaults::GEMINI_MODEL.to_owned(),
            api_base_url: defaults::GEMINI_API_BASE_URL.to_owned(),
            request_timeout: Duration::from_secs(limits::DEFAULT_REQUEST_TIMEOUT_SECS),
            max_query_chars: limits::MAX_QUERY_CHARS,
            env_api_key: None,
        }
    }
}

impl KarenifierConfig {
    /// Load configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let fallback = Self::default();

        let env_api_key = non_empty_var(env_config::GEMINI_API_KEY).and_then(|raw| {
            Credential::new(raw)
                .map_err(|e| warn!(error = %e, "Ignoring unusable {}", env_config::GEMINI_API_KEY))
                .ok()
        });

        Self {
            database_url: non_empty_var(env_config::DATABASE_URL)
                .map_or(fallback.database_url, |url| DatabaseUrl::parse_url(&url)),
            model: non_empty_var(env_config::MODEL).unwrap_or(fallback.model),
            api_base_url: non_empty_var(env_config::GEMINI_API_BASE_URL)
                .unwrap_or(fallback.api_base_url),
            request_timeout: parse_var(
                env_config::REQUEST_TIMEOUT_SECS,
                limits::DEFAULT_REQUEST_TIMEOUT_SECS,
            )
            .map(Duration::from_secs)
            .unwrap_or(fallback.request_timeout),
            max_query_chars: parse_var(env_config::MAX_QUERY_CHARS, limits::MAX_QUERY_CHARS)
                .unwrap_or(fallback.max_query_chars),
            env_api_key,
        }
    }

    /// Override the database location
    #[must_use]
    pub fn with_database_url(mut self, url: &str) -> Self {
        self.database_url = DatabaseUrl::parse_url(url);
        self
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

/// Parse a positive numeric variable, warning and returning `None` when unusable
fn parse_var<T>(key: &str, default: T) -> Option<T>
where
    T: FromStr + PartialOrd + Default + Display,
{
    let raw = non_empty_var(key)?;
    match raw.parse::<T>() {
        Ok(value) if value > T::default() => Some(value),
        _ => {
            warn!(variable = key, value = %raw, default = %default, "Invalid value, using default");
            None
        }
    }
}
