// ABOUTME: Logging configuration and structured logging setup for the CLI and library
// ABOUTME: Writes to stderr so diagnostic output never mixes with streamed answers on stdout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

//! Structured logging configuration

use std::env;
use std::io;

use anyhow::{anyhow, Result};
use karenifier_core::constants::service_names;
use tracing::debug;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Include span open/close events
    pub include_spans: bool,
    /// Service name for structured logging
    pub service_name: String,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// `JSON` format for machine consumption
    Json,
    /// Pretty format for development
    Pretty,
    /// Compact single-line format
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: LogFormat::Compact,
            include_location: false,
            include_spans: false,
            service_name: service_names::KARENIFIER.into(),
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("pretty") => LogFormat::Pretty,
            _ => LogFormat::Compact,
        };

        Self {
            level: env::var("RUST_LOG").unwrap_or(defaults.level),
            format,
            include_location: env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_spans: env::var("LOG_INCLUDE_SPANS").is_ok(),
            service_name: defaults.service_name,
        }
    }

    /// Raise the level to `debug` for `--verbose` runs
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        if verbose {
            "debug".clone_into(&mut self.level);
        }
        self
    }

    fn env_filter(&self) -> EnvFilter {
        let noise = ["hyper=warn", "hyper_util=warn", "reqwest=warn", "sqlx=warn"];

        let mut filter = EnvFilter::new(&self.level);
        for directive in noise {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
        if let Ok(directive) = format!("karenifier={}", self.level).parse() {
            filter = filter.add_directive(directive);
        }
        filter
    }

    /// Initialize the global tracing subscriber
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed
    pub fn init(&self) -> Result<()> {
        let registry = tracing_subscriber::registry().with(self.env_filter());
        let span_events = if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        };

        let installed = match self.format {
            LogFormat::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_file(self.include_location)
                        .with_line_number(self.include_location)
                        .with_target(true)
                        .with_writer(io::stderr)
                        .with_span_events(span_events),
                )
                .try_init(),
            LogFormat::Pretty => registry
                .with(
                    fmt::layer()
                        .pretty()
                        .with_file(self.include_location)
                        .with_line_number(self.include_location)
                        .with_target(true)
                        .with_writer(io::stderr)
                        .with_span_events(span_events),
                )
                .try_init(),
            LogFormat::Compact => registry
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(io::stderr)
                        .with_span_events(span_events),
                )
                .try_init(),
        };
        installed.map_err(|e| anyhow!("Failed to initialize logging: {e}"))?;

        debug!(
            service.name = %self.service_name,
            service.version = env!("CARGO_PKG_VERSION"),
            log.level = %self.level,
            log.format = ?self.format,
            "Logging initialized"
        );
        Ok(())
    }
}

/// Initialize logging from environment
///
/// # Errors
///
/// Returns an error if logging initialization fails
pub fn init_from_env() -> Result<()> {
    LoggingConfig::from_env().init()
}
