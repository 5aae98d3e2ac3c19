// ABOUTME: Opaque API credential newtype that redacts itself and zeroizes on drop
// ABOUTME: Records where a resolved key came from (environment or local store)
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

use std::fmt::{self, Debug, Formatter};

use zeroize::Zeroizing;

use crate::errors::{AppError, AppResult, ErrorCode};

/// A user's API key for the remote text-generation service
///
/// The key is only reachable through [`Credential::expose`]; `Debug` prints a
/// placeholder and the backing buffer is wiped when the value is dropped.
#[derive(Clone)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    /// Create a credential from user input
    ///
    /// Surrounding whitespace is trimmed.
    ///
    /// # Errors
    ///
    /// Returns `AuthInvalid` if the key is empty or contains control characters.
    pub fn new(raw: impl Into<String>) -> AppResult<Self> {
        let raw = Zeroizing::new(raw.into());
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(AppError::new(ErrorCode::AuthInvalid, "API key is empty"));
        }
        if trimmed.chars().any(char::is_control) {
            return Err(AppError::new(
                ErrorCode::AuthInvalid,
                "API key contains control characters",
            ));
        }

        Ok(Self(Zeroizing::new(trimmed.to_owned())))
    }

    /// Borrow the raw key for placing it on an outgoing request
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Short masked form for status output, e.g. `AIza…f00d`
    #[must_use]
    pub fn masked(&self) -> String {
        let key = self.expose();
        let count = key.chars().count();
        if count <= 8 {
            return "*".repeat(count);
        }
        let head: String = key.chars().take(4).collect();
        let tail: String = key.chars().skip(count - 4).collect();
        format!("{head}…{tail}")
    }
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

impl PartialEq for Credential {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

impl Eq for Credential {}

/// Where a resolved credential came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKeySource {
    /// `GEMINI_API_KEY` environment variable
    Environment,
    /// Local credential store
    Stored,
}

impl ApiKeySource {
    /// Human-readable description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Environment => "environment variable",
            Self::Stored => "local store",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_trims_and_exposes() {
        let credential = Credential::new("  AIzaSyExampleKey  ").unwrap();
        assert_eq!(credential.expose(), "AIzaSyExampleKey");
    }

    #[test]
    fn test_credential_rejects_blank() {
        let error = Credential::new("   ").unwrap_err();
        assert_eq!(error.code, ErrorCode::AuthInvalid);
    }

    #[test]
    fn test_credential_rejects_control_characters() {
        assert!(Credential::new("abc\u{1b}[31mdef").is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let credential = Credential::new("super-secret-key").unwrap();
        let debug = format!("{credential:?}");
        assert!(!debug.contains("super-secret-key"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_masked() {
        let credential = Credential::new("AIzaSyExampleKeyf00d").unwrap();
        assert_eq!(credential.masked(), "AIza…f00d");
        let short = Credential::new("abc").unwrap();
        assert_eq!(short.masked(), "***");
    }
}
