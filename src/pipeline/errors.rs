// ABOUTME: Two-way failure taxonomy for pipeline stages (credential vs service)
// ABOUTME: Classifies provider AppErrors by error code, with a message-text fallback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

use karenifier_core::errors::{AppError, ErrorCode};
use thiserror::Error;
use tracing::debug;

/// User-facing text for a rejected credential
pub const INVALID_CREDENTIAL_MESSAGE: &str =
    "The provided API Key is invalid. Please check the key and try again.";

/// User-facing text for a connectivity failure
pub const NETWORK_ERROR_MESSAGE: &str = "Network error. Please check your connection and try again.";

/// Markers in a failure description that indicate the credential was refused
const CREDENTIAL_MARKERS: &[&str] = &["api key not valid", "permission denied"];

/// Marker in a failure description that indicates the request never reached the service
const NETWORK_MARKER: &str = "fetch failed";

/// Outcome of a failed pipeline stage
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// The credential is invalid, expired or lacks permission
    #[error("{message}")]
    Credential {
        /// User-facing description
        message: String,
    },
    /// Any other failure (network, quota, server error, malformed output)
    #[error("{message}")]
    Service {
        /// User-facing description
        message: String,
    },
}

impl PipelineError {
    /// A credential failure with the standard message
    #[must_use]
    pub fn credential() -> Self {
        Self::Credential {
            message: INVALID_CREDENTIAL_MESSAGE.to_owned(),
        }
    }

    /// A service failure carrying the given message
    #[must_use]
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service {
            message: message.into(),
        }
    }

    /// Whether the caller should discard the credential
    #[must_use]
    pub const fn is_credential(&self) -> bool {
        matches!(self, Self::Credential { .. })
    }

    /// Message suitable for showing to the user
    #[must_use]
    pub fn user_message(&self) -> &str {
        match self {
            Self::Credential { message } | Self::Service { message } => message,
        }
    }
}

/// Classify a provider failure
///
/// The error code decides when it is specific. Generic service errors fall back
/// to scanning the message for known phrases; that part is best-effort and can
/// misclassify a service error whose text happens to contain them.
#[must_use]
pub fn classify_failure(error: &AppError) -> PipelineError {
    debug!(code = ?error.code, message = %error.message, "Classifying provider failure");

    if error.code.is_credential_failure() {
        return PipelineError::credential();
    }
    if error.code.is_connectivity_failure() {
        return PipelineError::service(NETWORK_ERROR_MESSAGE);
    }

    let lowered = error.message.to_lowercase();
    if error.code != ErrorCode::ExternalRateLimited
        && CREDENTIAL_MARKERS.iter().any(|m| lowered.contains(m))
    {
        return PipelineError::credential();
    }
    if lowered.contains(NETWORK_MARKER) {
        return PipelineError::service(NETWORK_ERROR_MESSAGE);
    }

    PipelineError::service(format!("An error occurred with the API: {}", error.message))
}

impl From<AppError> for PipelineError {
    fn from(error: AppError) -> Self {
        classify_failure(&error)
    }
}
