// ABOUTME: Core types and constants for the Karenifier two-stage LLM pipeline
// ABOUTME: Foundation crate with error handling, conversation models, and constants
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

#![deny(unsafe_code)]

//! # Karenifier Core
//!
//! Foundation crate providing shared types and constants for Karenifier.
//! This crate is designed to change infrequently, enabling incremental
//! compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and `ErrorCode`
//! - **constants**: Application-wide constants (limits, defaults, storage keys)
//! - **models**: `Conversation`, `UsageStats`, and the redacting `Credential` newtype

/// Unified error handling system with standard error codes
pub mod errors;

/// Application constants organized by domain
pub mod constants;

/// Core data models (Conversation, UsageStats, Credential)
pub mod models;
