// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors
// ABOUTME: Re-exports command modules for the karenifier CLI
// ABOUTME: Provides the ask, history, and API key commands

pub mod ask;
pub mod history;
pub mod key;
