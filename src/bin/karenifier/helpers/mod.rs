// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors
// ABOUTME: Re-exports helper modules for the karenifier CLI
// ABOUTME: Provides terminal display formatting utilities

pub mod display;
