// ABOUTME: Usage statistics model with visit and completed-run counters
// ABOUTME: Plain value type read from the usage counter store
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Karenifier Contributors

use serde::{Deserialize, Serialize};

/// Snapshot of the persisted usage counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    /// Number of application loads
    pub visits: u64,
    /// Number of fully successful two-stage runs
    pub runs: u64,
}
