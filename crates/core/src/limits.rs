// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Usage levels for the advisory entry limit.
//!
//! Entries are never evicted, so `max_entries` cannot be enforced; the
//! tracker reports how close it is instead and warns once when crossing it.

use serde::{Deserialize, Serialize};

/// Usage level categories for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageLevel {
    /// Usage below 70% of limit
    Normal,
    /// Usage between 70-90% of limit
    Warning,
    /// Usage above 90% of limit
    Critical,
}

impl UsageLevel {
    /// Determine usage level from a ratio (0.0 to 1.0+).
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 0.9 {
            UsageLevel::Critical
        } else if ratio >= 0.7 {
            UsageLevel::Warning
        } else {
            UsageLevel::Normal
        }
    }

    /// Usage level of `used` against `limit` (a zero limit is always critical)
    pub fn of(used: usize, limit: usize) -> Self {
        if limit == 0 {
            return UsageLevel::Critical;
        }
        Self::from_ratio(used as f64 / limit as f64)
    }

    /// Check if this level indicates a problem.
    pub fn is_concerning(&self) -> bool {
        matches!(self, UsageLevel::Warning | UsageLevel::Critical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yare::parameterized;

    #[parameterized(
        empty = { 0.0, UsageLevel::Normal },
        half = { 0.5, UsageLevel::Normal },
        just_below_warning = { 0.69, UsageLevel::Normal },
        warning = { 0.7, UsageLevel::Warning },
        high_warning = { 0.85, UsageLevel::Warning },
        critical = { 0.9, UsageLevel::Critical },
        over_limit = { 1.5, UsageLevel::Critical },
    )]
    fn usage_level_from_ratio(ratio: f64, expected: UsageLevel) {
        assert_eq!(UsageLevel::from_ratio(ratio), expected);
    }

    #[test]
    fn usage_level_of_counts() {
        assert_eq!(UsageLevel::of(50, 100), UsageLevel::Normal);
        assert_eq!(UsageLevel::of(75, 100), UsageLevel::Warning);
        assert_eq!(UsageLevel::of(100, 100), UsageLevel::Critical);
        assert_eq!(UsageLevel::of(0, 0), UsageLevel::Critical);
    }

    #[test]
    fn only_warning_and_critical_are_concerning() {
        assert!(!UsageLevel::Normal.is_concerning());
        assert!(UsageLevel::Warning.is_concerning());
        assert!(UsageLevel::Critical.is_concerning());
    }
}
