// SPDX-License-Identifier: MIT OR Apache-2.0
//! Engine settings threaded through graph construction.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the scheduler does when a node callback fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorPolicy {
    /// Return the error to the caller of `run_step` / `start`
    Strict,
    /// Log the error and stop the scheduler
    #[default]
    Lenient,
}

/// Engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Maximum number of nodes a graph may hold
    pub max_nodes: usize,
    /// Behaviour on node callback failure
    pub error_policy: ErrorPolicy,
    /// Seconds added to the fixed-step clock on every tick
    pub fixed_time_lapse: f64,
    /// Timer interval used when none is given explicitly
    pub default_interval_ms: u64,
}

impl Settings {
    /// Parse settings from RON text. Missing fields keep their defaults.
    pub fn from_ron(text: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(text)
    }

    /// Serialize settings to pretty RON
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Use the given error policy
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Use the given node capacity
    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = max_nodes;
        self
    }

    /// Default timer interval, never shorter than one millisecond
    pub fn default_interval(&self) -> Duration {
        Duration::from_millis(self.default_interval_ms.max(1))
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_nodes: 10_000,
            error_policy: ErrorPolicy::Lenient,
            fixed_time_lapse: 0.01,
            default_interval_ms: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_ron_keeps_defaults() {
        let settings = Settings::from_ron("(max_nodes: 4, error_policy: Strict)").unwrap();
        assert_eq!(settings.max_nodes, 4);
        assert_eq!(settings.error_policy, ErrorPolicy::Strict);
        assert_eq!(settings.default_interval_ms, 1);
    }

    #[test]
    fn test_ron_roundtrip() {
        let settings = Settings::default().with_max_nodes(12);
        let text = settings.to_ron().unwrap();
        assert_eq!(Settings::from_ron(&text).unwrap(), settings);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let settings = Settings {
            default_interval_ms: 0,
            ..Settings::default()
        };
        assert_eq!(settings.default_interval(), Duration::from_millis(1));
    }
}
