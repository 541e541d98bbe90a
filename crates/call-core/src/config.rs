//! Coordinator configuration
//!
//! Per-call user preferences (blocking unknown callers, speaker when flat) are
//! not configuration: they are read through [`CallSettings`] every time a
//! decision is made. This module only holds the knobs fixed at startup.
//!
//! [`CallSettings`]: crate::ports::CallSettings

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{CallCoreError, CallCoreResult};
use crate::recent_callers::{MAX_WINDOW_SECS, REPEAT_CALLER_WINDOW_SECS};

/// Default freshness limit for orientation samples
pub const DEFAULT_ORIENTATION_MAX_AGE_MS: u64 = 2_000;

/// Configuration for a [`CallCoordinator`](crate::coordinator::CallCoordinator)
///
/// # Examples
///
/// ```rust
/// use dialer_call_core::CoordinatorConfig;
///
/// let config = CoordinatorConfig::new()
///     .with_repeat_caller_window_secs(600)
///     .with_ring_silence_timeout_secs(45);
/// assert!(config.validate().is_ok());
///
/// let parsed = CoordinatorConfig::from_json_str(r#"{"reject_waiting_calls": false}"#).unwrap();
/// assert_eq!(parsed.repeat_caller_window_secs, 900);
/// assert!(!parsed.reject_waiting_calls);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// How long a caller counts as a repeat caller, in seconds
    pub repeat_caller_window_secs: u64,
    /// Silence the ringer after this many seconds of alerting
    pub ring_silence_timeout_secs: Option<u64>,
    /// Orientation samples older than this count as missing
    pub orientation_max_age_ms: u64,
    /// Decline incoming calls that arrive while another call is in progress
    pub reject_waiting_calls: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            repeat_caller_window_secs: REPEAT_CALLER_WINDOW_SECS,
            ring_silence_timeout_secs: None,
            orientation_max_age_ms: DEFAULT_ORIENTATION_MAX_AGE_MS,
            reject_waiting_calls: true,
        }
    }
}

impl CoordinatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_repeat_caller_window_secs(mut self, secs: u64) -> Self {
        self.repeat_caller_window_secs = secs;
        self
    }

    pub fn with_ring_silence_timeout_secs(mut self, secs: u64) -> Self {
        self.ring_silence_timeout_secs = Some(secs);
        self
    }

    pub fn without_ring_silence_timeout(mut self) -> Self {
        self.ring_silence_timeout_secs = None;
        self
    }

    pub fn with_orientation_max_age_ms(mut self, millis: u64) -> Self {
        self.orientation_max_age_ms = millis;
        self
    }

    pub fn with_reject_waiting_calls(mut self, reject: bool) -> Self {
        self.reject_waiting_calls = reject;
        self
    }

    /// Check that every value is usable
    pub fn validate(&self) -> CallCoreResult<()> {
        if self.repeat_caller_window_secs == 0 {
            return Err(CallCoreError::config(
                "repeat_caller_window_secs must be greater than zero",
            ));
        }
        if self.repeat_caller_window_secs > MAX_WINDOW_SECS {
            return Err(CallCoreError::config(format!(
                "repeat_caller_window_secs must not exceed {} seconds",
                MAX_WINDOW_SECS
            )));
        }
        if self.ring_silence_timeout_secs == Some(0) {
            return Err(CallCoreError::config(
                "ring_silence_timeout_secs must be greater than zero when set",
            ));
        }
        Ok(())
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> CallCoreResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> CallCoreResult<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents)
    }

    /// Orientation freshness limit as a duration
    pub fn orientation_max_age(&self) -> Duration {
        Duration::milliseconds(i64::try_from(self.orientation_max_age_ms).unwrap_or(i64::MAX))
    }

    pub fn ring_silence_timeout(&self) -> Option<std::time::Duration> {
        self.ring_silence_timeout_secs.map(std::time::Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CoordinatorConfig::default();
        assert_eq!(config.repeat_caller_window_secs, 900);
        assert_eq!(config.ring_silence_timeout_secs, None);
        assert_eq!(config.orientation_max_age_ms, 2_000);
        assert!(config.reject_waiting_calls);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_window_is_rejected() {
        let err = CoordinatorConfig::new()
            .with_repeat_caller_window_secs(0)
            .validate()
            .unwrap_err();
        assert!(matches!(err, CallCoreError::Configuration { .. }));
    }

    #[test]
    fn zero_silence_timeout_is_rejected() {
        let config = CoordinatorConfig::new().with_ring_silence_timeout_secs(0);
        assert!(config.validate().is_err());
        assert!(config.without_ring_silence_timeout().validate().is_ok());
    }

    #[test]
    fn malformed_json_is_a_json_error() {
        let err = CoordinatorConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, CallCoreError::Json(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = CoordinatorConfig::from_file("/nonexistent/dialer/config.json").unwrap_err();
        assert!(matches!(err, CallCoreError::Io(_)));
    }

    #[test]
    fn orientation_max_age_converts() {
        let config = CoordinatorConfig::new().with_orientation_max_age_ms(1_500);
        assert_eq!(config.orientation_max_age(), Duration::milliseconds(1_500));
    }
}
