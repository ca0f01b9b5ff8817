//! Monitor configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use taskwatch_core::{MonitorError, Result};

/// Default time between progress notifications.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_secs(90);
/// Default time after which a running task is considered stuck.
pub const DEFAULT_TIMEOUT_THRESHOLD: Duration = Duration::from_secs(900);
/// Default wait for an executor to acknowledge cancellation.
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_secs(5);
/// Default wait for queued hook calls after a terminal transition.
pub const DEFAULT_HOOK_GRACE: Duration = Duration::from_secs(5);

/// Configuration for a [`Monitor`](crate::Monitor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Time between progress notifications
    #[serde(with = "taskwatch_core::duration_secs")]
    pub update_interval: Duration,
    /// Timeout applied when a spawn does not set its own
    #[serde(with = "taskwatch_core::duration_secs")]
    pub timeout_threshold: Duration,
    /// How long to wait for a cancelled executor before giving up on it
    #[serde(with = "taskwatch_core::duration_secs")]
    pub cancel_grace: Duration,
    /// How long to wait for hooks to drain after the terminal transition
    #[serde(with = "taskwatch_core::duration_secs")]
    pub hook_grace: Duration,
    /// Report an elapsed-time estimate when the executor never reports a percentage
    pub elapsed_fallback: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            update_interval: DEFAULT_UPDATE_INTERVAL,
            timeout_threshold: DEFAULT_TIMEOUT_THRESHOLD,
            cancel_grace: DEFAULT_CANCEL_GRACE,
            hook_grace: DEFAULT_HOOK_GRACE,
            elapsed_fallback: true,
        }
    }
}

impl MonitorConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the progress notification interval.
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Set the default timeout.
    pub fn with_timeout_threshold(mut self, timeout: Duration) -> Self {
        self.timeout_threshold = timeout;
        self
    }

    /// Set the cancellation grace period.
    pub fn with_cancel_grace(mut self, grace: Duration) -> Self {
        self.cancel_grace = grace;
        self
    }

    /// Set the hook drain grace period.
    pub fn with_hook_grace(mut self, grace: Duration) -> Self {
        self.hook_grace = grace;
        self
    }

    /// Enable or disable the elapsed-time fallback.
    pub fn with_elapsed_fallback(mut self, enabled: bool) -> Self {
        self.elapsed_fallback = enabled;
        self
    }

    /// Reject zero intervals and timeouts.
    pub fn validate(&self) -> Result<()> {
        ensure_positive("update_interval", self.update_interval)?;
        ensure_positive("timeout_threshold", self.timeout_threshold)?;
        Ok(())
    }
}

/// Fail with a configuration error when `value` is zero.
pub(crate) fn ensure_positive(name: &str, value: Duration) -> Result<()> {
    if value.is_zero() {
        return Err(MonitorError::Configuration(format!(
            "{name} must be positive"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.update_interval, Duration::from_secs(90));
        assert_eq!(config.timeout_threshold, Duration::from_secs(900));
        assert!(config.elapsed_fallback);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_values_are_rejected() {
        let err = MonitorConfig::new()
            .with_update_interval(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, MonitorError::Configuration(ref msg) if msg.contains("update_interval")));

        let err = MonitorConfig::new()
            .with_timeout_threshold(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(matches!(err, MonitorError::Configuration(ref msg) if msg.contains("timeout_threshold")));
    }

    #[test]
    fn test_serde_uses_seconds() {
        let config = MonitorConfig::new().with_update_interval(Duration::from_secs(30));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["update_interval"], 30.0);

        let parsed: MonitorConfig =
            serde_json::from_str(r#"{"update_interval": 10, "timeout_threshold": 60}"#).unwrap();
        assert_eq!(parsed.update_interval, Duration::from_secs(10));
        assert_eq!(parsed.timeout_threshold, Duration::from_secs(60));
        assert_eq!(parsed.cancel_grace, DEFAULT_CANCEL_GRACE);
    }

    #[test]
    fn test_negative_seconds_fail_to_parse() {
        let parsed = serde_json::from_str::<MonitorConfig>(r#"{"update_interval": -1}"#);
        assert!(parsed.is_err());
    }
}
