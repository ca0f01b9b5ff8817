//! Completion time estimation.
//!
//! The rate is the slope between the first and the last sample of the
//! history, in percent per minute. Regression over all samples was
//! considered; first-to-last keeps the result deterministic and needs no
//! state beyond the stored samples.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use taskwatch_core::ProgressSample;

/// Projected completion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionEstimate {
    /// Completion is projected at this instant (never before `now`)
    Due(Instant),
    /// No positive rate is known, so no projection can be made
    Indeterminate,
}

impl CompletionEstimate {
    /// Time left from `now`, if a projection exists.
    pub fn remaining_from(&self, now: Instant) -> Option<Duration> {
        match self {
            CompletionEstimate::Due(at) => Some(at.saturating_duration_since(now)),
            CompletionEstimate::Indeterminate => None,
        }
    }
}

/// Aggregate view of a task's progress history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    /// Number of samples recorded
    pub updates: usize,
    /// Latest known percentage
    pub current_progress: u8,
    /// First-to-last slope in percent per minute
    pub rate_per_minute: f64,
    /// Projected time left
    #[serde(default, with = "taskwatch_core::duration_secs::option")]
    pub estimated_remaining: Option<Duration>,
}

/// Completion time estimator.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompletionEstimator;

impl CompletionEstimator {
    /// Progress rate in percent per minute.
    ///
    /// Returns 0 with fewer than two samples or when the samples share a
    /// timestamp.
    pub fn progress_rate(&self, history: &[ProgressSample]) -> f64 {
        let (Some(first), Some(last)) = (history.first(), history.last()) else {
            return 0.0;
        };
        if history.len() < 2 {
            return 0.0;
        }

        let minutes = last
            .timestamp()
            .saturating_duration_since(first.timestamp())
            .as_secs_f64()
            / 60.0;
        if minutes <= 0.0 {
            return 0.0;
        }

        (f64::from(last.percentage()) - f64::from(first.percentage())) / minutes
    }

    /// Project the completion instant from `now`.
    pub fn estimate_completion(&self, history: &[ProgressSample], now: Instant) -> CompletionEstimate {
        let Some(latest) = history.last() else {
            return CompletionEstimate::Indeterminate;
        };

        let rate = self.progress_rate(history);
        if rate <= 0.0 || !rate.is_finite() {
            return CompletionEstimate::Indeterminate;
        }

        let remaining = 100.0 - f64::from(latest.percentage());
        if remaining <= 0.0 {
            return CompletionEstimate::Due(now);
        }

        let Ok(left) = Duration::try_from_secs_f64(remaining / rate * 60.0) else {
            return CompletionEstimate::Indeterminate;
        };
        now.checked_add(left)
            .map(CompletionEstimate::Due)
            .unwrap_or(CompletionEstimate::Indeterminate)
    }

    /// Summarize a history as of `now`.
    pub fn summarize(&self, history: &[ProgressSample], now: Instant) -> ProgressSummary {
        ProgressSummary {
            updates: history.len(),
            current_progress: history.last().map(ProgressSample::percentage).unwrap_or(0),
            rate_per_minute: self.progress_rate(history),
            estimated_remaining: self.estimate_completion(history, now).remaining_from(now),
        }
    }
}
