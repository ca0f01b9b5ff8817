//! Progress observations.

use std::time::Instant;

/// Clamp a raw percentage reported by an executor into `0..=100`.
///
/// Out-of-range input is clamped, never rejected.
pub fn clamp_percentage(raw: i64) -> u8 {
    raw.clamp(0, 100) as u8
}

/// A single `(timestamp, percentage)` observation. Immutable once recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    timestamp: Instant,
    percentage: u8,
}

impl ProgressSample {
    /// Create a sample, clamping the raw percentage.
    pub fn new(timestamp: Instant, raw_percentage: i64) -> Self {
        Self {
            timestamp,
            percentage: clamp_percentage(raw_percentage),
        }
    }

    /// When the observation was made
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Observed percentage, always within `0..=100`
    pub fn percentage(&self) -> u8 {
        self.percentage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_percentage() {
        assert_eq!(clamp_percentage(150), 100);
        assert_eq!(clamp_percentage(-5), 0);
        assert_eq!(clamp_percentage(42), 42);
        assert_eq!(clamp_percentage(i64::MIN), 0);
        assert_eq!(clamp_percentage(i64::MAX), 100);
    }

    #[test]
    fn test_sample_clamps_on_construction() {
        let now = Instant::now();
        assert_eq!(ProgressSample::new(now, 250).percentage(), 100);
        assert_eq!(ProgressSample::new(now, -1).percentage(), 0);
        assert_eq!(ProgressSample::new(now, 73).timestamp(), now);
    }
}
