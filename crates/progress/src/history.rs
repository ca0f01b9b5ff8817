//! Append-only progress sample store.

use std::time::Instant;
use taskwatch_core::ProgressSample;
use tracing::trace;

/// Chronological history of progress samples for one task.
///
/// Insertion order is chronological order: a sample stamped earlier than
/// the latest one is re-stamped to the latest timestamp.
#[derive(Debug, Clone, Default)]
pub struct ProgressHistory {
    samples: Vec<ProgressSample>,
}

impl ProgressHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observation, clamping the percentage into `0..=100`.
    pub fn record(&mut self, timestamp: Instant, raw_percentage: i64) -> ProgressSample {
        let timestamp = match self.samples.last() {
            Some(last) if timestamp < last.timestamp() => last.timestamp(),
            _ => timestamp,
        };
        let sample = ProgressSample::new(timestamp, raw_percentage);
        trace!(raw = raw_percentage, stored = sample.percentage(), "recorded progress sample");
        self.samples.push(sample);
        sample
    }

    /// All samples, oldest first.
    pub fn samples(&self) -> &[ProgressSample] {
        &self.samples
    }

    /// Earliest sample
    pub fn first(&self) -> Option<&ProgressSample> {
        self.samples.first()
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<&ProgressSample> {
        self.samples.last()
    }

    /// Most recent percentage, if any sample exists
    pub fn latest_percentage(&self) -> Option<u8> {
        self.latest().map(ProgressSample::percentage)
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no sample has been recorded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_record_clamps_and_appends() {
        let t0 = Instant::now();
        let mut history = ProgressHistory::new();
        assert!(history.is_empty());

        history.record(t0, -5);
        history.record(t0 + Duration::from_secs(10), 150);

        assert_eq!(history.len(), 2);
        assert_eq!(history.first().unwrap().percentage(), 0);
        assert_eq!(history.latest_percentage(), Some(100));
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let t0 = Instant::now();
        let mut history = ProgressHistory::new();
        history.record(t0 + Duration::from_secs(30), 10);
        let sample = history.record(t0, 20);

        assert_eq!(sample.timestamp(), t0 + Duration::from_secs(30));
        let stamps: Vec<_> = history.samples().iter().map(|s| s.timestamp()).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }
}
