//! Adaptive timeout estimation for blocking I/O in the transition pipeline
//!
//! Keeps a rolling history of (expected, actual) durations per operation kind
//! and derives a safety-margined deadline from the recently observed slowdown
//! factor, so a slow disk or network mount stretches deadlines instead of
//! tripping them.

use crate::config::TimeoutConfig;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// Kinds of operations whose durations are tracked independently
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// Decoding and scheduling an asset on a channel
    AssetLoad,

    /// Aligning the inactive channel before a synchronized start
    ChannelPrepare,
}

#[derive(Debug, Clone, Copy)]
struct TimingSample {
    expected: Duration,
    actual: Duration,
}

impl TimingSample {
    fn slowdown(&self) -> f64 {
        let expected = self.expected.as_secs_f64();
        if expected <= 0.0 {
            return 1.0;
        }
        self.actual.as_secs_f64() / expected
    }
}

/// Rolling per-kind performance history and deadline computation
pub struct TimeoutEstimator {
    config: TimeoutConfig,
    history: Mutex<HashMap<OperationKind, VecDeque<TimingSample>>>,
}

impl TimeoutEstimator {
    pub fn new(config: TimeoutConfig) -> Self {
        Self {
            config,
            history: Mutex::new(HashMap::new()),
        }
    }

    /// Record how long an operation actually took against its expectation
    ///
    /// History is append-and-trim: at most `history_limit` samples are kept
    /// per kind, oldest dropped first.
    pub fn record_duration(&self, kind: OperationKind, expected: Duration, actual: Duration) {
        let mut history = self.history.lock().expect("timeout history poisoned");
        let samples = history.entry(kind).or_default();
        samples.push_back(TimingSample { expected, actual });
        while samples.len() > self.config.history_limit {
            samples.pop_front();
        }
        debug!(
            ?kind,
            expected_ms = expected.as_millis() as u64,
            actual_ms = actual.as_millis() as u64,
            samples = samples.len(),
            "recorded operation duration"
        );
    }

    /// Deadline for an operation of `kind` expected to take `expected`
    ///
    /// With no history the default multiplier applies. Otherwise the mean
    /// slowdown over the most recent `recent_window` samples is scaled by the
    /// safety margin and clamped to the configured multiplier range.
    pub fn adaptive_timeout(&self, kind: OperationKind, expected: Duration) -> Duration {
        let history = self.history.lock().expect("timeout history poisoned");

        let multiplier = match history.get(&kind) {
            None => self.config.default_multiplier,
            Some(samples) if samples.is_empty() => self.config.default_multiplier,
            Some(samples) => {
                let recent: Vec<f64> = samples
                    .iter()
                    .rev()
                    .take(self.config.recent_window)
                    .map(TimingSample::slowdown)
                    .collect();
                let mean = recent.iter().sum::<f64>() / recent.len() as f64;
                (mean * self.config.safety_margin)
                    .clamp(self.config.min_multiplier, self.config.max_multiplier)
            }
        };

        let deadline = Duration::from_secs_f64(expected.as_secs_f64() * multiplier);
        debug!(
            ?kind,
            multiplier,
            deadline_ms = deadline.as_millis() as u64,
            "computed adaptive timeout"
        );
        deadline
    }

    /// Number of retained samples for a kind
    pub fn sample_count(&self, kind: OperationKind) -> usize {
        self.history
            .lock()
            .expect("timeout history poisoned")
            .get(&kind)
            .map(|s| s.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimator() -> TimeoutEstimator {
        TimeoutEstimator::new(TimeoutConfig::default())
    }

    #[test]
    fn test_no_history_uses_default_multiplier() {
        let est = estimator();
        let deadline = est.adaptive_timeout(OperationKind::AssetLoad, Duration::from_millis(500));
        assert_eq!(deadline, Duration::from_millis(1250));
    }

    #[test]
    fn test_single_slow_sample_clamps_to_max() {
        let est = estimator();
        est.record_duration(
            OperationKind::AssetLoad,
            Duration::from_millis(500),
            Duration::from_millis(2000),
        );

        // slowdown 4.0 × margin 1.5 = 6.0, clamped to 5.0
        let deadline = est.adaptive_timeout(OperationKind::AssetLoad, Duration::from_millis(500));
        assert_eq!(deadline, Duration::from_millis(2500));
    }

    #[test]
    fn test_fast_samples_clamp_to_min() {
        let est = estimator();
        for _ in 0..5 {
            est.record_duration(
                OperationKind::AssetLoad,
                Duration::from_millis(500),
                Duration::from_millis(100),
            );
        }

        // slowdown 0.2 × margin 1.5 = 0.3, clamped to 2.0
        let deadline = est.adaptive_timeout(OperationKind::AssetLoad, Duration::from_millis(500));
        assert_eq!(deadline, Duration::from_millis(1000));
    }

    #[test]
    fn test_history_trims_oldest_first() {
        let est = estimator();
        for i in 0..15 {
            est.record_duration(
                OperationKind::AssetLoad,
                Duration::from_millis(100),
                Duration::from_millis(100 + i),
            );
        }
        assert_eq!(est.sample_count(OperationKind::AssetLoad), 10);
    }

    #[test]
    fn test_only_recent_window_averaged() {
        let est = estimator();
        // Five old, very slow samples...
        for _ in 0..5 {
            est.record_duration(
                OperationKind::AssetLoad,
                Duration::from_millis(100),
                Duration::from_millis(1000),
            );
        }
        // ...followed by five on-time ones
        for _ in 0..5 {
            est.record_duration(
                OperationKind::AssetLoad,
                Duration::from_millis(100),
                Duration::from_millis(100),
            );
        }

        // Recent slowdown 1.0 × 1.5 = 1.5, clamped up to 2.0
        let deadline = est.adaptive_timeout(OperationKind::AssetLoad, Duration::from_millis(100));
        assert_eq!(deadline, Duration::from_millis(200));
    }

    #[test]
    fn test_kinds_tracked_independently() {
        let est = estimator();
        est.record_duration(
            OperationKind::AssetLoad,
            Duration::from_millis(500),
            Duration::from_millis(2000),
        );

        // ChannelPrepare has no history: default multiplier
        let deadline =
            est.adaptive_timeout(OperationKind::ChannelPrepare, Duration::from_millis(200));
        assert_eq!(deadline, Duration::from_millis(500));
    }
}
