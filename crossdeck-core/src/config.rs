//! Configuration for the playback-control core
//!
//! All tunables live in one `Config` with documented defaults and valid
//! ranges. Values load from a TOML file; any omitted section or field falls
//! back to its default.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub queue: QueueConfig,
    pub timeout: TimeoutConfig,
    pub transition: TransitionConfig,
}

/// Operation queue tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum admitted-but-unfinished operations
    ///
    /// Valid range: [1, 1024]
    /// Default: 10
    pub max_depth: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { max_depth: 10 }
    }
}

/// Adaptive timeout estimator tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Multiplier applied to the expected duration when no history exists
    ///
    /// Default: 2.5
    pub default_multiplier: f64,

    /// Safety margin applied to the observed mean slowdown
    ///
    /// Default: 1.5
    pub safety_margin: f64,

    /// Lower clamp on the computed multiplier
    ///
    /// Default: 2.0
    pub min_multiplier: f64,

    /// Upper clamp on the computed multiplier
    ///
    /// Default: 5.0
    pub max_multiplier: f64,

    /// Samples retained per operation kind (oldest dropped first)
    ///
    /// Default: 10
    pub history_limit: usize,

    /// Most recent samples averaged when computing the slowdown factor
    ///
    /// Default: 5
    pub recent_window: usize,

    /// Expected duration of an asset load, the baseline the adaptive
    /// deadline scales from
    ///
    /// Default: 500 ms
    pub expected_asset_load_ms: u64,

    /// Expected duration of an inactive-channel prepare
    ///
    /// Default: 100 ms
    pub expected_channel_prepare_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_multiplier: 2.5,
            safety_margin: 1.5,
            min_multiplier: 2.0,
            max_multiplier: 5.0,
            history_limit: 10,
            recent_window: 5,
            expected_asset_load_ms: 500,
            expected_channel_prepare_ms: 100,
        }
    }
}

/// Crossfade orchestration tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    /// Below this progress a superseded transition is rolled back
    ///
    /// Default: 0.2
    pub rollback_abandon_threshold: f64,

    /// Up to this progress a superseded transition is fast-forwarded to
    /// completion; above it, the transition is left to finish naturally
    ///
    /// Default: 0.9
    pub rollback_fast_forward_threshold: f64,

    /// Duration of the rollback / fast-forward curve, in seconds
    ///
    /// Default: 0.3
    pub rollback_secs: f64,

    /// Duration of the quick-finish pass when resuming a paused transition
    ///
    /// Default: 1.0
    pub quick_finish_secs: f64,

    /// Pause progress below which resume would continue mid-way rather than
    /// quick-finish
    ///
    /// Default: 0.5
    pub resume_progress_split: f64,
}

impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            rollback_abandon_threshold: 0.2,
            rollback_fast_forward_threshold: 0.9,
            rollback_secs: 0.3,
            quick_finish_secs: 1.0,
            resume_progress_split: 0.5,
        }
    }
}

impl TransitionConfig {
    /// Rollback / fast-forward curve duration
    pub fn rollback_duration(&self) -> Duration {
        Duration::from_secs_f64(self.rollback_secs)
    }

    /// Quick-finish pass duration
    pub fn quick_finish_duration(&self) -> Duration {
        Duration::from_secs_f64(self.quick_finish_secs)
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        let config: Config = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would break component invariants
    pub fn validate(&self) -> Result<()> {
        if self.queue.max_depth == 0 {
            return Err(Error::Config("queue.max_depth must be at least 1".into()));
        }
        if self.timeout.min_multiplier > self.timeout.max_multiplier {
            return Err(Error::Config(
                "timeout.min_multiplier exceeds timeout.max_multiplier".into(),
            ));
        }
        if self.timeout.recent_window == 0 || self.timeout.history_limit == 0 {
            return Err(Error::Config(
                "timeout history sizes must be at least 1".into(),
            ));
        }
        let t = &self.transition;
        if !(0.0..=1.0).contains(&t.rollback_abandon_threshold)
            || !(0.0..=1.0).contains(&t.rollback_fast_forward_threshold)
            || t.rollback_abandon_threshold > t.rollback_fast_forward_threshold
        {
            return Err(Error::Config(
                "transition rollback thresholds must satisfy 0 <= abandon <= fast_forward <= 1"
                    .into(),
            ));
        }
        if !(0.0..=1.0).contains(&t.resume_progress_split) {
            return Err(Error::Config(
                "transition.resume_progress_split must be within [0, 1]".into(),
            ));
        }
        if t.rollback_secs <= 0.0 || t.quick_finish_secs <= 0.0 {
            return Err(Error::Config("transition durations must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.queue.max_depth, 10);
        assert_eq!(config.timeout.default_multiplier, 2.5);
        assert_eq!(config.timeout.history_limit, 10);
        assert_eq!(config.transition.rollback_abandon_threshold, 0.2);
        assert_eq!(config.transition.quick_finish_secs, 1.0);
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [queue]
            max_depth = 4

            [transition]
            rollback_secs = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.queue.max_depth, 4);
        assert_eq!(config.transition.rollback_secs, 0.5);
        // Untouched sections keep defaults
        assert_eq!(config.timeout.safety_margin, 1.5);
        assert_eq!(config.transition.quick_finish_secs, 1.0);
    }

    #[test]
    fn test_validate_rejects_zero_depth() {
        let mut config = Config::default();
        config.queue.max_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let mut config = Config::default();
        config.transition.rollback_abandon_threshold = 0.95;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duration_helpers() {
        let t = TransitionConfig::default();
        assert_eq!(t.rollback_duration(), Duration::from_millis(300));
        assert_eq!(t.quick_finish_duration(), Duration::from_secs(1));
    }
}
