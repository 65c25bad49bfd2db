//! Time-budget-aware transition strategy selection
//!
//! A pure decision function: given how much of the current track remains and
//! how long a crossfade was requested, pick the richest transition the
//! remaining time can pay for.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Shortest fade ever scheduled; degenerate cases collapse to this
pub const MIN_FADE: Duration = Duration::from_millis(100);

/// The three transition shapes
///
/// Produced once per transition request and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionStrategy {
    /// Enough track remains for the full requested overlap
    FullCrossfade { duration: Duration },

    /// Overlap shortened to exactly the remaining track time
    ReducedCrossfade { duration: Duration },

    /// Too little time to overlap at all: fade out, switch, fade in
    SeparateFades {
        fade_out: Duration,
        fade_in: Duration,
    },
}

impl TransitionStrategy {
    /// Short name for logs and events
    pub fn label(&self) -> &'static str {
        match self {
            TransitionStrategy::FullCrossfade { .. } => "full_crossfade",
            TransitionStrategy::ReducedCrossfade { .. } => "reduced_crossfade",
            TransitionStrategy::SeparateFades { .. } => "separate_fades",
        }
    }

    /// The overlap duration, when the strategy has one
    pub fn overlap_duration(&self) -> Option<Duration> {
        match self {
            TransitionStrategy::FullCrossfade { duration }
            | TransitionStrategy::ReducedCrossfade { duration } => Some(*duration),
            TransitionStrategy::SeparateFades { .. } => None,
        }
    }
}

/// Choose a transition strategy from the track position and the requested
/// crossfade duration
///
/// - Nothing remains (or nothing was requested): instant switch with the
///   minimum fades on both sides.
/// - Remaining time covers the request: full crossfade as requested.
/// - Remaining time covers at least half the request: crossfade reduced to
///   the remaining time.
/// - Otherwise: separate fades sized to the remaining time, floored at the
///   minimum fade.
pub fn select_strategy(
    position: Duration,
    duration: Duration,
    requested: Duration,
) -> TransitionStrategy {
    let remaining = duration.as_secs_f64() - position.as_secs_f64();
    let requested_secs = requested.as_secs_f64();

    if remaining <= 0.0 || requested_secs <= 0.0 {
        return TransitionStrategy::SeparateFades {
            fade_out: MIN_FADE,
            fade_in: MIN_FADE,
        };
    }

    if remaining >= requested_secs {
        TransitionStrategy::FullCrossfade {
            duration: requested,
        }
    } else if remaining >= requested_secs / 2.0 {
        TransitionStrategy::ReducedCrossfade {
            duration: Duration::from_secs_f64(remaining),
        }
    } else {
        let fade = Duration::from_secs_f64(remaining.max(MIN_FADE.as_secs_f64()));
        TransitionStrategy::SeparateFades {
            fade_out: fade,
            fade_in: fade,
        }
    }
}
