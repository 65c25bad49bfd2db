//! Fade curve implementations for crossfading
//!
//! A curve maps normalized fade progress (0.0 to 1.0) to a gain multiplier.
//! Fade-in gains rise from 0.0 to 1.0; fade-out gains fall from 1.0 to 0.0.

use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// Fade curve types
///
/// Each curve has a different perceptual quality:
/// - Linear: constant rate of change
/// - Exponential: slow start, fast finish (natural fade-in)
/// - Logarithmic: fast start, slow finish (natural fade-out)
/// - SCurve: smooth acceleration and deceleration
/// - EqualPower: constant perceived loudness while both channels overlap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// v(t) = t
    Linear,

    /// v(t) = t²
    Exponential,

    /// v(t) = (1-t)² for fade-out, sqrt(t) for fade-in
    Logarithmic,

    /// v(t) = 0.5 × (1 - cos(π × t))
    SCurve,

    /// v(t) = sin(t × π/2); the fade-out counterpart is cos(t × π/2),
    /// so the two channels sum to constant power
    EqualPower,
}

impl FadeCurve {
    /// Gain multiplier for a fade-in at the given normalized progress.
    ///
    /// Returns 0.0 at progress 0.0 and 1.0 at progress 1.0; progress is
    /// clamped into that range first.
    pub fn fade_in_gain(&self, progress: f64) -> f64 {
        let t = progress.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => t,
            FadeCurve::Exponential => t * t,
            FadeCurve::Logarithmic => t.sqrt(),
            FadeCurve::SCurve => 0.5 * (1.0 - (std::f64::consts::PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Gain multiplier for a fade-out at the given normalized progress.
    ///
    /// Returns 1.0 at progress 0.0 and 0.0 at progress 1.0.
    pub fn fade_out_gain(&self, progress: f64) -> f64 {
        let t = progress.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => 1.0 - t,
            FadeCurve::Exponential => {
                let inv = 1.0 - t;
                inv * inv
            }
            FadeCurve::Logarithmic => {
                let inv = 1.0 - t;
                inv * inv
            }
            FadeCurve::SCurve => 0.5 * (1.0 + (std::f64::consts::PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).cos(),
        }
    }

    /// The curve that pairs well on the opposite channel of a crossfade
    pub fn recommended_pair(&self) -> FadeCurve {
        match self {
            FadeCurve::Exponential => FadeCurve::Logarithmic,
            FadeCurve::Logarithmic => FadeCurve::Exponential,
            other => *other,
        }
    }

    /// Human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "Linear",
            FadeCurve::Exponential => "Exponential",
            FadeCurve::Logarithmic => "Logarithmic",
            FadeCurve::SCurve => "S-Curve",
            FadeCurve::EqualPower => "Equal Power",
        }
    }

    /// All available variants, for validation and CLI help
    pub fn all_variants() -> &'static [FadeCurve] {
        &[
            FadeCurve::Linear,
            FadeCurve::Exponential,
            FadeCurve::Logarithmic,
            FadeCurve::SCurve,
            FadeCurve::EqualPower,
        ]
    }
}

impl std::str::FromStr for FadeCurve {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(FadeCurve::Linear),
            "exponential" => Ok(FadeCurve::Exponential),
            "logarithmic" => Ok(FadeCurve::Logarithmic),
            "cosine" | "scurve" | "s-curve" | "s_curve" => Ok(FadeCurve::SCurve),
            "equal_power" | "equalpower" | "equal-power" => Ok(FadeCurve::EqualPower),
            other => Err(format!("unknown fade curve: {other}")),
        }
    }
}

impl Default for FadeCurve {
    /// Equal-power is the default: constant loudness while channels overlap
    fn default() -> Self {
        FadeCurve::EqualPower
    }
}

impl std::fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    #[test]
    fn test_fade_in_bounds() {
        for curve in FadeCurve::all_variants() {
            assert!(curve.fade_in_gain(0.0).abs() < 0.01, "{curve} start");
            assert!((curve.fade_in_gain(1.0) - 1.0).abs() < 0.01, "{curve} end");
        }
    }

    #[test]
    fn test_fade_out_bounds() {
        for curve in FadeCurve::all_variants() {
            assert!((curve.fade_out_gain(0.0) - 1.0).abs() < 0.01, "{curve} start");
            assert!(curve.fade_out_gain(1.0).abs() < 0.01, "{curve} end");
        }
    }

    #[test]
    fn test_fade_in_monotonic() {
        for curve in FadeCurve::all_variants() {
            let mut last = curve.fade_in_gain(0.0);
            for i in 1..=100 {
                let gain = curve.fade_in_gain(i as f64 / 100.0);
                assert!(gain >= last - EPSILON, "{curve} not monotonic at {i}");
                last = gain;
            }
        }
    }

    #[test]
    fn test_exponential_midpoint() {
        assert!((FadeCurve::Exponential.fade_in_gain(0.5) - 0.25).abs() < EPSILON);
    }

    #[test]
    fn test_logarithmic_fade_in() {
        assert!((FadeCurve::Logarithmic.fade_in_gain(0.25) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_scurve_midpoint() {
        assert!((FadeCurve::SCurve.fade_in_gain(0.5) - 0.5).abs() < EPSILON);
        assert!((FadeCurve::SCurve.fade_out_gain(0.5) - 0.5).abs() < EPSILON);
    }

    #[test]
    fn test_equal_power_sums_to_constant_power() {
        let curve = FadeCurve::EqualPower;
        for i in 0..=20 {
            let t = i as f64 / 20.0;
            let fade_in = curve.fade_in_gain(t);
            let fade_out = curve.fade_out_gain(t);
            let power = fade_in * fade_in + fade_out * fade_out;
            assert!((power - 1.0).abs() < 1e-6, "power {power} at t {t}");
        }
    }

    #[test]
    fn test_progress_clamped() {
        assert_eq!(FadeCurve::Linear.fade_in_gain(-1.0), 0.0);
        assert_eq!(FadeCurve::Linear.fade_in_gain(2.0), 1.0);
    }

    #[test]
    fn test_parse() {
        assert_eq!("linear".parse::<FadeCurve>().unwrap(), FadeCurve::Linear);
        assert_eq!("Equal_Power".parse::<FadeCurve>().unwrap(), FadeCurve::EqualPower);
        assert_eq!("s-curve".parse::<FadeCurve>().unwrap(), FadeCurve::SCurve);
        assert!("triangle".parse::<FadeCurve>().is_err());
    }

    #[test]
    fn test_recommended_pair() {
        assert_eq!(FadeCurve::Exponential.recommended_pair(), FadeCurve::Logarithmic);
        assert_eq!(FadeCurve::EqualPower.recommended_pair(), FadeCurve::EqualPower);
    }
}
