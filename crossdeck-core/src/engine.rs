//! Boundary to the dual-channel rendering engine
//!
//! The core never touches channel nodes, mixers, or buffers directly; it
//! drives the engine through this narrow async trait and commits the results
//! into the playback state coordinator. Implementations wrap whatever
//! rendering stack the host application uses.

use crate::error::Result;
use async_trait::async_trait;
use crossdeck_common::{AssetRef, ChannelId, FadeCurve};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Phases reported by a synchronized dual-channel transition
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionPhase {
    /// Both channels aligned, fade not yet started
    Preparing,

    /// Fade in progress; payload is overall progress in [0, 1]
    Fading(f64),

    /// Channel roles being swapped
    Switching,

    /// Outgoing channel being stopped and cleared
    Cleanup,

    /// Transition machinery returned to rest
    Idle,
}

/// Opaque handle to an asset the engine has loaded and can schedule
#[derive(Debug, Clone)]
pub struct AssetHandle {
    /// The reference this handle was loaded from
    pub asset: AssetRef,

    /// Decoded duration, when the engine knows it
    pub duration: Option<Duration>,
}

/// Point-in-time view of both channels during a crossfade
#[derive(Debug, Clone, Copy)]
pub struct CrossfadeSnapshot {
    pub active_gain: f64,
    pub inactive_gain: f64,
    pub active_position: Duration,
    pub inactive_position: Duration,
    pub active_channel: ChannelId,
}

/// Position within the currently active track
#[derive(Debug, Clone, Copy)]
pub struct PositionInfo {
    pub position: Duration,
    pub duration: Duration,
}

/// The rendering engine the core drives
///
/// All methods are cancel-safe from the core's perspective: the orchestrator
/// re-validates its own state after every await rather than assuming the
/// engine call completed in the state it started in.
#[async_trait]
pub trait ChannelEngine: Send + Sync {
    /// Decode and schedule an asset on the inactive channel
    async fn load_asset(&self, asset: &AssetRef) -> Result<AssetHandle>;

    /// Align the inactive channel for a synchronized start
    async fn prepare_inactive_channel(&self) -> Result<()>;

    /// Begin a synchronized dual-channel transition
    ///
    /// The returned receiver yields phase events until the transition
    /// finishes or is interrupted; the channel closing is the completion
    /// signal.
    async fn perform_synchronized_transition(
        &self,
        duration: Duration,
        curve: FadeCurve,
    ) -> Result<mpsc::Receiver<TransitionPhase>>;

    /// Freeze both channels in place
    async fn pause_both_channels(&self) -> Result<()>;

    /// Resume both channels from a frozen state
    async fn resume_both_channels(&self) -> Result<()>;

    /// Smoothly return to the pre-transition gain state
    ///
    /// Returns the active channel's gain after the rollback settles.
    async fn rollback_transition(&self, duration: Duration) -> Result<f64>;

    /// Drive an in-flight transition to completion over `duration`
    async fn fast_forward_transition(&self, duration: Duration) -> Result<()>;

    /// Swap which channel is routed as active
    async fn switch_active_channel(&self) -> Result<()>;

    /// Stop playback on the inactive channel
    async fn stop_inactive_channel(&self) -> Result<()>;

    /// Reset the inactive channel's mixer to its rest configuration
    async fn reset_inactive_mixer(&self) -> Result<()>;

    /// Drop whatever asset is scheduled on the inactive channel
    async fn clear_inactive_asset(&self) -> Result<()>;

    /// Set both channel gains directly (used by explicit fade loops)
    async fn set_channel_gains(&self, active: f64, inactive: f64) -> Result<()>;

    /// Gains, positions, and active role of both channels, if available
    async fn crossfade_snapshot(&self) -> Option<CrossfadeSnapshot>;

    /// Position and duration of the active track, if available
    async fn current_position(&self) -> Option<PositionInfo>;
}
