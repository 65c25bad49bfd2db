//! Playback state coordination
//!
//! Single source of truth for which channel is active, the playback mode,
//! loaded assets, and gain levels. State changes always build a complete
//! candidate snapshot, validate it, and either commit it atomically or
//! reject it; partial mutation is impossible by construction.

use crate::error::{Error, Result};
use crossdeck_common::{AssetRef, ChannelId, EventBus, PlaybackMode, PlayerEvent};
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Immutable snapshot of coordinated playback state
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorState {
    pub active_channel: ChannelId,
    pub mode: PlaybackMode,
    pub active_asset: Option<AssetRef>,
    pub inactive_asset: Option<AssetRef>,
    pub active_gain: f64,
    pub inactive_gain: f64,
    pub crossfading: bool,
}

impl CoordinatorState {
    /// Hard invariants every committed snapshot must satisfy
    fn validate(&self) -> std::result::Result<(), String> {
        if !(0.0..=1.0).contains(&self.active_gain) {
            return Err(format!("active gain {} outside [0, 1]", self.active_gain));
        }
        if !(0.0..=1.0).contains(&self.inactive_gain) {
            return Err(format!("inactive gain {} outside [0, 1]", self.inactive_gain));
        }
        if self.mode == PlaybackMode::Playing && self.active_asset.is_none() {
            return Err("mode is playing but no active asset is loaded".into());
        }
        Ok(())
    }

    /// Soft invariant: when no crossfade is running the inactive channel
    /// should be silent. Violations are logged, not rejected.
    fn inactive_gain_suspicious(&self) -> bool {
        !self.crossfading && self.inactive_gain > 0.01
    }
}

impl Default for CoordinatorState {
    fn default() -> Self {
        Self {
            active_channel: ChannelId::A,
            mode: PlaybackMode::Stopped,
            active_asset: None,
            inactive_asset: None,
            active_gain: 1.0,
            inactive_gain: 0.0,
            crossfading: false,
        }
    }
}

/// Coordinator owning the shared playback state
///
/// The two channels' gains and roles are exclusively owned here; other
/// components read snapshots and request whole-state transitions.
pub struct PlaybackStateCoordinator {
    state: RwLock<CoordinatorState>,
    events: EventBus,
}

impl PlaybackStateCoordinator {
    pub fn new(events: EventBus) -> Self {
        Self {
            state: RwLock::new(CoordinatorState::default()),
            events,
        }
    }

    /// Current state snapshot
    pub async fn snapshot(&self) -> CoordinatorState {
        self.state.read().await.clone()
    }

    /// Validate a candidate and commit it atomically, or reject and log
    async fn commit(&self, candidate: CoordinatorState, operation: &str) -> Result<()> {
        if let Err(reason) = candidate.validate() {
            warn!(operation, %reason, "state transition rejected");
            self.events.emit_lossy(PlayerEvent::StateRejected {
                reason: reason.clone(),
                timestamp: chrono::Utc::now(),
            });
            return Err(Error::InvalidState(reason));
        }

        if candidate.inactive_gain_suspicious() {
            warn!(
                operation,
                inactive_gain = candidate.inactive_gain,
                "inactive channel audible outside a crossfade"
            );
        }

        let mut state = self.state.write().await;
        *state = candidate;
        debug!(
            operation,
            active_channel = %state.active_channel,
            mode = %state.mode,
            crossfading = state.crossfading,
            "state committed"
        );
        Ok(())
    }

    /// Swap channel roles, carrying assets and gains along
    pub async fn switch_active_channel(&self) -> Result<()> {
        let mut candidate = self.snapshot().await;
        candidate.active_channel = candidate.active_channel.other();
        std::mem::swap(&mut candidate.active_asset, &mut candidate.inactive_asset);
        std::mem::swap(&mut candidate.active_gain, &mut candidate.inactive_gain);
        let active_channel = candidate.active_channel;

        self.commit(candidate, "switch_active_channel").await?;
        self.events.emit_lossy(PlayerEvent::ChannelSwitched {
            active_channel,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Change playback mode
    pub async fn set_mode(&self, mode: PlaybackMode) -> Result<()> {
        let mut candidate = self.snapshot().await;
        candidate.mode = mode;

        self.commit(candidate, "set_mode").await?;
        self.events.emit_lossy(PlayerEvent::ModeChanged {
            mode,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Record an asset as loaded on the inactive channel
    pub async fn load_on_inactive(&self, asset: AssetRef) -> Result<()> {
        let mut candidate = self.snapshot().await;
        candidate.inactive_asset = Some(asset);
        self.commit(candidate, "load_on_inactive").await
    }

    /// Set both gain levels
    pub async fn set_gains(&self, active: f64, inactive: f64) -> Result<()> {
        let mut candidate = self.snapshot().await;
        candidate.active_gain = active;
        candidate.inactive_gain = inactive;
        self.commit(candidate, "set_gains").await
    }

    /// Mark whether a crossfade is in flight
    pub async fn set_crossfading(&self, crossfading: bool) -> Result<()> {
        let mut candidate = self.snapshot().await;
        candidate.crossfading = crossfading;
        self.commit(candidate, "set_crossfading").await
    }

    /// Compound commit for normal crossfade completion: swap roles, promote
    /// the destination asset, clear the outgoing channel, end the crossfade
    pub async fn complete_crossfade(&self, to_asset: &AssetRef) -> Result<()> {
        let mut candidate = self.snapshot().await;
        candidate.active_channel = candidate.active_channel.other();
        candidate.active_asset = Some(to_asset.clone());
        candidate.inactive_asset = None;
        candidate.active_gain = 1.0;
        candidate.inactive_gain = 0.0;
        candidate.crossfading = false;
        let active_channel = candidate.active_channel;

        self.commit(candidate, "complete_crossfade").await?;
        self.events.emit_lossy(PlayerEvent::ChannelSwitched {
            active_channel,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Compound commit for an instantaneous channel swap without a gradual
    /// fade, used when a pause interrupted a transition and playback resumes
    /// directly on the destination
    pub async fn atomic_switch(&self, to_asset: &AssetRef) -> Result<()> {
        let mut candidate = self.snapshot().await;
        candidate.active_channel = candidate.active_channel.other();
        candidate.active_asset = Some(to_asset.clone());
        candidate.inactive_asset = None;
        candidate.active_gain = 1.0;
        candidate.inactive_gain = 0.0;
        candidate.crossfading = false;
        candidate.mode = PlaybackMode::Playing;
        let active_channel = candidate.active_channel;

        self.commit(candidate, "atomic_switch").await?;
        self.events.emit_lossy(PlayerEvent::ChannelSwitched {
            active_channel,
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }
}
