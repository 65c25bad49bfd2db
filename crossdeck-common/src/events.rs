//! Event types and broadcast bus for the playback-control core
//!
//! Components emit `PlayerEvent`s on a shared `EventBus`
//! (tokio::sync::broadcast) rather than calling observers directly; UIs,
//! remote-control surfaces, and tests subscribe at construction time.

use crate::types::{AssetRef, ChannelId, PlaybackMode};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Events emitted by the playback-control core
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Playback mode changed
    ModeChanged {
        mode: PlaybackMode,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Active channel role swapped
    ChannelSwitched {
        active_channel: ChannelId,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A transition toward `to_asset` began
    TransitionStarted {
        to_asset: AssetRef,
        strategy: String,
        duration_ms: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Crossfade progress update (0.0 to 1.0)
    TransitionProgress {
        progress: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Transition finished and the channel roles were swapped
    TransitionCompleted {
        to_asset: AssetRef,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Transition frozen mid-flight; a resume snapshot was captured
    TransitionPaused {
        progress: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A paused transition is being driven to completion
    TransitionResumed {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A young transition was rolled back to its pre-transition state
    TransitionRolledBack {
        progress: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A mid-flight transition was fast-forwarded to completion
    TransitionFastForwarded {
        progress: f64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Transition hard-stopped without a rollback curve
    TransitionCancelled {
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A submitted operation was evicted by a higher-priority one
    OperationPreempted {
        tag: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A candidate state snapshot failed invariant validation
    StateRejected {
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast bus for `PlayerEvent`s
///
/// One-to-many fan-out; subscribers that fall behind lose the oldest
/// buffered events, never block the emitter.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlayerEvent>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Emit an event; `Err` means no subscriber is listening
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: PlayerEvent,
    ) -> Result<usize, broadcast::error::SendError<PlayerEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring the no-subscriber case
    pub fn emit_lossy(&self, event: PlayerEvent) {
        if self.tx.send(event).is_err() {
            debug!("event dropped: no subscribers");
        }
    }

    /// Configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mode_event() -> PlayerEvent {
        PlayerEvent::ModeChanged {
            mode: PlaybackMode::Playing,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_bus_new() {
        let bus = EventBus::new(16);
        assert_eq!(bus.capacity(), 16);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(16);
        assert!(bus.emit(mode_event()).is_err());

        // Lossy emit never fails
        bus.emit_lossy(mode_event());
    }

    #[tokio::test]
    async fn test_emit_with_subscriber() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.emit(mode_event()).unwrap();

        match rx.recv().await.unwrap() {
            PlayerEvent::ModeChanged { mode, .. } => assert_eq!(mode, PlaybackMode::Playing),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_event_serialization_tag() {
        let json = serde_json::to_string(&mode_event()).unwrap();
        assert!(json.contains("\"type\":\"ModeChanged\""));
    }
}
