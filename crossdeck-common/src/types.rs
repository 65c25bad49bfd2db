//! Channel, mode, and asset identity types shared across the workspace

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One of the two parallel playback paths used to overlap outgoing and
/// incoming audio during a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelId {
    A,
    B,
}

impl ChannelId {
    /// The opposite channel (the inactive one, when `self` is active).
    pub fn other(self) -> ChannelId {
        match self {
            ChannelId::A => ChannelId::B,
            ChannelId::B => ChannelId::A,
        }
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelId::A => write!(f, "A"),
            ChannelId::B => write!(f, "B"),
        }
    }
}

/// Playback mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackMode {
    Playing,
    Paused,
    Stopped,
}

impl std::fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackMode::Playing => write!(f, "playing"),
            PlaybackMode::Paused => write!(f, "paused"),
            PlaybackMode::Stopped => write!(f, "stopped"),
        }
    }
}

/// Reference to a playable asset
///
/// The core never opens or decodes assets itself; it hands references to the
/// channel engine, which resolves `location` however it sees fit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    /// Stable identity of this reference
    pub id: Uuid,

    /// Engine-interpreted locator (file path, URL, library key, ...)
    pub location: String,
}

impl AssetRef {
    /// Create a new reference with a fresh id
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            location: location.into(),
        }
    }
}

impl std::fmt::Display for AssetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.location)
    }
}
