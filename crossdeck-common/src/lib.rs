//! # Crossdeck Common Library
//!
//! Shared leaf types for the crossdeck playback-control core:
//! - Fade curve definitions and gain calculations
//! - Event types (`PlayerEvent` enum) and the broadcast `EventBus`
//! - Channel/mode/asset identity types

pub mod events;
pub mod fade_curves;
pub mod types;

pub use events::{EventBus, PlayerEvent};
pub use fade_curves::FadeCurve;
pub use types::{AssetRef, ChannelId, PlaybackMode};
