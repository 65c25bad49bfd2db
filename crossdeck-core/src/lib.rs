//! # Crossdeck Playback-Control Core
//!
//! In-process control core for a dual-channel audio transition engine.
//!
//! **Purpose:** Serialize playback commands through a priority-preemptive
//! operation queue and orchestrate smooth crossfades between two source
//! channels, preserving correctness under pause, resume, cancellation, and
//! timing pressure.
//!
//! **Architecture:** The low-level rendering graph (channel nodes, mixers,
//! decoding, hardware sessions) lives behind the [`engine::ChannelEngine`]
//! trait; this crate owns only the control plane: the operation queue, the
//! crossfade state machine, the adaptive timeout estimator, and the playback
//! state coordinator.

pub mod config;
pub mod engine;
pub mod error;
pub mod playback;

pub use config::Config;
pub use error::{Error, Result};
pub use playback::PlayerControl;
