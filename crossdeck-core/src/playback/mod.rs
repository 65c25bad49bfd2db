//! Playback control: operation queue, transition orchestration, and state

pub mod control;
pub mod coordinator;
pub mod orchestrator;
pub mod queue;
pub mod strategy;
pub mod timeout;

pub use control::PlayerControl;
pub use coordinator::{CoordinatorState, PlaybackStateCoordinator};
pub use orchestrator::{
    CrossfadeOrchestrator, PausedTransition, ResumeStrategy, TransitionOutcome,
};
pub use queue::{CancelFlag, OperationQueue, Priority};
pub use strategy::{select_strategy, TransitionStrategy};
pub use timeout::{OperationKind, TimeoutEstimator};
