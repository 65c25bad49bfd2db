//! Top-level playback control facade
//!
//! Wires the operation queue, crossfade orchestrator, timeout estimator, and
//! state coordinator together behind the caller-facing surface.
//!
//! Transition starts are serialized through the operation queue so that at
//! most one command body mutates orchestrator state at a time. Pause, resume,
//! and cancel go to the orchestrator directly: they must take effect while a
//! start command is suspended mid-flight, which the queue's head-of-line
//! policy would otherwise forbid. The orchestrator's generation checks make
//! that interleaving safe.

use crate::config::Config;
use crate::engine::ChannelEngine;
use crate::error::Result;
use crate::playback::coordinator::PlaybackStateCoordinator;
use crate::playback::orchestrator::{
    CrossfadeOrchestrator, PausedTransition, TransitionOutcome,
};
use crate::playback::queue::{CancelFlag, OperationQueue, Priority};
use crate::playback::timeout::TimeoutEstimator;
use crossdeck_common::{AssetRef, EventBus, FadeCurve, PlaybackMode, PlayerEvent};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Playback control core
///
/// One instance per dual-channel engine; all playback commands flow through
/// here.
pub struct PlayerControl {
    engine: Arc<dyn ChannelEngine>,
    queue: OperationQueue,
    orchestrator: Arc<CrossfadeOrchestrator>,
    coordinator: Arc<PlaybackStateCoordinator>,
    events: EventBus,
}

impl PlayerControl {
    /// Create the control core around an engine
    pub fn new(engine: Arc<dyn ChannelEngine>, config: Config) -> Self {
        let events = EventBus::new(256);
        let coordinator = Arc::new(PlaybackStateCoordinator::new(events.clone()));
        let timeouts = Arc::new(TimeoutEstimator::new(config.timeout.clone()));
        let orchestrator = Arc::new(CrossfadeOrchestrator::new(
            Arc::clone(&engine),
            Arc::clone(&coordinator),
            timeouts,
            events.clone(),
            config.clone(),
        ));
        let queue = OperationQueue::with_events(config.queue.clone(), events.clone());

        Self {
            engine,
            queue,
            orchestrator,
            coordinator,
            events,
        }
    }

    /// Subscribe to the core's event stream
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    /// The shared state coordinator (read access for observers)
    pub fn coordinator(&self) -> Arc<PlaybackStateCoordinator> {
        Arc::clone(&self.coordinator)
    }

    /// Load the first asset and start playing it on the current channel
    ///
    /// Boot path for a freshly created core with nothing active yet.
    pub async fn load_initial(&self, asset: AssetRef) -> Result<()> {
        info!(asset = %asset, "loading initial asset");
        self.engine.load_asset(&asset).await?;
        self.coordinator.load_on_inactive(asset.clone()).await?;
        self.engine.switch_active_channel().await?;
        self.coordinator.atomic_switch(&asset).await?;
        self.engine.set_channel_gains(1.0, 0.0).await?;
        Ok(())
    }

    /// Submit an arbitrary command to the serialized execution stream
    pub async fn enqueue<T, F, Fut>(&self, priority: Priority, tag: &str, body: F) -> Result<T>
    where
        F: FnOnce(CancelFlag) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.queue.enqueue(priority, tag, body).await
    }

    /// Admitted-but-unfinished command count
    pub fn depth(&self) -> usize {
        self.queue.depth()
    }

    /// Start a transition to `target`, serialized behind prior commands
    pub async fn start_transition(
        &self,
        target: AssetRef,
        duration: Duration,
        curve: FadeCurve,
    ) -> Result<TransitionOutcome> {
        let orchestrator = Arc::clone(&self.orchestrator);
        self.queue
            .enqueue(Priority::Normal, "start-transition", move |flag| async move {
                if flag.is_cancelled() {
                    debug!("transition command cancelled before start");
                    return Ok(TransitionOutcome::Cancelled);
                }
                orchestrator.start_transition(target, duration, curve).await
            })
            .await
    }

    /// Pause playback, freezing any in-flight transition
    ///
    /// Returns the captured snapshot when a transition was frozen; `None`
    /// means a plain pause was performed instead.
    pub async fn pause(&self) -> Result<Option<PausedTransition>> {
        let snapshot = self.orchestrator.pause_transition().await?;
        if snapshot.is_none() {
            debug!("no transition to freeze; plain pause");
            self.engine.pause_both_channels().await?;
            self.coordinator.set_mode(PlaybackMode::Paused).await?;
        }
        Ok(snapshot)
    }

    /// Resume playback, completing any paused transition
    ///
    /// Returns true when a paused transition was driven to completion.
    pub async fn resume(&self) -> Result<bool> {
        let resumed = self.orchestrator.resume_transition().await?;
        if !resumed {
            self.engine.resume_both_channels().await?;
            self.coordinator.set_mode(PlaybackMode::Playing).await?;
        }
        Ok(resumed)
    }

    /// Hard-stop any transition, active or paused
    pub async fn cancel(&self) -> Result<()> {
        self.orchestrator.cancel_active_transition().await
    }

    /// Direct access to the orchestrator (tests and advanced callers)
    pub fn orchestrator(&self) -> Arc<CrossfadeOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    /// Stop the queue worker once the backlog drains
    pub fn shutdown(&self) {
        self.queue.shutdown();
    }
}
