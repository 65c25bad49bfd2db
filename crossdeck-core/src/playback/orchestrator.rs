//! Crossfade orchestration
//!
//! The transition state machine: starts, pauses, resumes, cancels, and rolls
//! back a transition between the two channels. Commands reach this component
//! one at a time, but every await inside it is a re-entrancy window: a pause
//! or a superseding start can interleave while a fade loop sleeps or a
//! progress stream is being consumed. State observed before an await is
//! therefore re-validated after it, using a monotonically increasing
//! generation token stamped into each transition.
//!
//! Lock order is always `active` before `paused`.

use crate::config::Config;
use crate::engine::{ChannelEngine, TransitionPhase};
use crate::error::{Error, Result};
use crate::playback::coordinator::PlaybackStateCoordinator;
use crate::playback::strategy::{select_strategy, TransitionStrategy};
use crate::playback::timeout::{OperationKind, TimeoutEstimator};
use crossdeck_common::{AssetRef, ChannelId, EventBus, FadeCurve, PlaybackMode, PlayerEvent};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

/// How a started transition ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// Fade ran to the end and the channel roles were swapped
    Completed,

    /// A pause interrupted the fade; a resume snapshot was captured
    Paused,

    /// A concurrent rollback or cancel cleared the transition mid-flight
    Cancelled,
}

/// How a paused transition should be brought to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResumeStrategy {
    /// Early pause: the fade would ideally continue from where it stopped
    ContinueFromProgress { remaining: Duration },

    /// Late pause: finish the fade in one short pass
    QuickFinish,
}

/// Snapshot captured when a transition is paused mid-flight
///
/// Consumed by resume, or invalidated by the next transition start.
#[derive(Debug, Clone)]
pub struct PausedTransition {
    pub progress: f64,
    pub active_gain: f64,
    pub inactive_gain: f64,
    pub active_position: Duration,
    pub inactive_position: Duration,
    pub active_channel: ChannelId,
    pub to_asset: AssetRef,
    pub duration: Duration,
    pub curve: FadeCurve,
    pub resume: ResumeStrategy,
}

/// Gains and positions captured before a transition begins, for rollback
#[derive(Debug, Clone, Copy)]
struct PriorState {
    active_gain: f64,
    inactive_gain: f64,
    active_position: Duration,
    inactive_position: Duration,
}

impl Default for PriorState {
    fn default() -> Self {
        Self {
            active_gain: 1.0,
            inactive_gain: 0.0,
            active_position: Duration::ZERO,
            inactive_position: Duration::ZERO,
        }
    }
}

/// In-flight transition bookkeeping
struct ActiveTransition {
    generation: u64,
    started_at: Instant,
    duration: Duration,
    curve: FadeCurve,
    from_asset: AssetRef,
    to_asset: AssetRef,
    progress: f64,
    prior: PriorState,
}

/// The transition state machine
///
/// States: Idle → Active → {Completed, Paused, Cancelled};
/// Paused → {Resuming → Active, Cancelled}.
pub struct CrossfadeOrchestrator {
    engine: Arc<dyn ChannelEngine>,
    coordinator: Arc<PlaybackStateCoordinator>,
    timeouts: Arc<TimeoutEstimator>,
    events: EventBus,
    config: Config,
    active: Mutex<Option<ActiveTransition>>,
    paused: Mutex<Option<PausedTransition>>,
    generation: AtomicU64,
}

impl CrossfadeOrchestrator {
    pub fn new(
        engine: Arc<dyn ChannelEngine>,
        coordinator: Arc<PlaybackStateCoordinator>,
        timeouts: Arc<TimeoutEstimator>,
        events: EventBus,
        config: Config,
    ) -> Self {
        Self {
            engine,
            coordinator,
            timeouts,
            events,
            config,
            active: Mutex::new(None),
            paused: Mutex::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// True while a transition is in flight
    pub async fn has_active_transition(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// The stored pause snapshot, if any
    pub async fn paused_snapshot(&self) -> Option<PausedTransition> {
        self.paused.lock().await.clone()
    }

    /// Start a transition from the current track to `target`
    ///
    /// An in-flight transition is superseded first (rolled back,
    /// fast-forwarded, or left to finish, depending on its progress). A
    /// failed asset load clears all transition state before the error
    /// propagates; no partial state survives.
    pub async fn start_transition(
        &self,
        target: AssetRef,
        requested: Duration,
        curve: FadeCurve,
    ) -> Result<TransitionOutcome> {
        if self.active.lock().await.is_some() {
            self.supersede_active().await?;
        }

        let snapshot = self.coordinator.snapshot().await;
        let from_asset = snapshot.active_asset.clone().ok_or_else(|| {
            Error::InvalidState("transition requested with no active asset".into())
        })?;

        // A new start invalidates any stale pause state
        if self.paused.lock().await.take().is_some() {
            debug!("stale paused transition discarded");
        }

        let position = self.engine.current_position().await.ok_or_else(|| {
            Error::InvalidState("track position unavailable".into())
        })?;

        let strategy = select_strategy(position.position, position.duration, requested);
        info!(
            from = %from_asset,
            to = %target,
            strategy = strategy.label(),
            "starting transition"
        );
        self.events.emit_lossy(PlayerEvent::TransitionStarted {
            to_asset: target.clone(),
            strategy: strategy.label().to_string(),
            duration_ms: strategy
                .overlap_duration()
                .unwrap_or(requested)
                .as_millis() as u64,
            timestamp: chrono::Utc::now(),
        });

        if let TransitionStrategy::SeparateFades { fade_out, fade_in } = strategy {
            self.run_separate_fades(&target, fade_out, fade_in, curve).await?;
            self.events.emit_lossy(PlayerEvent::TransitionCompleted {
                to_asset: target,
                timestamp: chrono::Utc::now(),
            });
            return Ok(TransitionOutcome::Completed);
        }

        let duration = strategy
            .overlap_duration()
            .expect("overlap strategies carry a duration");

        let prior = match self.engine.crossfade_snapshot().await {
            Some(s) => PriorState {
                active_gain: s.active_gain,
                inactive_gain: s.inactive_gain,
                active_position: s.active_position,
                inactive_position: s.inactive_position,
            },
            None => PriorState {
                active_position: position.position,
                ..PriorState::default()
            },
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        *self.active.lock().await = Some(ActiveTransition {
            generation,
            started_at: Instant::now(),
            duration,
            curve,
            from_asset,
            to_asset: target.clone(),
            progress: 0.0,
            prior,
        });

        // Any failure between here and the running fade must leave no
        // transition state behind
        let rx = match self.begin_crossfade(&target, duration, curve).await {
            Ok(rx) => rx,
            Err(e) => {
                self.clear_active_if(generation).await;
                if let Err(reset) = self.coordinator.set_crossfading(false).await {
                    warn!(error = %reset, "could not reset crossfade flag after failed start");
                }
                return Err(e);
            }
        };

        let mut stream = ReceiverStream::new(rx);
        while let Some(phase) = stream.next().await {
            match phase {
                TransitionPhase::Fading(progress) => {
                    {
                        let mut active = self.active.lock().await;
                        match active.as_mut() {
                            Some(t) if t.generation == generation => t.progress = progress,
                            _ => {
                                debug!("transition superseded mid-flight; ignoring progress");
                                break;
                            }
                        }
                    }
                    self.events.emit_lossy(PlayerEvent::TransitionProgress {
                        progress,
                        timestamp: chrono::Utc::now(),
                    });
                }
                other => debug!(phase = ?other, "transition phase"),
            }
        }

        // The stream closed; re-validate that this is still our transition
        // before any destructive cleanup.
        {
            let mut active = self.active.lock().await;
            let still_mine =
                matches!(active.as_ref(), Some(t) if t.generation == generation);
            let pause_captured = self.paused.lock().await.is_some();

            if pause_captured {
                if still_mine {
                    *active = None;
                }
                info!("transition interrupted by pause");
                return Ok(TransitionOutcome::Paused);
            }
            if !still_mine {
                info!("transition cleared mid-flight; skipping cleanup");
                return Ok(TransitionOutcome::Cancelled);
            }
            *active = None;
        }

        self.finish_switch(&target).await?;
        info!(to = %target, "transition completed");
        self.events.emit_lossy(PlayerEvent::TransitionCompleted {
            to_asset: target,
            timestamp: chrono::Utc::now(),
        });
        Ok(TransitionOutcome::Completed)
    }

    /// Freeze an in-flight transition and capture a resume snapshot
    ///
    /// Returns `None` when there is nothing to pause or the engine cannot
    /// report its state; the caller then falls back to a plain pause with no
    /// dual-channel freeze. Pausing twice without resuming is a no-op: the
    /// stored snapshot is returned unchanged.
    pub async fn pause_transition(&self) -> Result<Option<PausedTransition>> {
        let mut active = self.active.lock().await;
        let mut paused = self.paused.lock().await;

        if let Some(existing) = paused.as_ref() {
            debug!("pause ignored: snapshot already captured");
            return Ok(Some(existing.clone()));
        }

        let Some(transition) = active.as_ref() else {
            return Ok(None);
        };

        let Some(snap) = self.engine.crossfade_snapshot().await else {
            warn!("engine state unavailable; aborting transition pause");
            return Ok(None);
        };

        let resume = if transition.progress < self.config.transition.resume_progress_split {
            ResumeStrategy::ContinueFromProgress {
                remaining: transition.duration.mul_f64(1.0 - transition.progress),
            }
        } else {
            ResumeStrategy::QuickFinish
        };

        let snapshot = PausedTransition {
            progress: transition.progress,
            active_gain: snap.active_gain,
            inactive_gain: snap.inactive_gain,
            active_position: snap.active_position,
            inactive_position: snap.inactive_position,
            active_channel: snap.active_channel,
            to_asset: transition.to_asset.clone(),
            duration: transition.duration,
            curve: transition.curve,
            resume,
        };

        info!(
            progress = snapshot.progress,
            resume = ?snapshot.resume,
            "transition paused"
        );
        *paused = Some(snapshot.clone());
        *active = None;
        drop(paused);
        drop(active);

        self.engine.pause_both_channels().await?;
        self.coordinator.set_mode(PlaybackMode::Paused).await?;
        self.events.emit_lossy(PlayerEvent::TransitionPaused {
            progress: snapshot.progress,
            timestamp: chrono::Utc::now(),
        });
        Ok(Some(snapshot))
    }

    /// Drive a paused transition to completion
    ///
    /// Returns `false` when no pause snapshot is stored. The snapshot is
    /// cleared before any engine call, so a concurrent command cannot resume
    /// it twice.
    pub async fn resume_transition(&self) -> Result<bool> {
        let Some(paused) = self.paused.lock().await.take() else {
            return Ok(false);
        };

        self.events.emit_lossy(PlayerEvent::TransitionResumed {
            timestamp: chrono::Utc::now(),
        });

        if let ResumeStrategy::ContinueFromProgress { remaining } = paused.resume {
            // The engine has no primitive for rejoining a transition
            // mid-way, so this path finishes quickly instead. The snapshot
            // keeps `remaining` for when that primitive exists.
            debug!(
                remaining_ms = remaining.as_millis() as u64,
                "mid-transition resume unsupported; finishing quickly"
            );
        }

        self.engine.resume_both_channels().await?;
        self.fade_channel_gains(
            (paused.active_gain, paused.inactive_gain),
            (0.0, 1.0),
            self.config.transition.quick_finish_duration(),
            paused.curve,
        )
        .await?;

        self.engine.switch_active_channel().await?;
        self.engine.stop_inactive_channel().await?;
        self.engine.clear_inactive_asset().await?;
        self.coordinator.atomic_switch(&paused.to_asset).await?;

        info!(to = %paused.to_asset, "paused transition driven to completion");
        Ok(true)
    }

    /// Unconditional hard stop: clear all transition state and silence the
    /// inactive channel, with no rollback curve
    pub async fn cancel_active_transition(&self) -> Result<()> {
        let had_active = self.active.lock().await.take().is_some();
        let had_paused = self.paused.lock().await.take().is_some();
        if !had_active && !had_paused {
            debug!("cancel requested with no transition in flight");
            return Ok(());
        }

        self.engine.stop_inactive_channel().await?;
        self.engine.reset_inactive_mixer().await?;
        self.engine.clear_inactive_asset().await?;
        self.engine.set_channel_gains(1.0, 0.0).await?;
        self.coordinator.set_gains(1.0, 0.0).await?;
        self.coordinator.set_crossfading(false).await?;

        info!("transition cancelled");
        self.events.emit_lossy(PlayerEvent::TransitionCancelled {
            timestamp: chrono::Utc::now(),
        });
        Ok(())
    }

    /// Resolve an in-flight transition that a new start must supersede
    ///
    /// Threshold policy on progress p = elapsed / duration:
    /// - p < abandon threshold: cheap to abandon, roll back smoothly
    /// - p within [abandon, fast-forward]: too disruptive to abandon
    ///   audibly, fast-forward to completion instead
    /// - p above fast-forward threshold: let it finish naturally
    ///
    /// Local tracking is cleared before the first engine await so a
    /// concurrently completing transition cannot clobber fresh state.
    async fn supersede_active(&self) -> Result<()> {
        let taken = self.active.lock().await.take();
        if self.paused.lock().await.take().is_some() {
            debug!("stale paused transition discarded");
        }
        let Some(transition) = taken else {
            return Ok(());
        };

        let progress = (transition.started_at.elapsed().as_secs_f64()
            / transition.duration.as_secs_f64())
        .clamp(0.0, 1.0);
        let cfg = &self.config.transition;

        if progress < cfg.rollback_abandon_threshold {
            info!(
                progress,
                from = %transition.from_asset,
                "superseded transition is young; rolling back"
            );
            let settled = self
                .engine
                .rollback_transition(cfg.rollback_duration())
                .await?;
            debug!(
                settled_gain = settled,
                restore_position_ms = transition.prior.active_position.as_millis() as u64,
                "rollback settled"
            );
            self.engine.stop_inactive_channel().await?;
            self.engine.clear_inactive_asset().await?;
            self.coordinator
                .set_gains(
                    transition.prior.active_gain,
                    transition.prior.inactive_gain,
                )
                .await?;
            self.coordinator.set_crossfading(false).await?;
            self.events.emit_lossy(PlayerEvent::TransitionRolledBack {
                progress,
                timestamp: chrono::Utc::now(),
            });
        } else if progress <= cfg.rollback_fast_forward_threshold {
            info!(
                progress,
                to = %transition.to_asset,
                "superseded transition is audible; fast-forwarding to completion"
            );
            self.engine
                .fast_forward_transition(cfg.rollback_duration())
                .await?;
            self.finish_switch(&transition.to_asset).await?;
            self.events.emit_lossy(PlayerEvent::TransitionFastForwarded {
                progress,
                timestamp: chrono::Utc::now(),
            });
        } else {
            debug!(progress, "superseded transition nearly complete; letting it finish");
        }
        Ok(())
    }

    /// Fade-out / switch / fade-in sequence with no dual-channel overlap
    async fn run_separate_fades(
        &self,
        target: &AssetRef,
        fade_out: Duration,
        fade_in: Duration,
        curve: FadeCurve,
    ) -> Result<()> {
        debug!(
            fade_out_ms = fade_out.as_millis() as u64,
            fade_in_ms = fade_in.as_millis() as u64,
            "running separate fade sequence"
        );

        self.fade_channel_gains((1.0, 0.0), (0.0, 0.0), fade_out, curve).await?;

        if let Err(e) = self.stage_separate_switch(target).await {
            // The outgoing track is silent at this point; bring its gain
            // back before propagating
            if let Err(restore) = self
                .fade_channel_gains((0.0, 0.0), (1.0, 0.0), fade_in, curve)
                .await
            {
                warn!(error = %restore, "could not restore gain after failed switch");
            }
            return Err(e);
        }

        self.fade_channel_gains((0.0, 0.0), (1.0, 0.0), fade_in, curve).await?;
        self.coordinator.complete_crossfade(target).await?;
        Ok(())
    }

    /// Load the destination and swap channel roles for a separate-fades
    /// transition; runs between the fade-out and the fade-in
    async fn stage_separate_switch(&self, target: &AssetRef) -> Result<()> {
        self.load_with_deadline(target).await?;
        self.coordinator.load_on_inactive(target.clone()).await?;
        self.prepare_inactive_timed().await?;
        self.engine.switch_active_channel().await?;
        self.engine.stop_inactive_channel().await?;
        self.engine.clear_inactive_asset().await?;
        Ok(())
    }

    /// Load, stage, and kick off the synchronized fade
    ///
    /// The caller owns cleanup: any error here must clear the stored
    /// transition and the crossfading flag before propagating.
    async fn begin_crossfade(
        &self,
        target: &AssetRef,
        duration: Duration,
        curve: FadeCurve,
    ) -> Result<mpsc::Receiver<TransitionPhase>> {
        self.load_with_deadline(target).await?;
        self.coordinator.load_on_inactive(target.clone()).await?;
        self.coordinator.set_crossfading(true).await?;
        self.prepare_inactive_timed().await?;
        self.engine
            .perform_synchronized_transition(duration, curve)
            .await
    }

    /// Normal completion cleanup: swap roles, silence and clear the
    /// outgoing channel, commit the result
    async fn finish_switch(&self, target: &AssetRef) -> Result<()> {
        self.engine.switch_active_channel().await?;
        self.engine.stop_inactive_channel().await?;
        self.engine.clear_inactive_asset().await?;
        self.coordinator.complete_crossfade(target).await?;
        Ok(())
    }

    /// Load an asset under the adaptive deadline and feed the estimator
    async fn load_with_deadline(&self, target: &AssetRef) -> Result<()> {
        let expected = Duration::from_millis(self.config.timeout.expected_asset_load_ms);
        let allowed = self
            .timeouts
            .adaptive_timeout(OperationKind::AssetLoad, expected);

        let started = Instant::now();
        match tokio::time::timeout(allowed, self.engine.load_asset(target)).await {
            Err(_) => {
                warn!(asset = %target, allowed_ms = allowed.as_millis() as u64,
                    "asset load exceeded adaptive deadline");
                Err(Error::AssetLoadTimeout(allowed))
            }
            Ok(Err(e)) => Err(Error::AssetLoadFailed(e.to_string())),
            Ok(Ok(_handle)) => {
                self.timeouts
                    .record_duration(OperationKind::AssetLoad, expected, started.elapsed());
                Ok(())
            }
        }
    }

    /// Prepare the inactive channel, feeding the estimator's prepare history
    async fn prepare_inactive_timed(&self) -> Result<()> {
        let expected = Duration::from_millis(self.config.timeout.expected_channel_prepare_ms);
        let started = Instant::now();
        self.engine.prepare_inactive_channel().await?;
        self.timeouts
            .record_duration(OperationKind::ChannelPrepare, expected, started.elapsed());
        Ok(())
    }

    /// Step both channel gains from `from` to `to` over `duration`
    ///
    /// 10 to 100 gain updates per second, more for short fades.
    async fn fade_channel_gains(
        &self,
        from: (f64, f64),
        to: (f64, f64),
        duration: Duration,
        curve: FadeCurve,
    ) -> Result<()> {
        let secs = duration.as_secs_f64().max(0.01);
        let hz = (60.0 / secs).clamp(10.0, 100.0);
        let steps = (secs * hz).round().max(1.0) as u32;
        let tick = Duration::from_secs_f64(secs / steps as f64);

        for step in 1..=steps {
            tokio::time::sleep(tick).await;
            let shaped = curve.fade_in_gain(step as f64 / steps as f64);
            let active = from.0 + (to.0 - from.0) * shaped;
            let inactive = from.1 + (to.1 - from.1) * shaped;
            self.engine.set_channel_gains(active, inactive).await?;
        }
        Ok(())
    }

    async fn clear_active_if(&self, generation: u64) {
        let mut active = self.active.lock().await;
        if matches!(active.as_ref(), Some(t) if t.generation == generation) {
            *active = None;
        }
    }
}
