//! Crossdeck demo driver
//!
//! Runs the playback-control core against a simulated dual-channel engine:
//! loads an initial track, crossfades to a second, then pauses a third
//! transition mid-flight and resumes it. Useful for watching the event
//! stream and log output without real audio hardware.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crossdeck_common::{AssetRef, ChannelId, FadeCurve};
use crossdeck_core::engine::{
    AssetHandle, ChannelEngine, CrossfadeSnapshot, PositionInfo, TransitionPhase,
};
use crossdeck_core::{Config, Error, PlayerControl};

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(name = "crossdeck")]
#[command(about = "Dual-channel crossfade control core demo")]
#[command(version)]
struct Args {
    /// Simulated track length in seconds
    #[arg(long, default_value = "30.0")]
    track_secs: f64,

    /// Simulated playhead position in seconds
    #[arg(long, default_value = "10.0")]
    position_secs: f64,

    /// Requested crossfade duration in seconds
    #[arg(long, default_value = "2.0")]
    fade_secs: f64,

    /// Fade curve (linear, exponential, logarithmic, s-curve, equal_power)
    #[arg(long, default_value = "equal_power")]
    curve: String,

    /// Optional TOML configuration file
    #[arg(long, env = "CROSSDECK_CONFIG")]
    config: Option<std::path::PathBuf>,
}

/// In-memory engine: sleeps where hardware would render
struct SimulatedEngine {
    state: tokio::sync::Mutex<SimState>,
}

struct SimState {
    active_channel: ChannelId,
    active_gain: f64,
    inactive_gain: f64,
    position: Duration,
    track_duration: Duration,
    progress_task: Option<tokio::task::JoinHandle<()>>,
}

impl SimulatedEngine {
    fn new(position: Duration, track_duration: Duration) -> Self {
        Self {
            state: tokio::sync::Mutex::new(SimState {
                active_channel: ChannelId::A,
                active_gain: 1.0,
                inactive_gain: 0.0,
                position,
                track_duration,
                progress_task: None,
            }),
        }
    }

    async fn abort_progress_task(&self) {
        if let Some(task) = self.state.lock().await.progress_task.take() {
            task.abort();
        }
    }
}

#[async_trait::async_trait]
impl ChannelEngine for SimulatedEngine {
    async fn load_asset(&self, asset: &AssetRef) -> crossdeck_core::Result<AssetHandle> {
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok(AssetHandle {
            asset: asset.clone(),
            duration: Some(self.state.lock().await.track_duration),
        })
    }

    async fn prepare_inactive_channel(&self) -> crossdeck_core::Result<()> {
        Ok(())
    }

    async fn perform_synchronized_transition(
        &self,
        duration: Duration,
        _curve: FadeCurve,
    ) -> crossdeck_core::Result<tokio::sync::mpsc::Receiver<TransitionPhase>> {
        let (tx, rx) = tokio::sync::mpsc::channel(16);
        let steps = 20u32;
        let tick = duration / steps;

        let task = tokio::spawn(async move {
            let _ = tx.send(TransitionPhase::Preparing).await;
            for step in 1..=steps {
                tokio::time::sleep(tick).await;
                let progress = step as f64 / steps as f64;
                if tx.send(TransitionPhase::Fading(progress)).await.is_err() {
                    return;
                }
            }
            let _ = tx.send(TransitionPhase::Switching).await;
            let _ = tx.send(TransitionPhase::Cleanup).await;
            let _ = tx.send(TransitionPhase::Idle).await;
        });

        self.state.lock().await.progress_task = Some(task);
        Ok(rx)
    }

    async fn pause_both_channels(&self) -> crossdeck_core::Result<()> {
        self.abort_progress_task().await;
        Ok(())
    }

    async fn resume_both_channels(&self) -> crossdeck_core::Result<()> {
        Ok(())
    }

    async fn rollback_transition(&self, duration: Duration) -> crossdeck_core::Result<f64> {
        self.abort_progress_task().await;
        tokio::time::sleep(duration).await;
        let mut state = self.state.lock().await;
        state.active_gain = 1.0;
        state.inactive_gain = 0.0;
        Ok(state.active_gain)
    }

    async fn fast_forward_transition(&self, duration: Duration) -> crossdeck_core::Result<()> {
        self.abort_progress_task().await;
        tokio::time::sleep(duration).await;
        let mut state = self.state.lock().await;
        state.active_gain = 0.0;
        state.inactive_gain = 1.0;
        Ok(())
    }

    async fn switch_active_channel(&self) -> crossdeck_core::Result<()> {
        let mut state = self.state.lock().await;
        state.active_channel = state.active_channel.other();
        let active = state.active_gain;
        state.active_gain = state.inactive_gain;
        state.inactive_gain = active;
        state.position = Duration::ZERO;
        Ok(())
    }

    async fn stop_inactive_channel(&self) -> crossdeck_core::Result<()> {
        Ok(())
    }

    async fn reset_inactive_mixer(&self) -> crossdeck_core::Result<()> {
        let mut state = self.state.lock().await;
        state.inactive_gain = 0.0;
        Ok(())
    }

    async fn clear_inactive_asset(&self) -> crossdeck_core::Result<()> {
        Ok(())
    }

    async fn set_channel_gains(&self, active: f64, inactive: f64) -> crossdeck_core::Result<()> {
        let mut state = self.state.lock().await;
        state.active_gain = active;
        state.inactive_gain = inactive;
        Ok(())
    }

    async fn crossfade_snapshot(&self) -> Option<CrossfadeSnapshot> {
        let state = self.state.lock().await;
        Some(CrossfadeSnapshot {
            active_gain: state.active_gain,
            inactive_gain: state.inactive_gain,
            active_position: state.position,
            inactive_position: Duration::ZERO,
            active_channel: state.active_channel,
        })
    }

    async fn current_position(&self) -> Option<PositionInfo> {
        let state = self.state.lock().await;
        Some(PositionInfo {
            position: state.position,
            duration: state.track_duration,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crossdeck=info,crossdeck_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let curve: FadeCurve = args
        .curve
        .parse()
        .map_err(|e: String| Error::Config(e))?;
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    info!(
        track_secs = args.track_secs,
        fade_secs = args.fade_secs,
        %curve,
        "starting crossdeck demo"
    );

    let engine = Arc::new(SimulatedEngine::new(
        Duration::from_secs_f64(args.position_secs),
        Duration::from_secs_f64(args.track_secs),
    ));
    let control = Arc::new(PlayerControl::new(engine, config));

    // Print the event stream as it happens
    let mut events = control.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            info!(?event, "event");
        }
    });

    let fade = Duration::from_secs_f64(args.fade_secs);

    control.load_initial(AssetRef::new("demo/track-a.flac")).await?;

    let outcome = control
        .start_transition(AssetRef::new("demo/track-b.flac"), fade, curve)
        .await?;
    info!(?outcome, "first transition finished");

    // Pause the next transition mid-flight, then resume it
    let runner = Arc::clone(&control);
    let in_flight = tokio::spawn(async move {
        runner
            .start_transition(AssetRef::new("demo/track-c.flac"), fade, curve)
            .await
    });
    tokio::time::sleep(fade.mul_f64(0.4)).await;

    match control.pause().await? {
        Some(snapshot) => info!(progress = snapshot.progress, "transition frozen"),
        None => warn!("nothing to freeze; plain pause performed"),
    }
    let interrupted = in_flight.await??;
    info!(?interrupted, "interrupted transition outcome");

    tokio::time::sleep(Duration::from_millis(200)).await;
    let resumed = control.resume().await?;
    info!(resumed, "resume finished");

    let state = control.coordinator().snapshot().await;
    info!(
        active_channel = %state.active_channel,
        active_asset = ?state.active_asset.as_ref().map(|a| a.location.as_str()),
        mode = %state.mode,
        "final state"
    );

    control.shutdown();
    Ok(())
}
