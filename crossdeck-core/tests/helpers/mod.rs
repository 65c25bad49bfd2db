//! Shared test fixtures
//!
//! `MockEngine` stands in for a real dual-channel engine: it records every
//! mutating call, simulates transition progress on a timer, and can be told
//! to fail or stall asset loads.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crossdeck_common::{AssetRef, ChannelId};
use crossdeck_core::engine::{
    AssetHandle, ChannelEngine, CrossfadeSnapshot, PositionInfo, TransitionPhase,
};
use crossdeck_core::{Error, Result};

pub struct MockEngine {
    calls: Mutex<Vec<String>>,
    position: Mutex<Option<PositionInfo>>,
    snapshot: Mutex<Option<CrossfadeSnapshot>>,
    fail_load: AtomicBool,
    fail_prepare: AtomicBool,
    load_delay: Mutex<Duration>,
    progress_task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            position: Mutex::new(Some(PositionInfo {
                position: Duration::from_secs(10),
                duration: Duration::from_secs(30),
            })),
            snapshot: Mutex::new(Some(CrossfadeSnapshot {
                active_gain: 1.0,
                inactive_gain: 0.0,
                active_position: Duration::from_secs(10),
                inactive_position: Duration::ZERO,
                active_channel: ChannelId::A,
            })),
            fail_load: AtomicBool::new(false),
            fail_prepare: AtomicBool::new(false),
            load_delay: Mutex::new(Duration::ZERO),
            progress_task: Mutex::new(None),
        }
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_position(&self, position: Duration, duration: Duration) {
        *self.position.lock().unwrap() = Some(PositionInfo { position, duration });
    }

    pub fn clear_position(&self) {
        *self.position.lock().unwrap() = None;
    }

    pub fn set_fail_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_prepare(&self, fail: bool) {
        self.fail_prepare.store(fail, Ordering::SeqCst);
    }

    pub fn set_load_delay(&self, delay: Duration) {
        *self.load_delay.lock().unwrap() = delay;
    }

    /// Current (active, inactive) gains as last set through the engine
    pub fn gains(&self) -> (f64, f64) {
        let snapshot = self.snapshot.lock().unwrap();
        let s = snapshot.as_ref().expect("snapshot configured");
        (s.active_gain, s.inactive_gain)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn called(&self, name: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|c| c == name)
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == name).count()
    }

    fn record(&self, name: &str) {
        self.calls.lock().unwrap().push(name.to_string());
    }

    fn abort_progress(&self) {
        if let Some(task) = self.progress_task.lock().unwrap().take() {
            task.abort();
        }
    }
}

#[async_trait::async_trait]
impl ChannelEngine for MockEngine {
    async fn load_asset(&self, asset: &AssetRef) -> Result<AssetHandle> {
        self.record("load_asset");
        let delay = *self.load_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(Error::Engine("decode failed".into()));
        }
        let duration = self.position.lock().unwrap().as_ref().map(|p| p.duration);
        Ok(AssetHandle {
            asset: asset.clone(),
            duration,
        })
    }

    async fn prepare_inactive_channel(&self) -> Result<()> {
        self.record("prepare_inactive_channel");
        if self.fail_prepare.load(Ordering::SeqCst) {
            return Err(Error::Engine("channel alignment failed".into()));
        }
        Ok(())
    }

    async fn perform_synchronized_transition(
        &self,
        duration: Duration,
        _curve: crossdeck_common::FadeCurve,
    ) -> Result<tokio::sync::mpsc::Receiver<TransitionPhase>> {
        self.record("perform_synchronized_transition");
        let (tx, rx) = tokio::sync::mpsc::channel(32);
        let steps = 10u32;
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
            let _ = tx.send(TransitionPhase::Idle).await;
        });

        let previous = self.progress_task.lock().unwrap().replace(task);
        if let Some(old) = previous {
            old.abort();
        }
        Ok(rx)
    }

    async fn pause_both_channels(&self) -> Result<()> {
        self.record("pause_both_channels");
        self.abort_progress();
        Ok(())
    }

    async fn resume_both_channels(&self) -> Result<()> {
        self.record("resume_both_channels");
        Ok(())
    }

    async fn rollback_transition(&self, _duration: Duration) -> Result<f64> {
        self.record("rollback_transition");
        self.abort_progress();
        Ok(1.0)
    }

    async fn fast_forward_transition(&self, _duration: Duration) -> Result<()> {
        self.record("fast_forward_transition");
        self.abort_progress();
        Ok(())
    }

    async fn switch_active_channel(&self) -> Result<()> {
        self.record("switch_active_channel");
        let mut snapshot = self.snapshot.lock().unwrap();
        if let Some(s) = snapshot.as_mut() {
            s.active_channel = s.active_channel.other();
            std::mem::swap(&mut s.active_gain, &mut s.inactive_gain);
        }
        Ok(())
    }

    async fn stop_inactive_channel(&self) -> Result<()> {
        self.record("stop_inactive_channel");
        self.abort_progress();
        Ok(())
    }

    async fn reset_inactive_mixer(&self) -> Result<()> {
        self.record("reset_inactive_mixer");
        Ok(())
    }

    async fn clear_inactive_asset(&self) -> Result<()> {
        self.record("clear_inactive_asset");
        Ok(())
    }

    async fn set_channel_gains(&self, active: f64, inactive: f64) -> Result<()> {
        self.record("set_channel_gains");
        let mut snapshot = self.snapshot.lock().unwrap();
        if let Some(s) = snapshot.as_mut() {
            s.active_gain = active;
            s.inactive_gain = inactive;
        }
        Ok(())
    }

    async fn crossfade_snapshot(&self) -> Option<CrossfadeSnapshot> {
        self.snapshot.lock().unwrap().clone()
    }

    async fn current_position(&self) -> Option<PositionInfo> {
        self.position.lock().unwrap().clone()
    }
}
