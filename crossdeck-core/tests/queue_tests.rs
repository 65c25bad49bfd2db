//! Operation queue behavior through the playback control facade

mod helpers;

use std::sync::{Arc, Mutex};

use crossdeck_core::playback::Priority;
use crossdeck_core::{Config, Error, PlayerControl};
use helpers::MockEngine;

fn control_with(config: Config) -> Arc<PlayerControl> {
    Arc::new(PlayerControl::new(Arc::new(MockEngine::new()), config))
}

/// Park the worker on a command that waits for the returned sender
fn spawn_blocker(
    control: &Arc<PlayerControl>,
) -> (
    tokio::sync::oneshot::Sender<()>,
    tokio::task::JoinHandle<crossdeck_core::Result<()>>,
) {
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let control = Arc::clone(control);
    let join = tokio::spawn(async move {
        control
            .enqueue(Priority::Normal, "blocker", move |_flag| async move {
                let _ = release_rx.await;
                Ok(())
            })
            .await
    });
    (release_tx, join)
}

async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_commands_run_in_submission_order() {
    let control = control_with(Config::default());
    let (release, blocker) = spawn_blocker(&control);
    settle().await;

    let log: Arc<Mutex<Vec<u32>>> = Arc::new(Mutex::new(Vec::new()));
    let mut joins = Vec::new();
    for i in 0..5u32 {
        let control = Arc::clone(&control);
        let log = Arc::clone(&log);
        joins.push(tokio::spawn(async move {
            control
                .enqueue(Priority::Normal, &format!("op-{i}"), move |_flag| async move {
                    log.lock().unwrap().push(i);
                    Ok(())
                })
                .await
        }));
        // Each submission must be admitted before the next one
        settle().await;
    }

    release.send(()).unwrap();
    blocker.await.unwrap().unwrap();
    for join in joins {
        join.await.unwrap().unwrap();
    }

    assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_queue_full_rejects_new_commands() {
    let mut config = Config::default();
    config.queue.max_depth = 2;
    let control = control_with(config);

    let (release, blocker) = spawn_blocker(&control);
    settle().await;

    let queued = {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            control
                .enqueue(Priority::Normal, "queued", |_flag| async { Ok(42u32) })
                .await
        })
    };
    settle().await;
    assert_eq!(control.depth(), 2);

    let rejected = control
        .enqueue(Priority::Normal, "overflow", |_flag| async { Ok(()) })
        .await;
    assert!(matches!(rejected, Err(Error::QueueFull(2))));

    release.send(()).unwrap();
    blocker.await.unwrap().unwrap();
    assert_eq!(queued.await.unwrap().unwrap(), 42);
}

#[tokio::test]
async fn test_critical_preempts_queued_low_priority() {
    let control = control_with(Config::default());
    let mut events = control.subscribe();
    let (release, blocker) = spawn_blocker(&control);
    settle().await;

    let low_ran = Arc::new(Mutex::new(false));
    let low = {
        let control = Arc::clone(&control);
        let low_ran = Arc::clone(&low_ran);
        tokio::spawn(async move {
            control
                .enqueue(Priority::Low, "low-op", move |_flag| async move {
                    *low_ran.lock().unwrap() = true;
                    Ok(())
                })
                .await
        })
    };
    settle().await;

    let critical = {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            control
                .enqueue(Priority::Critical, "critical-op", |_flag| async { Ok(()) })
                .await
        })
    };
    settle().await;

    let low_result = low.await.unwrap();
    assert!(matches!(
        low_result,
        Err(Error::OperationPreempted { ref tag }) if tag == "low-op"
    ));
    assert!(!*low_ran.lock().unwrap());

    release.send(()).unwrap();
    blocker.await.unwrap().unwrap();
    critical.await.unwrap().unwrap();

    let mut preempted_tags = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let crossdeck_common::PlayerEvent::OperationPreempted { tag, .. } = event {
            preempted_tags.push(tag);
        }
    }
    assert_eq!(preempted_tags, vec!["low-op".to_string()]);
}

#[tokio::test]
async fn test_equal_priority_is_not_preempted() {
    let control = control_with(Config::default());
    let (release, blocker) = spawn_blocker(&control);
    settle().await;

    let first = {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            control
                .enqueue(Priority::High, "first-high", |_flag| async { Ok(1u32) })
                .await
        })
    };
    settle().await;

    let second = {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            control
                .enqueue(Priority::High, "second-high", |_flag| async { Ok(2u32) })
                .await
        })
    };
    settle().await;

    release.send(()).unwrap();
    blocker.await.unwrap().unwrap();
    assert_eq!(first.await.unwrap().unwrap(), 1);
    assert_eq!(second.await.unwrap().unwrap(), 2);
}
