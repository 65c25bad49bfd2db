//! Priority-preemptive operation queue
//!
//! Serializes arbitrary asynchronous commands into one logical execution
//! stream: admitted operations run strictly one at a time in FIFO order among
//! the survivors of preemption. Priority changes who is *waiting*, never who
//! is currently executing; a submission at `High` or above evicts every
//! strictly-lower-priority operation that has not yet started, then the
//! admission bound is checked.
//!
//! Implemented as an explicit pending list with an admission gate and a
//! single worker task, rather than a chain of stored tail futures, so
//! preemption is a plain list removal.

use crate::config::QueueConfig;
use crate::error::{Error, Result};
use crossdeck_common::{EventBus, PlayerEvent};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex, Notify};
use tracing::{debug, warn};

/// Operation priority, lowest to highest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

/// Cooperative cancellation flag handed to every operation body
///
/// The queue sets the flag when an operation is preempted; a body that starts
/// anyway (narrow race) is expected to poll it at its own checkpoints. The
/// queue never forcibly interrupts running work.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// True once the operation has been preempted
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

type BoxedJob = Pin<Box<dyn Future<Output = ()> + Send>>;

struct PendingOp {
    priority: Priority,
    tag: String,
    flag: CancelFlag,
    job: BoxedJob,
}

struct Inner {
    pending: Mutex<VecDeque<PendingOp>>,

    /// Admitted but not yet finished (running + queued)
    in_flight: AtomicUsize,

    notify: Notify,
    closed: AtomicBool,
    max_depth: usize,
    events: Option<EventBus>,
}

/// Serializing operation queue with priority preemption and a bounded backlog
pub struct OperationQueue {
    inner: Arc<Inner>,
}

impl OperationQueue {
    /// Create a queue and spawn its worker task
    pub fn new(config: QueueConfig) -> Self {
        Self::build(config, None)
    }

    /// Create a queue that announces preemptions on an event bus
    pub fn with_events(config: QueueConfig, events: EventBus) -> Self {
        Self::build(config, Some(events))
    }

    fn build(config: QueueConfig, events: Option<EventBus>) -> Self {
        let inner = Arc::new(Inner {
            pending: Mutex::new(VecDeque::new()),
            in_flight: AtomicUsize::new(0),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            max_depth: config.max_depth,
            events,
        });

        let worker = Arc::clone(&inner);
        tokio::spawn(async move {
            Self::worker_loop(worker).await;
        });

        Self { inner }
    }

    /// Submit an operation and await its result
    ///
    /// Admission can fail with [`Error::QueueFull`]; a preempted submission
    /// resolves with [`Error::OperationPreempted`]. Errors from the body
    /// itself propagate unchanged to the caller.
    pub async fn enqueue<T, F, Fut>(&self, priority: Priority, tag: &str, body: F) -> Result<T>
    where
        F: FnOnce(CancelFlag) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let flag = CancelFlag::new();

        {
            let mut pending = self.inner.pending.lock().await;

            // The worker stops once the backlog drains; admitting here
            // would leave the submitter waiting forever
            if self.inner.closed.load(Ordering::SeqCst) {
                warn!(tag, "operation rejected: queue shut down");
                return Err(Error::QueueClosed);
            }

            // Preemption runs before the admission check: evict every
            // not-yet-started operation with a strictly lower priority.
            if priority >= Priority::High {
                let mut evicted = Vec::new();
                pending.retain(|op| {
                    if op.priority < priority {
                        op.flag.cancel();
                        debug!(tag = %op.tag, "pending operation preempted");
                        evicted.push(op.tag.clone());
                        false
                    } else {
                        true
                    }
                });
                if !evicted.is_empty() {
                    self.inner.in_flight.fetch_sub(evicted.len(), Ordering::SeqCst);
                    if let Some(events) = &self.inner.events {
                        for tag in evicted {
                            events.emit_lossy(PlayerEvent::OperationPreempted {
                                tag,
                                timestamp: chrono::Utc::now(),
                            });
                        }
                    }
                }
            }

            if self.inner.in_flight.load(Ordering::SeqCst) >= self.inner.max_depth {
                warn!(tag, max_depth = self.inner.max_depth, "operation rejected: queue full");
                return Err(Error::QueueFull(self.inner.max_depth));
            }

            let body_flag = flag.clone();
            let job: BoxedJob = Box::pin(async move {
                let result = body(body_flag).await;
                // The submitter may have stopped waiting; that is fine
                let _ = tx.send(result);
            });

            pending.push_back(PendingOp {
                priority,
                tag: tag.to_string(),
                flag,
                job,
            });
            self.inner.in_flight.fetch_add(1, Ordering::SeqCst);
            debug!(tag, ?priority, depth = pending.len(), "operation admitted");
        }

        self.inner.notify.notify_one();

        match rx.await {
            Ok(result) => result,
            // Sender dropped without a result: the job was evicted
            Err(_) => Err(Error::OperationPreempted {
                tag: tag.to_string(),
            }),
        }
    }

    /// Admitted-but-unfinished operation count
    pub fn depth(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Stop the worker after the backlog drains; further submissions are
    /// rejected with [`Error::QueueClosed`]
    pub fn shutdown(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
        self.inner.notify.notify_one();
    }

    async fn worker_loop(inner: Arc<Inner>) {
        loop {
            let op = inner.pending.lock().await.pop_front();

            match op {
                Some(op) => {
                    // Narrow race: cancelled after admission, popped anyway
                    if op.flag.is_cancelled() {
                        debug!(tag = %op.tag, "skipping cancelled operation");
                        inner.in_flight.fetch_sub(1, Ordering::SeqCst);
                        continue;
                    }

                    debug!(tag = %op.tag, "operation started");
                    op.job.await;
                    inner.in_flight.fetch_sub(1, Ordering::SeqCst);
                    debug!(tag = %op.tag, "operation finished");
                }
                None => {
                    if inner.closed.load(Ordering::SeqCst) {
                        debug!("operation queue worker stopping");
                        break;
                    }
                    inner.notify.notified().await;
                }
            }
        }
    }
}

impl Drop for OperationQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}
