//! Coalescing buffer for access events
//!
//! Events are appended without touching the network. At most once per interval a
//! single background flush drains the buffer and sends one summary to every channel.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::channel::Message;
use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::event::{AccessEvent, NotificationBatch};

struct BufferState {
    events: Vec<AccessEvent>,
    last_sent: Instant,
}

struct Inner {
    state: Mutex<BufferState>,
    flushing: AtomicBool,
    flush_task: Mutex<Option<JoinHandle<()>>>,
    interval: Duration,
    dispatcher: Arc<Dispatcher>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Buffer contents stay valid even if a holder panicked mid-push
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    /// Claim the single in-flight flush slot
    fn try_claim(&self) -> bool {
        self.flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn release(&self) {
        self.flushing.store(false, Ordering::Release);
    }

    async fn flush(&self) -> Option<DispatchReport> {
        let events = std::mem::take(&mut lock(&self.state).events);
        if events.is_empty() {
            tracing::debug!("Nothing buffered, skipping flush");
            return None;
        }

        let batch = NotificationBatch::new(events, Utc::now());
        tracing::info!("Flushing {} buffered access events", batch.count);
        let report = self
            .dispatcher
            .dispatch(&Message::summary(batch))
            .await;
        Some(report)
    }
}

/// Releases the in-flight flag when the flush task ends, including by panic
struct FlushGuard(Arc<Inner>);

impl Drop for FlushGuard {
    fn drop(&mut self) {
        self.0.release();
    }
}

/// Shared notification buffer, constructed once and passed to request handlers
#[derive(Clone)]
pub struct NotificationService {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("interval", &self.inner.interval)
            .field("pending", &self.pending())
            .finish()
    }
}

impl NotificationService {
    /// The first interval window starts now.
    pub fn new(interval: Duration, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(BufferState {
                    events: Vec::new(),
                    last_sent: Instant::now(),
                }),
                flushing: AtomicBool::new(false),
                flush_task: Mutex::new(None),
                interval,
                dispatcher,
            }),
        }
    }

    /// Buffer an event, starting a background flush when the interval has elapsed
    /// and no flush is running. Never waits on the network.
    pub fn record(&self, event: AccessEvent) {
        let start_flush = {
            let mut state = lock(&self.inner.state);
            state.events.push(event);
            let due = state.last_sent.elapsed() >= self.inner.interval;
            if due && self.inner.try_claim() {
                state.last_sent = Instant::now();
                true
            } else {
                false
            }
        };

        if start_flush {
            self.spawn_flush();
        }
    }

    fn spawn_flush(&self) {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!("No async runtime available, keeping events buffered");
                self.inner.release();
                return;
            }
        };

        let guard = FlushGuard(Arc::clone(&self.inner));
        let handle = runtime.spawn(async move {
            let report = guard.0.flush().await;
            if let Some(report) = report {
                tracing::debug!("Flush reached {} channel(s)", report.succeeded.len());
            }
            drop(guard);
        });
        *lock(&self.inner.flush_task) = Some(handle);
    }

    /// Number of events waiting for the next flush
    pub fn pending(&self) -> usize {
        lock(&self.inner.state).events.len()
    }

    pub fn is_flushing(&self) -> bool {
        self.inner.flushing.load(Ordering::Acquire)
    }

    /// Wait for the most recently started flush, if any, to finish
    pub async fn wait_for_flush(&self) {
        let handle = lock(&self.inner.flush_task).take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!("Flush task ended abnormally: {}", e);
            }
        }
    }

    /// Send whatever is buffered now, ignoring the interval. Used on shutdown.
    pub async fn drain(&self) -> Option<DispatchReport> {
        self.wait_for_flush().await;
        if !self.inner.try_claim() {
            tracing::debug!("A flush is already running, not draining");
            return None;
        }
        let report = self.inner.flush().await;
        lock(&self.inner.state).last_sent = Instant::now();
        self.inner.release();
        report
    }
}
