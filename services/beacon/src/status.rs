//! Shared upstream health status

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Derived health of the monitored deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Unknown,
    Up,
    Down,
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Unknown => write!(f, "unknown"),
            HealthState::Up => write!(f, "up"),
            HealthState::Down => write!(f, "down"),
        }
    }
}

/// Snapshot of the latest poll result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub value: HealthState,
    pub last_checked: Option<DateTime<Utc>>,
    pub last_changed: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub monitor_running: bool,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            value: HealthState::Unknown,
            last_checked: None,
            last_changed: None,
            consecutive_failures: 0,
            monitor_running: false,
        }
    }
}

/// Read-only handle to the health status. Cheap to clone.
#[derive(Debug, Clone)]
pub struct StatusStore {
    inner: Arc<RwLock<HealthStatus>>,
}

/// The single writer of the health status, owned by the health monitor.
#[derive(Debug)]
pub struct StatusWriter {
    inner: Arc<RwLock<HealthStatus>>,
}

/// Create a store in the `unknown` state along with its only writer.
pub fn new_status_store() -> (StatusStore, StatusWriter) {
    let inner = Arc::new(RwLock::new(HealthStatus::default()));
    (
        StatusStore {
            inner: Arc::clone(&inner),
        },
        StatusWriter { inner },
    )
}

impl StatusStore {
    pub async fn get(&self) -> HealthStatus {
        self.inner.read().await.clone()
    }
}

impl StatusWriter {
    /// Store a poll result, returning the state it replaced.
    ///
    /// `Unknown` is never written back: it only exists before the first poll.
    pub async fn set(&self, value: HealthState, checked_at: DateTime<Utc>) -> HealthState {
        let mut status = self.inner.write().await;
        let previous = status.value;
        if value == HealthState::Unknown {
            tracing::debug!("Ignoring attempt to reset health status to unknown");
            return previous;
        }

        status.value = value;
        status.last_checked = Some(checked_at);
        if previous != value {
            status.last_changed = Some(checked_at);
        }
        if value == HealthState::Down {
            status.consecutive_failures += 1;
        } else {
            status.consecutive_failures = 0;
        }
        previous
    }

    pub async fn set_running(&self, running: bool) {
        self.inner.write().await.monitor_running = running;
    }

    pub async fn consecutive_failures(&self) -> u32 {
        self.inner.read().await.consecutive_failures
    }

    pub async fn current(&self) -> HealthState {
        self.inner.read().await.value
    }
}
