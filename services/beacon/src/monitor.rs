//! Health monitor: polls the deployment, records the verdict, alerts on change

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::channel::{AlertField, AlertKind, Message, StatusAlert};
use crate::config::MonitorConfig;
use crate::dispatcher::{DispatchReport, Dispatcher};
use crate::probe::Probe;
use crate::status::{HealthState, StatusWriter};

/// Consecutive down polls after which a warning is logged
const FAILURE_WARN_THRESHOLD: u32 = 5;

fn timestamp_field(at: DateTime<Utc>) -> AlertField {
    AlertField::new("Checked at", at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

/// Alert sent when the derived status differs from the previous poll
pub fn status_changed_message(
    previous: HealthState,
    current: HealthState,
    at: DateTime<Utc>,
) -> Message {
    let text = match current {
        HealthState::Up => "🟢 **API is UP**".to_string(),
        _ => "🔴 **API is DOWN**".to_string(),
    };
    Message::with_alert(
        format!("{} (was {})", text, previous),
        StatusAlert {
            title: "API status changed".to_string(),
            kind: AlertKind::StatusChanged { previous, current },
            fields: vec![
                AlertField::new("Previous", previous.to_string()),
                AlertField::new("Current", current.to_string()),
                timestamp_field(at),
            ],
            timestamp: at,
        },
    )
}

/// Low-urgency reassurance sent periodically while the API stays up
pub fn all_clear_message(at: DateTime<Utc>) -> Message {
    Message::with_alert(
        "💚 All clear: API is up and responding",
        StatusAlert {
            title: "Scheduled status report".to_string(),
            kind: AlertKind::AllClear,
            fields: vec![AlertField::new("Status", "up"), timestamp_field(at)],
            timestamp: at,
        },
    )
}

/// Periodically probes the deployment and owns the status writer
pub struct HealthMonitor {
    probe: Arc<dyn Probe>,
    dispatcher: Arc<Dispatcher>,
    status: StatusWriter,
    check_interval: Duration,
    error_backoff: Duration,
    heartbeat_interval: Duration,
    cancel: CancellationToken,
}

impl HealthMonitor {
    pub fn new(
        probe: Arc<dyn Probe>,
        dispatcher: Arc<Dispatcher>,
        status: StatusWriter,
        config: &MonitorConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            probe,
            dispatcher,
            status,
            check_interval: config.check_interval(),
            error_backoff: config.error_backoff(),
            heartbeat_interval: config.heartbeat_interval(),
            cancel,
        }
    }

    /// Run one poll, store the result and alert on a status change.
    ///
    /// Returns how long to wait before the next poll.
    pub async fn poll_once(&self) -> Duration {
        let (current, wait) = match self.probe.poll().await {
            Ok(state) => (state, self.check_interval),
            Err(e) => {
                tracing::error!("Health poll could not be performed: {}", e);
                (HealthState::Down, self.error_backoff)
            }
        };

        let now = Utc::now();
        let previous = self.status.set(current, now).await;

        let failures = self.status.consecutive_failures().await;
        if failures == FAILURE_WARN_THRESHOLD {
            tracing::warn!("API has been down for {} consecutive polls", failures);
        }

        tracing::debug!("Poll: {} -> {}", previous, current);

        if previous != current {
            tracing::info!("API status changed: {} -> {}", previous, current);
            self.dispatcher
                .dispatch(&status_changed_message(previous, current, now))
                .await;
        }
        wait
    }

    /// Send the all-clear report if the API is currently up
    pub async fn send_heartbeat(&self) -> Option<DispatchReport> {
        let current = self.status.current().await;
        if current != HealthState::Up {
            tracing::debug!("Skipping all-clear report, status is {}", current);
            return None;
        }
        tracing::info!("Sending scheduled all-clear report");
        Some(self.dispatcher.dispatch(&all_clear_message(Utc::now())).await)
    }

    /// Poll until the cancellation token is triggered. An in-flight poll is allowed
    /// to finish; cancellation is observed while waiting.
    pub async fn run(self) {
        self.status.set_running(true).await;
        tracing::info!(
            "Health monitor started (interval {:?}, heartbeat {:?})",
            self.check_interval,
            self.heartbeat_interval
        );

        let heartbeat_enabled = !self.heartbeat_interval.is_zero();
        let period = self.heartbeat_interval.max(Duration::from_secs(1));
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut next_poll = Instant::now();
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Health monitor cancelled");
                    break;
                }
                _ = tokio::time::sleep_until(next_poll) => {
                    let wait = self.poll_once().await;
                    next_poll = Instant::now() + wait;
                }
                _ = heartbeat.tick(), if heartbeat_enabled => {
                    self.send_heartbeat().await;
                }
            }
        }

        self.status.set_running(false).await;
        tracing::info!("Health monitor stopped");
    }
}
