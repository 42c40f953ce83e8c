//! Beacon - API usage notifications and deployment health monitoring
//!
//! Buffers access events into periodic summaries, polls the deployed API for
//! health and announces status changes to Discord, Slack and Telegram.

pub mod buffer;
pub mod channel;
pub mod config;
pub mod discord;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod io;
pub mod monitor;
pub mod probe;
pub mod server;
pub mod slack;
pub mod status;
pub mod telegram;

pub use buffer::NotificationService;
pub use config::{load_config, Config};
pub use error::{BeaconError, Result};
pub use event::AccessEvent;
pub use status::{HealthState, HealthStatus};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::MonitorConfig;
use crate::dispatcher::Dispatcher;
use crate::io::ReqwestHttpClient;
use crate::monitor::HealthMonitor;
use crate::probe::ApiProbe;
use crate::server::AppState;
use crate::status::StatusWriter;

/// Run the beacon service with the given configuration until ctrl-c
pub async fn run(config: Config) -> Result<()> {
    let webhook_http: Arc<dyn io::HttpClient> = Arc::new(ReqwestHttpClient::with_timeout(
        config.notifications.webhook_timeout(),
    )?);
    let dispatcher = Arc::new(Dispatcher::from_config(
        config.enabled_channels(),
        webhook_http,
    ));
    if dispatcher.is_empty() {
        tracing::warn!("No notification channels configured, messages will be dropped");
    } else {
        tracing::info!("Notification channels: {:?}", dispatcher.channel_kinds());
    }

    let notifications =
        NotificationService::new(config.notifications.interval(), Arc::clone(&dispatcher));
    let (status, status_writer) = status::new_status_store();
    let cancel = CancellationToken::new();

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    // Bind first so a monitor pointed at this listener never polls before it accepts
    let listener = if config.server.enabled {
        Some(bind(config.server.port).await?)
    } else {
        None
    };

    let monitor = build_monitor(
        &config.monitor,
        Arc::clone(&dispatcher),
        status_writer,
        cancel.clone(),
    )?;
    let monitor_handle = monitor.map(|monitor| tokio::spawn(monitor.run()));

    let served = match listener {
        Some(listener) => {
            let state = AppState {
                status,
                notifications: notifications.clone(),
                check_interval_seconds: config.monitor.check_interval().as_secs(),
            };
            serve(listener, state, cancel.clone()).await
        }
        None => {
            cancel.cancelled().await;
            Ok(())
        }
    };

    // A failed server still takes the monitor down with it
    cancel.cancel();
    if let Some(handle) = monitor_handle {
        if let Err(e) = handle.await {
            tracing::warn!("Health monitor task ended abnormally: {}", e);
        }
    }

    if let Some(report) = notifications.drain().await {
        tracing::info!(
            "Sent final usage summary to {} channel(s)",
            report.succeeded.len()
        );
    }
    tracing::info!("Beacon stopped");

    served
}

/// Build the health monitor, or `None` when it is disabled or has no deployment to probe
pub fn build_monitor(
    config: &MonitorConfig,
    dispatcher: Arc<Dispatcher>,
    status: StatusWriter,
    cancel: CancellationToken,
) -> Result<Option<HealthMonitor>> {
    if !config.enabled {
        tracing::info!("Health monitor disabled");
        return Ok(None);
    }
    let Some(base_url) = config.target_url() else {
        tracing::info!(
            "No deployment base URL configured ({}), health monitor disabled",
            crate::config::ENV_MONITOR_BASE_URL
        );
        return Ok(None);
    };

    let probe_http: Arc<dyn io::HttpClient> =
        Arc::new(ReqwestHttpClient::with_timeout(config.request_timeout())?);
    tracing::info!("Monitoring API at {}", base_url);

    let probe = Arc::new(ApiProbe::new(&base_url, config, probe_http));
    Ok(Some(HealthMonitor::new(
        probe, dispatcher, status, config, cancel,
    )))
}

async fn bind(port: u16) -> Result<tokio::net::TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| BeaconError::Server(format!("Failed to bind port {}: {}", port, e)))?;
    tracing::info!("Listening on http://{}", addr);
    Ok(listener)
}

async fn serve(
    listener: tokio::net::TcpListener,
    state: AppState,
    cancel: CancellationToken,
) -> Result<()> {
    let router = server::build_router(state);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        cancel.cancelled().await;
    })
    .await
    .map_err(|e| BeaconError::Server(e.to_string()))?;

    tracing::debug!("HTTP server stopped");
    Ok(())
}
