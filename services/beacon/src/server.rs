//! HTTP surface: health, upstream status and event ingestion

use std::net::SocketAddr;

use axum::extract::{ConnectInfo, State};
use axum::http::{header, Extensions, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use crate::buffer::NotificationService;
use crate::event::{client_ip, AccessEvent};
use crate::status::StatusStore;

/// Server application state
#[derive(Clone)]
pub struct AppState {
    pub status: StatusStore,
    pub notifications: NotificationService,
    pub check_interval_seconds: u64,
}

/// Build the axum router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api-status", get(api_status_handler))
        .route("/api/events", post(record_event_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn api_status_handler(State(app): State<AppState>) -> impl IntoResponse {
    let status = app.status.get().await;

    Json(serde_json::json!({
        "status": status.value,
        "last_checked": status.last_checked.map(|t| t.to_rfc3339()),
        "last_changed": status.last_changed.map(|t| t.to_rfc3339()),
        "consecutive_failures": status.consecutive_failures,
        "uptime": {
            "is_monitoring": status.monitor_running,
            "check_interval_seconds": app.check_interval_seconds,
        },
    }))
}

/// Body of an event report from the question-answering front end
#[derive(Debug, Deserialize)]
pub struct EventRequest {
    pub question: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default = "default_notify")]
    pub notify: bool,
}

fn default_notify() -> bool {
    true
}

async fn record_event_handler(
    State(app): State<AppState>,
    headers: HeaderMap,
    extensions: Extensions,
    Json(request): Json<EventRequest>,
) -> impl IntoResponse {
    if !request.notify {
        return (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "recorded": false })),
        );
    }

    let forwarded_for = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok());
    let peer = extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string());
    let user_agent = request.user_agent.unwrap_or_else(|| {
        headers
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string()
    });

    let source_ip = client_ip(forwarded_for, peer.as_deref());
    tracing::debug!("Recording access event from {}", source_ip);
    app.notifications
        .record(AccessEvent::new(source_ip, &user_agent, &request.question));

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "recorded": true })),
    )
}
