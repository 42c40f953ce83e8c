//! Error types for the beacon service

/// Errors that can occur in the beacon service
#[derive(Debug, thiserror::Error)]
pub enum BeaconError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Server error: {0}")]
    Server(String),
}

/// Result type alias for beacon operations
pub type Result<T> = std::result::Result<T, BeaconError>;
