//! Health probes for the deployed service

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::MonitorConfig;
use crate::io::HttpClient;
use crate::status::HealthState;

/// Trait for deriving an up/down verdict for the monitored deployment
#[async_trait]
pub trait Probe: Send + Sync + std::fmt::Debug {
    /// Run one health poll.
    ///
    /// Failed checks yield `Ok(HealthState::Down)`. `Err` means the poll itself could
    /// not be carried out, which the monitor treats as down with a shorter backoff.
    async fn poll(&self) -> crate::Result<HealthState>;
}

/// Probes `/health` and then the primary API endpoint over HTTP
pub struct ApiProbe {
    health_url: String,
    api_url: String,
    api_payload: serde_json::Value,
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for ApiProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiProbe")
            .field("health_url", &self.health_url)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl ApiProbe {
    pub fn new(base_url: &str, config: &MonitorConfig, http: Arc<dyn HttpClient>) -> Self {
        let base_url = base_url.trim_end_matches('/');
        let health_url = format!("{}{}", base_url, config.health_path);
        let api_url = format!("{}{}", base_url, config.api_path);

        tracing::debug!("Created ApiProbe for {} and {}", health_url, api_url);

        Self {
            health_url,
            api_url,
            api_payload: config.api_payload.clone(),
            http,
        }
    }

    /// Interpret one check. Transport failures count as a failed check.
    fn check_passed(
        &self,
        name: &str,
        result: crate::Result<crate::io::HttpResponse>,
    ) -> crate::Result<bool> {
        match result {
            Ok(response) if response.status == 200 => Ok(true),
            Ok(response) => {
                tracing::debug!("{} check returned status {}", name, response.status);
                Ok(false)
            }
            Err(crate::BeaconError::Http(e)) => {
                tracing::debug!("{} check failed: {}", name, e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Probe for ApiProbe {
    async fn poll(&self) -> crate::Result<HealthState> {
        let health = self.http.get(&self.health_url).await;
        if !self.check_passed("Health", health)? {
            return Ok(HealthState::Down);
        }

        let api = self.http.post_json(&self.api_url, &self.api_payload).await;
        if !self.check_passed("API", api)? {
            return Ok(HealthState::Down);
        }

        Ok(HealthState::Up)
    }
}
