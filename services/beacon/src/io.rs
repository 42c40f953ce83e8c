//! HTTP client abstraction for testability

use std::time::Duration;

use async_trait::async_trait;

/// HTTP response from a request
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstraction over HTTP client for dependency injection
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait HttpClient: Send + Sync {
    /// Send a GET request to the given URL
    async fn get(&self, url: &str) -> crate::Result<HttpResponse>;

    /// Send a POST request with a JSON body
    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> crate::Result<HttpResponse>;
}

/// Production HTTP client using reqwest.
///
/// Every request is bounded by the timeout the client was built with.
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn with_timeout(timeout: Duration) -> crate::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::BeaconError::Http(format!("Building HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

/// Webhook and bot URLs carry credentials in their path, so only the origin is logged.
fn origin(url: &str) -> String {
    match reqwest::Url::parse(url) {
        Ok(parsed) => format!(
            "{}://{}",
            parsed.scheme(),
            parsed.host_str().unwrap_or_default()
        ),
        Err(_) => "<invalid url>".to_string(),
    }
}

fn map_send_error(method: &str, url: &str, e: reqwest::Error) -> crate::BeaconError {
    if e.is_builder() {
        crate::BeaconError::InvalidRequest(format!("{} {}: {}", method, origin(url), e))
    } else {
        crate::BeaconError::Http(format!("{} {} failed: {}", method, origin(url), e))
    }
}

async fn into_response(
    method: &str,
    url: &str,
    response: reqwest::Response,
) -> crate::Result<HttpResponse> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| crate::BeaconError::Http(format!("Reading response body: {}", e)))?;

    tracing::debug!(
        "{} {} -> {} ({} bytes)",
        method,
        origin(url),
        status,
        body.len()
    );
    Ok(HttpResponse { status, body })
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn get(&self, url: &str) -> crate::Result<HttpResponse> {
        tracing::debug!("GET {}", origin(url));
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_send_error("GET", url, e))?;

        into_response("GET", url, response).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> crate::Result<HttpResponse> {
        tracing::debug!("POST {}", origin(url));
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| map_send_error("POST", url, e))?;

        into_response("POST", url, response).await
    }
}
