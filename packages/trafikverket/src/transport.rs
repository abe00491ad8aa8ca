//! The seam between query logic and the network.
//!
//! [`RoadDataTransport`] sends one [`QueryRequest`] and hands back the raw
//! JSON body. [`HttpTransport`] is the production implementation; tests
//! substitute an in-memory one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};

use crate::request::QueryRequest;
use crate::{ClientConfig, UpstreamError, retry};

/// Sends queries to the road-data service.
#[async_trait]
pub trait RoadDataTransport: Send + Sync {
    /// Executes one query and returns the decoded JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError`] if the request fails, the status is not a
    /// success, or the body is not JSON.
    async fn query(&self, request: &QueryRequest) -> Result<serde_json::Value, UpstreamError>;
}

#[async_trait]
impl<T: RoadDataTransport + ?Sized> RoadDataTransport for std::sync::Arc<T> {
    async fn query(&self, request: &QueryRequest) -> Result<serde_json::Value, UpstreamError> {
        (**self).query(request).await
    }
}

/// `reqwest`-backed transport posting XML to the Trafikverket endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    max_retries: u32,
    timeout: Duration,
}

impl HttpTransport {
    /// Builds a transport with its own connection pool and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`UpstreamError::Config`] if the API key is empty or the
    /// HTTP client cannot be constructed.
    pub fn new(config: &ClientConfig) -> Result<Self, UpstreamError> {
        if config.api_key.trim().is_empty() {
            return Err(UpstreamError::Config {
                message: "Trafikverket API key is empty".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("vagdata/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::Config {
                message: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.max_retries,
            timeout: config.timeout,
        })
    }

    /// The endpoint this transport posts to.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RoadDataTransport for HttpTransport {
    async fn query(&self, request: &QueryRequest) -> Result<serde_json::Value, UpstreamError> {
        log::debug!("POST {}: {}", self.endpoint, request.to_redacted_xml());
        let body = request.to_xml(&self.api_key);

        retry::send_json(
            || {
                self.client
                    .post(&self.endpoint)
                    .header(CONTENT_TYPE, "text/xml")
                    .header(ACCEPT, "application/json")
                    .body(body.clone())
            },
            self.max_retries,
            self.timeout,
        )
        .await
    }
}
