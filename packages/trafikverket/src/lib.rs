#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client for Trafikverket's open road-data API (`vägdata` namespace).
//!
//! Two operations sit on top of a single [`transport::RoadDataTransport`]:
//!
//! 1. [`resolver::resolve_nearest`] snaps a SWEREF 99 TM point onto the
//!    road network and yields the element identifier.
//! 2. [`fetcher::fetch_attribute`] queries one attribute kind for that
//!    element, driven by the embedded [`registry`] of object types and
//!    requested fields.
//!
//! Both absorb every upstream failure into their return value. Callers
//! never see an `Err` from them, only `success: false` results with a
//! message.

pub mod fetcher;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod response;
pub mod retry;
pub mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use std::time::Duration;

use thiserror::Error;

/// Default Trafikverket API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.trafikinfo.trafikverket.se/v2/data.json";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Default number of retries for transient failures.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Errors from a single upstream query.
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Network failure, timeout, or unreadable body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The call, retries included, did not finish in time.
    #[error("Request timed out after {timeout:?}")]
    Timeout {
        /// The deadline that ran out.
        timeout: Duration,
    },

    /// The service answered with a non-success status.
    #[error("Upstream returned status {status}: {body_preview}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// First part of the response body.
        body_preview: String,
    },

    /// The body is not the expected JSON envelope.
    #[error("Malformed response: {message}")]
    Malformed {
        /// What was missing or unexpected.
        message: String,
    },

    /// The envelope carried an `ERROR` block.
    #[error("Upstream error from {origin}: {message}")]
    Upstream {
        /// The `SOURCE` reported by the service.
        origin: String,
        /// The `MESSAGE` reported by the service.
        message: String,
    },

    /// The client could not be constructed.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the problem.
        message: String,
    },
}

/// Connection settings for [`transport::HttpTransport`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API endpoint URL.
    pub endpoint: String,
    /// Authentication key sent in every request body.
    pub api_key: String,
    /// Upper bound for one call, retries and backoff included.
    pub timeout: Duration,
    /// Retries for connection errors, 429 and 5xx.
    pub max_retries: u32,
}

impl ClientConfig {
    /// Settings with the default endpoint, timeout and retry count.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            endpoint: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}
