//! HTTP transport for registry file downloads.
//!
//! The [`BootstrapClient`](crate::BootstrapClient) only ever needs "GET this
//! URL", so the transport is a one-method trait. [`ReqwestTransport`] is the
//! real implementation; tests substitute their own.

use crate::config::BootstrapConfig;
use crate::error::BootstrapError;
use async_trait::async_trait;
use std::time::Duration;

/// Default User-Agent for registry downloads.
pub const DEFAULT_USER_AGENT: &str = concat!("rdap-bootstrap/", env!("CARGO_PKG_VERSION"));

/// A completed HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// A 200 OK response with `body`.
    pub fn ok<B: Into<Vec<u8>>>(body: B) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            body: body.into(),
        }
    }
}

/// Performs HTTP GET requests.
///
/// Any status code is a successful response at this level; judging the
/// status is up to the caller. Cancellation works by dropping the returned
/// future.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, BootstrapError>;
}

/// [`HttpTransport`] over a `reqwest::Client` using rustls.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http_client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport with default settings.
    pub fn new() -> Result<Self, BootstrapError> {
        Self::with_config(&BootstrapConfig::default())
    }

    /// Create a transport using the HTTP settings of `config`.
    pub fn with_config(config: &BootstrapConfig) -> Result<Self, BootstrapError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(config.user_agent.as_str())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .use_rustls_tls()
            .build()
            .map_err(|e| {
                BootstrapError::network_with_source(
                    "Failed to create bootstrap HTTP client",
                    e.to_string(),
                )
            })?;

        Ok(Self {
            http_client,
            timeout: config.http_timeout,
        })
    }

    /// Use an already configured `reqwest::Client`.
    pub fn with_client(http_client: reqwest::Client, timeout: Duration) -> Self {
        Self {
            http_client,
            timeout,
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, BootstrapError> {
        let response = self.http_client.get(url).send().await.map_err(|e| self.map_err(e))?;

        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.map_err(e))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            body: body.to_vec(),
        })
    }
}

impl ReqwestTransport {
    fn map_err(&self, err: reqwest::Error) -> BootstrapError {
        if err.is_timeout() {
            BootstrapError::timeout("registry file download", self.timeout)
        } else {
            BootstrapError::from(err)
        }
    }
}
