//! Error handling for bootstrap operations.
//!
//! This module defines one error type covering every way a bootstrap lookup
//! can fail: malformed registry files, unparsable queries, transport failures,
//! cache I/O and configuration problems.
//!
//! "No match" is never an error. A lookup that finds no authoritative server
//! returns an [`Answer`](crate::Answer) with an empty entry and no URLs.

use std::time::Duration;
use thiserror::Error;

/// Main error type for bootstrap operations.
#[derive(Error, Debug, Clone)]
pub enum BootstrapError {
    /// A registry file could not be parsed (bad JSON, missing or wrong-typed
    /// `services`, a service entry that is not a 2-element array).
    #[error("Malformed bootstrap registry: {message}")]
    MalformedRegistry { message: String },

    /// A registry file was empty (zero bytes, or only whitespace).
    #[error("Empty bootstrap registry file '{filename}'")]
    EmptyFile { filename: String },

    /// A query could not be parsed for the registry it was sent to.
    #[error("Invalid query '{query}': {reason}")]
    InvalidQuery { query: String, reason: String },

    /// An IP query of the wrong address family was sent to a network registry.
    #[error("Query '{query}' is not an IPv{expected} address or network")]
    AddressFamilyMismatch { query: String, expected: u8 },

    /// Network-related errors (connection refused, DNS, TLS, ...).
    #[error("{}", fmt_network(message, cause))]
    Network {
        message: String,
        cause: Option<String>,
    },

    /// The registry server answered with a non-200 status.
    #[error("Bootstrap download of {url} failed: HTTP {status_code} {status_text}")]
    HttpStatus {
        url: String,
        status_code: u16,
        status_text: String,
    },

    /// The operation exceeded its time budget.
    #[error("Timeout after {duration:?} during: {operation}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// The caller's cancellation token fired.
    #[error("Cancelled: {operation}")]
    Cancelled { operation: String },

    /// Reading or writing the registry cache failed.
    #[error("Cache error for '{filename}': {message}")]
    Cache { filename: String, message: String },

    /// Invalid settings.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The request type has no bootstrap registry; a server must be given.
    #[error("Cannot run query type '{request_type}' without a server URL, the server must be specified")]
    BootstrapNotSupported { request_type: String },

    /// A request could not be turned into a query URL.
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },
}

fn fmt_network(message: &str, cause: &Option<String>) -> String {
    match cause {
        Some(cause) => format!("Network error: {} (source: {})", message, cause),
        None => format!("Network error: {}", message),
    }
}

impl BootstrapError {
    /// Create a malformed registry error.
    pub fn malformed<M: Into<String>>(message: M) -> Self {
        Self::MalformedRegistry {
            message: message.into(),
        }
    }

    /// Create an empty file error.
    pub fn empty_file<F: Into<String>>(filename: F) -> Self {
        Self::EmptyFile {
            filename: filename.into(),
        }
    }

    /// Create a query syntax error.
    pub fn invalid_query<Q: Into<String>, R: Into<String>>(query: Q, reason: R) -> Self {
        Self::InvalidQuery {
            query: query.into(),
            reason: reason.into(),
        }
    }

    /// Create a network error.
    pub fn network<M: Into<String>>(message: M) -> Self {
        Self::Network {
            message: message.into(),
            cause: None,
        }
    }

    /// Create a network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::Network {
            message: message.into(),
            cause: Some(source.into()),
        }
    }

    /// Create a cancellation error.
    pub fn cancelled<O: Into<String>>(operation: O) -> Self {
        Self::Cancelled {
            operation: operation.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout<O: Into<String>>(operation: O, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a cache I/O error.
    pub fn cache<F: Into<String>, M: Into<String>>(filename: F, message: M) -> Self {
        Self::Cache {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the failure is about the query text rather than the registry
    /// or the network. The registry stays usable after these.
    pub fn is_query_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidQuery { .. } | Self::AddressFamilyMismatch { .. }
        )
    }

    /// Check if this error suggests the operation could succeed if retried.
    ///
    /// This layer never retries on its own; the hint is for callers.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Network { .. }
                | Self::Timeout { .. }
                | Self::HttpStatus {
                    status_code: 429 | 500..=599,
                    ..
                }
        )
    }
}

impl From<reqwest::Error> for BootstrapError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout("HTTP request", Duration::from_secs(30))
        } else if err.is_connect() {
            Self::network_with_source("Connection failed", err.to_string())
        } else {
            Self::network_with_source("HTTP request failed", err.to_string())
        }
    }
}

impl From<serde_json::Error> for BootstrapError {
    fn from(err: serde_json::Error) -> Self {
        Self::malformed(format!("JSON parsing failed: {}", err))
    }
}

impl From<std::io::Error> for BootstrapError {
    fn from(err: std::io::Error) -> Self {
        Self::Cache {
            filename: String::new(),
            message: format!("I/O error: {}", err),
        }
    }
}
