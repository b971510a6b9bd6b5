//! Core data types for bootstrap lookups.
//!
//! This module defines the registry type enum, the lookup question handed to
//! the [`BootstrapClient`](crate::BootstrapClient) and the answer it returns.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::BootstrapError;

/// A bootstrap registry type.
///
/// Each type has exactly one registry file, see [`RegistryType::filename`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegistryType {
    /// Domain names (`dns.json`)
    #[serde(rename = "dns")]
    Dns,

    /// IPv4 addresses and networks (`ipv4.json`)
    #[serde(rename = "ipv4")]
    Ipv4,

    /// IPv6 addresses and networks (`ipv6.json`)
    #[serde(rename = "ipv6")]
    Ipv6,

    /// Autonomous System numbers (`asn.json`)
    #[serde(rename = "asn")]
    Asn,

    /// Entity handles carrying a service provider tag (experimental)
    #[serde(rename = "service_provider")]
    ServiceProvider,
}

impl RegistryType {
    /// Every registry type, in a stable order.
    pub const ALL: [RegistryType; 5] = [
        RegistryType::Dns,
        RegistryType::Ipv4,
        RegistryType::Ipv6,
        RegistryType::Asn,
        RegistryType::ServiceProvider,
    ];

    /// The registry files published by IANA. The experimental service
    /// provider file is not one of them.
    pub const IANA: [RegistryType; 4] = [
        RegistryType::Asn,
        RegistryType::Dns,
        RegistryType::Ipv4,
        RegistryType::Ipv6,
    ];

    /// The registry file name, also used as the cache key.
    pub fn filename(self) -> &'static str {
        match self {
            RegistryType::Dns => "dns.json",
            RegistryType::Ipv4 => "ipv4.json",
            RegistryType::Ipv6 => "ipv6.json",
            RegistryType::Asn => "asn.json",
            RegistryType::ServiceProvider => "service_provider.json",
        }
    }
}

impl fmt::Display for RegistryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryType::Dns => write!(f, "dns"),
            RegistryType::Ipv4 => write!(f, "ipv4"),
            RegistryType::Ipv6 => write!(f, "ipv6"),
            RegistryType::Asn => write!(f, "asn"),
            RegistryType::ServiceProvider => write!(f, "service_provider"),
        }
    }
}

impl FromStr for RegistryType {
    type Err = BootstrapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dns" | "domain" => Ok(RegistryType::Dns),
            "ipv4" => Ok(RegistryType::Ipv4),
            "ipv6" => Ok(RegistryType::Ipv6),
            "asn" | "autnum" => Ok(RegistryType::Asn),
            "service_provider" | "serviceprovider" | "entity" => Ok(RegistryType::ServiceProvider),
            other => Err(BootstrapError::config(format!(
                "Unknown registry type '{}'",
                other
            ))),
        }
    }
}

/// Result of bootstrapping a single query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// The query as looked up, after canonicalisation (lowercased domain
    /// name, "AS" prefix removed, mask length appended to a bare address).
    pub query: String,

    /// The matching registry entry. Empty if nothing matched.
    pub entry: String,

    /// RDAP base URLs, in registry order. Empty if nothing matched.
    pub urls: Vec<Url>,
}

impl Answer {
    /// An answer with no matching entry.
    pub fn no_match<Q: Into<String>>(query: Q) -> Self {
        Self {
            query: query.into(),
            entry: String::new(),
            urls: Vec::new(),
        }
    }

    /// Whether any registry entry matched.
    pub fn is_match(&self) -> bool {
        !self.entry.is_empty() || !self.urls.is_empty()
    }
}

/// A bootstrap lookup question.
///
/// Carries the registry to consult, the raw query text and the cancellation
/// token honoured by any download the lookup triggers.
#[derive(Debug, Clone)]
pub struct Question {
    pub registry_type: RegistryType,
    pub query: String,
    pub cancel: CancellationToken,
}

impl Question {
    /// Create a question with a token that is never cancelled.
    pub fn new<Q: Into<String>>(registry_type: RegistryType, query: Q) -> Self {
        Self {
            registry_type,
            query: query.into(),
            cancel: CancellationToken::new(),
        }
    }

    /// Use `cancel` for any download this question triggers.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
