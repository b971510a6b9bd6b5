//! Bootstrap registry file parsing.
//!
//! A registry file (RFC 9224) looks like:
//!
//! ```json
//! {
//!   "description": "RDAP bootstrap file for Domain Name System registrations",
//!   "publication": "2024-01-16T20:00:02Z",
//!   "version": "1.0",
//!   "services": [
//!     [["br"], ["https://rdap.registro.br/"]],
//!     [["com", "net"], ["https://rdap.verisign.com/com/v1/"]]
//!   ]
//! }
//! ```
//!
//! Parsing is pure: no I/O, and identical bytes always give an identical
//! [`RegistryFile`].

use crate::error::BootstrapError;
use serde::Deserialize;
use std::collections::BTreeMap;
use url::Url;

/// A parsed bootstrap registry file ({asn,dns,ipv4,ipv6,service_provider}.json).
#[derive(Debug, Clone)]
pub struct RegistryFile {
    pub description: String,
    pub publication: String,
    pub version: String,

    /// Service entry key to RDAP base URLs.
    ///
    /// e.g. in ipv6.json: "2c00::/12" => [https://rdap.afrinic.net/rdap/,
    /// http://rdap.afrinic.net/rdap/]. Every list is non-empty.
    pub entries: BTreeMap<String, Vec<Url>>,

    /// The raw JSON document.
    pub json: Vec<u8>,
}

#[derive(Deserialize)]
struct Document {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    publication: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    services: Option<Vec<Vec<Vec<String>>>>,
}

impl RegistryFile {
    /// Parse a registry JSON document.
    ///
    /// Unparsable URLs are skipped. A service entry left with no URLs
    /// contributes no keys. If a key appears in several entries, the last
    /// one wins.
    ///
    /// # Errors
    ///
    /// Returns [`BootstrapError::MalformedRegistry`] if the document is not
    /// JSON, has no `services` array, or a service entry is not a
    /// `[keys, urls]` pair.
    pub fn parse(json: &[u8]) -> Result<Self, BootstrapError> {
        let doc: Document = serde_json::from_slice(json)?;

        let services = doc
            .services
            .ok_or_else(|| BootstrapError::malformed("missing 'services' array"))?;

        let mut entries = BTreeMap::new();

        for (index, service) in services.into_iter().enumerate() {
            let [keys, raw_urls]: [Vec<String>; 2] = service.try_into().map_err(|s: Vec<_>| {
                BootstrapError::malformed(format!(
                    "bad services array: entry {} has {} elements, expected 2",
                    index,
                    s.len()
                ))
            })?;

            let urls: Vec<Url> = raw_urls
                .iter()
                .filter_map(|raw| Url::parse(raw).ok())
                .collect();

            if urls.is_empty() {
                continue;
            }

            for key in keys {
                entries.insert(key, urls.clone());
            }
        }

        Ok(Self {
            description: doc.description.unwrap_or_default(),
            publication: doc.publication.unwrap_or_default(),
            version: doc.version.unwrap_or_default(),
            entries,
            json: json.to_vec(),
        })
    }
}
