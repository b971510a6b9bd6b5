//! Domain name bootstrapping.

use super::{Registry, RegistryFile};
use crate::error::BootstrapError;
use crate::types::Answer;
use tracing::debug;

/// Registry for `dns.json`.
///
/// Lookups walk up the domain name one label at a time, so the most
/// specific registered suffix wins: with entries for "com" and
/// "example.com", "www.example.com" resolves to "example.com".
#[derive(Debug, Clone)]
pub struct DnsRegistry {
    file: RegistryFile,
}

impl DnsRegistry {
    pub fn new(json: &[u8]) -> Result<Self, BootstrapError> {
        Ok(Self {
            file: RegistryFile::parse(json)?,
        })
    }

    /// Every registered suffix, sorted.
    pub fn tlds(&self) -> Vec<&str> {
        self.file.entries.keys().map(String::as_str).collect()
    }
}

impl Registry for DnsRegistry {
    fn lookup(&self, query: &str) -> Result<Answer, BootstrapError> {
        let fqdn = query.strip_suffix('.').unwrap_or(query).to_lowercase();

        let mut suffix = fqdn.as_str();
        loop {
            if let Some(urls) = self.file.entries.get(suffix) {
                debug!(query = %fqdn, entry = %suffix, "DNS bootstrap match");
                return Ok(Answer {
                    entry: suffix.to_string(),
                    urls: urls.clone(),
                    query: fqdn,
                });
            }

            if suffix.is_empty() {
                break;
            }

            suffix = match suffix.split_once('.') {
                Some((_, parent)) => parent,
                None => "",
            };
        }

        Ok(Answer::no_match(fqdn))
    }

    fn file(&self) -> &RegistryFile {
        &self.file
    }
}
