//! Entity handle bootstrapping via service provider tags.
//!
//! An entity handle may end with a tag naming its service provider, as in
//! "53774930~VRSN" (or the RFC 8521 form "53774930-VRSN"). The tag is
//! whatever follows the last separator. The registry file format is the
//! experimental object tag bootstrap from draft-hollenbeck-regext-rdap-object-tag.

use super::{Registry, RegistryFile};
use crate::error::BootstrapError;
use crate::types::Answer;
use tracing::debug;

/// Registry for `service_provider.json`.
///
/// Missing, malformed and unknown tags are not errors. They give an
/// [`Answer`] with no entry and no URLs.
#[derive(Debug, Clone)]
pub struct ServiceProviderRegistry {
    file: RegistryFile,
}

impl ServiceProviderRegistry {
    pub fn new(json: &[u8]) -> Result<Self, BootstrapError> {
        Ok(Self {
            file: RegistryFile::parse(json)?,
        })
    }
}

impl Registry for ServiceProviderRegistry {
    fn lookup(&self, query: &str) -> Result<Answer, BootstrapError> {
        let tag = match query.rfind(['~', '-']) {
            Some(offset) => &query[offset + 1..],
            None => "",
        };

        match self.file.entries.get(tag) {
            Some(urls) if !tag.is_empty() => {
                debug!(query, tag, "Service provider bootstrap match");
                Ok(Answer {
                    query: query.to_string(),
                    entry: tag.to_string(),
                    urls: urls.clone(),
                })
            }
            _ => Ok(Answer::no_match(query)),
        }
    }

    fn file(&self) -> &RegistryFile {
        &self.file
    }
}
