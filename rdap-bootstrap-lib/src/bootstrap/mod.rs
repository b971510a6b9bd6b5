//! RDAP bootstrapping.
//!
//! Bootstrapping answers "which RDAP server is authoritative for this
//! query?", using the registry files IANA publishes under
//! <https://data.iana.org/rdap/>:
//!
//! - `asn.json`: Autonomous System number ranges
//! - `dns.json`: top level domains (and in principle any domain suffix)
//! - `ipv4.json`, `ipv6.json`: IP networks
//!
//! plus the experimental `service_provider.json`, which maps entity handle
//! tags (the "VRSN" in "1234~VRSN") to servers.
//!
//! Each file is parsed into a [`RegistryFile`] and then into a typed
//! registry implementing [`Registry`]. The [`BootstrapClient`] owns one
//! typed registry per [`RegistryType`], refreshing them from a
//! [`RegistryCache`](crate::cache::RegistryCache) or the network as needed.
//!
//! ```rust,no_run
//! use rdap_bootstrap_lib::{BootstrapClient, Question, RegistryType};
//!
//! # async fn run() -> Result<(), rdap_bootstrap_lib::BootstrapError> {
//! let mut client = BootstrapClient::new()?;
//! let answer = client
//!     .lookup(&Question::new(RegistryType::Dns, "example.cz"))
//!     .await?;
//!
//! for url in &answer.urls {
//!     println!("{}", url);
//! }
//! # Ok(())
//! # }
//! ```

pub mod asn;
pub mod client;
pub mod dns;
pub mod file;
pub mod net;
pub mod service_provider;

pub use asn::AsnRegistry;
pub use client::BootstrapClient;
pub use dns::DnsRegistry;
pub use file::RegistryFile;
pub use net::NetRegistry;
pub use service_provider::ServiceProviderRegistry;

use crate::error::BootstrapError;
use crate::types::{Answer, RegistryType};

/// A typed bootstrap registry.
///
/// Implementations are immutable once built. A newer registry file produces
/// a new instance rather than updating an existing one.
pub trait Registry: Send + Sync {
    /// Find the servers authoritative for `query`.
    ///
    /// No match is not an error: it yields an [`Answer`] with an empty entry
    /// and no URLs.
    fn lookup(&self, query: &str) -> Result<Answer, BootstrapError>;

    /// The registry file this registry was built from.
    fn file(&self) -> &RegistryFile;
}

/// One typed registry per registry type.
#[derive(Debug, Clone)]
pub enum LoadedRegistry {
    Asn(AsnRegistry),
    Dns(DnsRegistry),
    Net(NetRegistry),
    ServiceProvider(ServiceProviderRegistry),
}

impl LoadedRegistry {
    /// Build the registry for `registry_type` from raw registry file bytes.
    ///
    /// # Errors
    ///
    /// [`BootstrapError::EmptyFile`] if `json` is empty (or only whitespace),
    /// otherwise any parse error from [`RegistryFile::parse`].
    pub fn from_json(registry_type: RegistryType, json: &[u8]) -> Result<Self, BootstrapError> {
        if json.iter().all(u8::is_ascii_whitespace) {
            return Err(BootstrapError::empty_file(registry_type.filename()));
        }

        Ok(match registry_type {
            RegistryType::Asn => Self::Asn(AsnRegistry::new(json)?),
            RegistryType::Dns => Self::Dns(DnsRegistry::new(json)?),
            RegistryType::Ipv4 => Self::Net(NetRegistry::new(json, 4)?),
            RegistryType::Ipv6 => Self::Net(NetRegistry::new(json, 6)?),
            RegistryType::ServiceProvider => {
                Self::ServiceProvider(ServiceProviderRegistry::new(json)?)
            }
        })
    }

    fn registry(&self) -> &dyn Registry {
        match self {
            Self::Asn(r) => r,
            Self::Dns(r) => r,
            Self::Net(r) => r,
            Self::ServiceProvider(r) => r,
        }
    }
}

impl Registry for LoadedRegistry {
    fn lookup(&self, query: &str) -> Result<Answer, BootstrapError> {
        self.registry().lookup(query)
    }

    fn file(&self) -> &RegistryFile {
        self.registry().file()
    }
}
