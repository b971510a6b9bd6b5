//! # RDAP Bootstrap Library
//!
//! Finds the RDAP server authoritative for a domain name, IP address or
//! network, Autonomous System number or tagged entity handle, using the
//! bootstrap registry files published by IANA (RFC 9224).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rdap_bootstrap_lib::{BootstrapClient, Request};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = BootstrapClient::new()?;
//!     let urls = client
//!         .resolve(&Request::auto("192.0.2.1"), &CancellationToken::new())
//!         .await?;
//!
//!     for url in urls {
//!         println!("{}", url);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Longest-prefix IP matching**: IPv4 and IPv6 networks
//! - **DNS suffix matching**: the most specific registered suffix wins
//! - **AS number ranges**: binary search over sorted ranges
//! - **Shared disk cache**: several processes can share one cache directory
//! - **Request building**: RDAP query URLs for every request kind

// Re-export main public API types and functions
pub use bootstrap::{
    AsnRegistry, BootstrapClient, DnsRegistry, LoadedRegistry, NetRegistry, Registry,
    RegistryFile, ServiceProviderRegistry,
};
pub use cache::{DiskCache, FileState, MemoryCache, RegistryCache};
pub use config::{
    load_env_config, normalize_base_url, parse_duration_string, BootstrapConfig, ConfigManager,
    EnvConfig, FileConfig, DEFAULT_BASE_URL, EXPERIMENTAL_BASE_URL,
};
pub use error::BootstrapError;
pub use request::{Request, RequestType, SearchType};
pub use transport::{HttpResponse, HttpTransport, ReqwestTransport};
pub use types::{Answer, Question, RegistryType};

// Public modules
pub mod bootstrap;
pub mod cache;

// Internal modules - these are not part of the public API
mod config;
mod error;
mod request;
mod transport;
mod types;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, BootstrapError>;

// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
