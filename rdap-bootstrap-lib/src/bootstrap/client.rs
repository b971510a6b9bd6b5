//! The bootstrap client.
//!
//! [`BootstrapClient`] keeps one typed registry per [`RegistryType`] and
//! decides, per lookup, whether that registry can be used as is, should be
//! reloaded from the cache (another process refreshed it), or has to be
//! downloaded again.

use super::{AsnRegistry, DnsRegistry, LoadedRegistry, NetRegistry, Registry, ServiceProviderRegistry};
use crate::cache::{DiskCache, FileState, MemoryCache, RegistryCache};
use crate::config::{BootstrapConfig, DEFAULT_BASE_URL, EXPERIMENTAL_BASE_URL};
use crate::error::BootstrapError;
use crate::request::Request;
use crate::transport::{HttpTransport, ReqwestTransport};
use crate::types::{Answer, Question, RegistryType};
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Finds the RDAP servers for domains, IP addresses, AS numbers and tagged
/// entity handles.
///
/// The client owns its cache handle; nothing is shared between clients
/// except, for a [`DiskCache`], the files in the cache directory.
///
/// Registry files are fetched lazily: the first lookup of each type
/// downloads (or loads from the cache) the matching file.
pub struct BootstrapClient {
    config: BootstrapConfig,
    transport: Arc<dyn HttpTransport>,
    cache: Box<dyn RegistryCache>,
    registries: HashMap<RegistryType, LoadedRegistry>,
}

impl BootstrapClient {
    /// Create a client with default settings: registry files from IANA,
    /// cached in `$HOME/.rdap-bootstrap`.
    pub fn new() -> Result<Self, BootstrapError> {
        Self::with_config(BootstrapConfig::default())
    }

    /// Create a client from `config`, using reqwest for downloads and a disk
    /// or memory cache as configured.
    pub fn with_config(config: BootstrapConfig) -> Result<Self, BootstrapError> {
        let transport = Arc::new(ReqwestTransport::with_config(&config)?);

        let cache: Box<dyn RegistryCache> = if config.disk_cache {
            match &config.cache_dir {
                Some(dir) => Box::new(DiskCache::with_dir(dir)),
                None => Box::new(DiskCache::new()?),
            }
        } else {
            Box::new(MemoryCache::new())
        };

        Ok(Self::with_parts(config, transport, cache))
    }

    /// Create a client from explicit parts. The cache timeout is set from
    /// `config.cache_timeout`.
    pub fn with_parts(
        config: BootstrapConfig,
        transport: Arc<dyn HttpTransport>,
        mut cache: Box<dyn RegistryCache>,
    ) -> Self {
        cache.set_timeout(config.cache_timeout);

        Self {
            config,
            transport,
            cache,
            registries: HashMap::new(),
        }
    }

    /// Replace the HTTP transport.
    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = transport;
        self
    }

    /// Replace the cache. Registries loaded so far are kept.
    pub fn with_cache(mut self, mut cache: Box<dyn RegistryCache>) -> Self {
        cache.set_timeout(self.config.cache_timeout);
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &BootstrapConfig {
        &self.config
    }

    pub fn cache(&self) -> &dyn RegistryCache {
        self.cache.as_ref()
    }

    /// Where the registry file for `registry_type` is downloaded from.
    ///
    /// The experimental service provider file isn't published by IANA, so
    /// with the default base URL it comes from [`EXPERIMENTAL_BASE_URL`].
    pub fn registry_url(&self, registry_type: RegistryType) -> String {
        let base = if registry_type == RegistryType::ServiceProvider
            && self.config.base_url == DEFAULT_BASE_URL
        {
            EXPERIMENTAL_BASE_URL
        } else {
            self.config.base_url.as_str()
        };

        if base.ends_with('/') {
            format!("{}{}", base, registry_type.filename())
        } else {
            format!("{}/{}", base, registry_type.filename())
        }
    }

    /// Download the registry file for `registry_type`, ignoring the cache
    /// state.
    ///
    /// The file is parsed before it is saved, so a malformed download
    /// leaves both the cache and the current registry untouched.
    ///
    /// # Errors
    ///
    /// - [`BootstrapError::Cancelled`] if `cancel` fires first
    /// - [`BootstrapError::HttpStatus`] for any status other than 200
    /// - [`BootstrapError::EmptyFile`] or [`BootstrapError::MalformedRegistry`]
    ///   for a bad document
    /// - [`BootstrapError::Cache`] if the file can't be saved; the new
    ///   registry is not installed in that case
    pub async fn download(
        &mut self,
        registry_type: RegistryType,
        cancel: &CancellationToken,
    ) -> Result<(), BootstrapError> {
        let url = self.registry_url(registry_type);
        info!(registry = %registry_type, url = %url, "Downloading bootstrap registry file");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(BootstrapError::cancelled(format!("download of {}", url)));
            }
            response = self.transport.get(&url) => response?,
        };

        if response.status != 200 {
            return Err(BootstrapError::HttpStatus {
                url,
                status_code: response.status,
                status_text: response.status_text,
            });
        }

        let registry = LoadedRegistry::from_json(registry_type, &response.body)?;
        self.cache.save(registry_type.filename(), &response.body)?;
        self.registries.insert(registry_type, registry);

        debug!(registry = %registry_type, bytes = response.body.len(), "Installed downloaded registry");
        Ok(())
    }

    /// Download the four IANA registry files (asn, dns, ipv4, ipv6).
    pub async fn download_all(&mut self, cancel: &CancellationToken) -> Result<(), BootstrapError> {
        for registry_type in RegistryType::IANA {
            self.download(registry_type, cancel).await?;
        }
        Ok(())
    }

    /// Answer a bootstrap question.
    ///
    /// Uses the loaded registry if it is current, reloads it from the cache
    /// if another client refreshed the cached file, and downloads it if it
    /// is missing, expired, or the cached copy can't be parsed.
    pub async fn lookup(&mut self, question: &Question) -> Result<Answer, BootstrapError> {
        let registry_type = question.registry_type;
        let state = self.cache.state(registry_type.filename());
        debug!(registry = %registry_type, state = %state, query = %question.query, "Bootstrap lookup");

        let reload_failed = self.try_reload(registry_type, state);

        let must_download = reload_failed
            || matches!(state, FileState::Absent | FileState::Expired)
            || !self.registries.contains_key(&registry_type);

        if must_download {
            self.download(registry_type, &question.cancel).await?;
        }

        self.registries
            .get(&registry_type)
            .ok_or_else(|| BootstrapError::cache(registry_type.filename(), "registry not loaded"))?
            .lookup(&question.query)
    }

    /// Find the full query URLs for `request`, one per server.
    ///
    /// A request that already has a server resolves to its own URL. An
    /// empty list means the registry has no server for the request.
    ///
    /// # Errors
    ///
    /// [`BootstrapError::BootstrapNotSupported`] for request kinds without a
    /// registry, and for entity requests unless
    /// [`BootstrapConfig::service_provider_experiment`] is set.
    pub async fn resolve(
        &mut self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<Vec<Url>, BootstrapError> {
        let (_, urls) = self.resolve_with_answer(request, cancel).await?;
        Ok(urls)
    }

    /// Like [`resolve`](Self::resolve), also returning the registry answer
    /// the URLs were built from. The answer is `None` for a request that
    /// already has a server.
    pub async fn resolve_with_answer(
        &mut self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<(Option<Answer>, Vec<Url>), BootstrapError> {
        if let Some(url) = request.url() {
            return Ok((None, vec![url.clone()]));
        }

        let registry_type = match request.bootstrap_type() {
            Some(RegistryType::ServiceProvider) if !self.config.service_provider_experiment => None,
            other => other,
        }
        .ok_or_else(|| BootstrapError::BootstrapNotSupported {
            request_type: request.request_type().to_string(),
        })?;

        let question = Question::new(registry_type, request.text()).with_cancel(cancel.clone());
        let answer = self.lookup(&question).await?;

        let mut urls = Vec::with_capacity(answer.urls.len());
        for server in &answer.urls {
            if let Some(url) = request.with_server(server)?.url() {
                urls.push(url.clone());
            }
        }
        Ok((Some(answer), urls))
    }

    /// The current registry of `registry_type`, if one has been loaded.
    ///
    /// Picks up a newer cached file if there is one, but never downloads.
    pub fn registry(&mut self, registry_type: RegistryType) -> Option<&LoadedRegistry> {
        let state = self.cache.state(registry_type.filename());
        self.try_reload(registry_type, state);
        self.registries.get(&registry_type)
    }

    pub fn asn(&mut self) -> Option<&AsnRegistry> {
        match self.registry(RegistryType::Asn)? {
            LoadedRegistry::Asn(r) => Some(r),
            _ => None,
        }
    }

    pub fn dns(&mut self) -> Option<&DnsRegistry> {
        match self.registry(RegistryType::Dns)? {
            LoadedRegistry::Dns(r) => Some(r),
            _ => None,
        }
    }

    pub fn ipv4(&mut self) -> Option<&NetRegistry> {
        match self.registry(RegistryType::Ipv4)? {
            LoadedRegistry::Net(r) => Some(r),
            _ => None,
        }
    }

    pub fn ipv6(&mut self) -> Option<&NetRegistry> {
        match self.registry(RegistryType::Ipv6)? {
            LoadedRegistry::Net(r) => Some(r),
            _ => None,
        }
    }

    pub fn service_provider(&mut self) -> Option<&ServiceProviderRegistry> {
        match self.registry(RegistryType::ServiceProvider)? {
            LoadedRegistry::ServiceProvider(r) => Some(r),
            _ => None,
        }
    }

    /// Reload from the cache if it holds a version this client hasn't
    /// loaded. Returns true if a reload was needed and failed.
    fn try_reload(&mut self, registry_type: RegistryType, state: FileState) -> bool {
        let needed = match state {
            FileState::ShouldReload => true,
            FileState::Good => !self.registries.contains_key(&registry_type),
            FileState::Absent | FileState::Expired => false,
        };
        if !needed {
            return false;
        }

        match self.reload_from_cache(registry_type) {
            Ok(()) => false,
            Err(e) => {
                warn!(registry = %registry_type, error = %e, "Failed to reload cached registry file");
                true
            }
        }
    }

    fn reload_from_cache(&mut self, registry_type: RegistryType) -> Result<(), BootstrapError> {
        let json = self.cache.load(registry_type.filename())?;
        let registry = LoadedRegistry::from_json(registry_type, &json)?;
        self.registries.insert(registry_type, registry);

        debug!(registry = %registry_type, "Reloaded registry from cache");
        Ok(())
    }
}

impl std::fmt::Debug for BootstrapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BootstrapClient")
            .field("config", &self.config)
            .field("loaded", &self.registries.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
