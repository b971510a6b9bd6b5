//! Configuration file parsing and management.
//!
//! Settings come from, lowest precedence first: built-in defaults, TOML
//! files, `RDAP_BOOTSTRAP_*` environment variables, and finally whatever the
//! caller (usually the CLI) sets directly on [`BootstrapConfig`].
//!
//! A configuration file looks like:
//!
//! ```toml
//! [bootstrap]
//! base_url = "https://data.iana.org/rdap/"
//! service_provider_experiment = false
//!
//! [cache]
//! dir = "/var/cache/rdap-bootstrap"
//! disk = true
//! ttl = "24h"
//!
//! [http]
//! timeout = "30s"
//! user_agent = "my-tool/1.0"
//! insecure = false
//! ```

use crate::cache::DEFAULT_CACHE_TIMEOUT;
use crate::error::BootstrapError;
use crate::transport::DEFAULT_USER_AGENT;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default base URL of the IANA bootstrap registry files.
pub const DEFAULT_BASE_URL: &str = "https://data.iana.org/rdap/";

/// Base URL of the experimental service provider registry, used in place of
/// [`DEFAULT_BASE_URL`] for `service_provider.json`.
pub const EXPERIMENTAL_BASE_URL: &str = "https://www.openrdap.org/rdap/";

/// Default timeout for registry downloads.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Settings for a [`BootstrapClient`](crate::BootstrapClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Where registry files are downloaded from. Always ends with "/".
    pub base_url: String,

    /// How long a cached registry file stays fresh.
    pub cache_timeout: Duration,

    /// Disk cache directory. `None` means `$HOME/.rdap-bootstrap`.
    pub cache_dir: Option<PathBuf>,

    /// Use a disk cache (shared between processes) rather than memory.
    pub disk_cache: bool,

    /// Timeout for each registry download.
    pub http_timeout: Duration,

    pub user_agent: String,

    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,

    /// Bootstrap entity handles through the experimental service provider
    /// registry.
    pub service_provider_experiment: bool,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            cache_timeout: DEFAULT_CACHE_TIMEOUT,
            cache_dir: None,
            disk_cache: true,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_invalid_certs: false,
            service_provider_experiment: false,
        }
    }
}

impl BootstrapConfig {
    /// Set the base URL, checking it and adding a trailing "/" if missing.
    pub fn set_base_url(&mut self, base_url: &str) -> Result<(), BootstrapError> {
        self.base_url = normalize_base_url(base_url)?;
        Ok(())
    }
}

/// Check a base URL is an absolute http(s) URL and make it end with "/".
pub fn normalize_base_url(base_url: &str) -> Result<String, BootstrapError> {
    let url = Url::parse(base_url.trim()).map_err(|e| {
        BootstrapError::config(format!("Invalid base URL '{}': {}", base_url, e))
    })?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(BootstrapError::config(format!(
            "Invalid base URL '{}': scheme must be http or https",
            base_url
        )));
    }

    let mut normalized = url.to_string();
    if !normalized.ends_with('/') {
        normalized.push('/');
    }
    Ok(normalized)
}

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap: Option<BootstrapSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<CacheSection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub http: Option<HttpSection>,
}

/// `[bootstrap]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct BootstrapSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_provider_experiment: Option<bool>,
}

/// `[cache]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,

    /// `false` keeps registry files in memory only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<bool>,

    /// Freshness window, e.g. "24h", "90m".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<String>,
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct HttpSection {
    /// Download timeout, e.g. "30s".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
}

impl FileConfig {
    /// Overlay the values set in this file onto `config`.
    pub fn apply_to(&self, config: &mut BootstrapConfig) -> Result<(), BootstrapError> {
        if let Some(bootstrap) = &self.bootstrap {
            if let Some(base_url) = &bootstrap.base_url {
                config.set_base_url(base_url)?;
            }
            if let Some(enabled) = bootstrap.service_provider_experiment {
                config.service_provider_experiment = enabled;
            }
        }

        if let Some(cache) = &self.cache {
            if let Some(dir) = &cache.dir {
                config.cache_dir = Some(dir.clone());
            }
            if let Some(disk) = cache.disk {
                config.disk_cache = disk;
            }
            if let Some(ttl) = &cache.ttl {
                config.cache_timeout = parse_duration_setting("cache.ttl", ttl)?;
            }
        }

        if let Some(http) = &self.http {
            if let Some(timeout) = &http.timeout {
                config.http_timeout = parse_duration_setting("http.timeout", timeout)?;
            }
            if let Some(user_agent) = &http.user_agent {
                config.user_agent = user_agent.clone();
            }
            if let Some(insecure) = http.insecure {
                config.accept_invalid_certs = insecure;
            }
        }

        Ok(())
    }
}

fn parse_duration_setting(name: &str, value: &str) -> Result<Duration, BootstrapError> {
    parse_duration_string(value).ok_or_else(|| {
        BootstrapError::config(format!(
            "Invalid {} '{}'. Use a format like '30s', '5m', '24h'",
            name, value
        ))
    })
}

/// Configuration discovery and loading functionality.
#[derive(Debug, Clone, Default)]
pub struct ConfigManager;

impl ConfigManager {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, BootstrapError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(BootstrapError::config(format!(
                "Configuration file '{}' not found",
                path.display()
            )));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            BootstrapError::config(format!(
                "Failed to read configuration file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            BootstrapError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config, then `~/.rdap-bootstrap.toml`, then
    /// `./rdap-bootstrap.toml`; later files override earlier ones key by key.
    /// A file that fails to load is skipped with a warning.
    pub fn discover_and_load(&self) -> FileConfig {
        let mut merged_config = FileConfig::default();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    debug!(path = %path.display(), "Loaded configuration file");
                    merged_config = self.merge_configs(merged_config, config);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Ignoring configuration file");
                }
            }
        }

        merged_config
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        let candidates = ["./rdap-bootstrap.toml", "./.rdap-bootstrap.toml"];

        candidates
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = dirs::home_dir()?;
        let candidates = [".rdap-bootstrap.toml", "rdap-bootstrap.toml"];

        candidates
            .iter()
            .map(|candidate| home.join(candidate))
            .find(|path| path.exists())
    }

    /// Follows the XDG Base Directory Specification.
    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".config")))?;

        let path = config_dir.join("rdap-bootstrap").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations. Values from `higher` take precedence.
    fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            bootstrap: match (lower.bootstrap, higher.bootstrap) {
                (Some(lower), Some(higher)) => Some(BootstrapSection {
                    base_url: higher.base_url.or(lower.base_url),
                    service_provider_experiment: higher
                        .service_provider_experiment
                        .or(lower.service_provider_experiment),
                }),
                (lower, higher) => higher.or(lower),
            },
            cache: match (lower.cache, higher.cache) {
                (Some(lower), Some(higher)) => Some(CacheSection {
                    dir: higher.dir.or(lower.dir),
                    disk: higher.disk.or(lower.disk),
                    ttl: higher.ttl.or(lower.ttl),
                }),
                (lower, higher) => higher.or(lower),
            },
            http: match (lower.http, higher.http) {
                (Some(lower), Some(higher)) => Some(HttpSection {
                    timeout: higher.timeout.or(lower.timeout),
                    user_agent: higher.user_agent.or(lower.user_agent),
                    insecure: higher.insecure.or(lower.insecure),
                }),
                (lower, higher) => higher.or(lower),
            },
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), BootstrapError> {
        let mut probe = BootstrapConfig::default();
        config.apply_to(&mut probe)?;

        if probe.http_timeout.is_zero() {
            return Err(BootstrapError::config("http.timeout must be greater than zero"));
        }

        if probe.user_agent.trim().is_empty() {
            return Err(BootstrapError::config("http.user_agent cannot be empty"));
        }

        Ok(())
    }
}

/// Configuration from `RDAP_BOOTSTRAP_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvConfig {
    pub base_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub disk_cache: Option<bool>,
    pub cache_ttl: Option<Duration>,
    pub timeout: Option<Duration>,
    pub user_agent: Option<String>,
    pub insecure: Option<bool>,
    pub experimental: Option<bool>,
    pub config: Option<PathBuf>,
}

/// Load configuration from environment variables.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config() -> EnvConfig {
    env_config_from(|name| env::var(name).ok())
}

fn env_config_from<F>(var: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

    let duration = |name: &str| {
        let value = non_empty(name)?;
        let parsed = parse_duration_string(&value);
        if parsed.is_none() {
            warn!(variable = name, value = %value, "Invalid duration, use a format like '30s', '5m', '24h'");
        }
        parsed
    };

    let flag = |name: &str| {
        let value = non_empty(name)?;
        let parsed = parse_bool(&value);
        if parsed.is_none() {
            warn!(variable = name, value = %value, "Invalid boolean, use true/false");
        }
        parsed
    };

    if let Some(base_url) = non_empty("RDAP_BOOTSTRAP_BASE_URL") {
        match normalize_base_url(&base_url) {
            Ok(url) => env_config.base_url = Some(url),
            Err(e) => warn!(variable = "RDAP_BOOTSTRAP_BASE_URL", error = %e, "Ignoring invalid value"),
        }
    }

    env_config.cache_dir = non_empty("RDAP_BOOTSTRAP_CACHE_DIR").map(PathBuf::from);
    env_config.disk_cache = flag("RDAP_BOOTSTRAP_DISK_CACHE");
    env_config.cache_ttl = duration("RDAP_BOOTSTRAP_CACHE_TTL");
    env_config.timeout = duration("RDAP_BOOTSTRAP_TIMEOUT").filter(|d| !d.is_zero());
    env_config.user_agent = non_empty("RDAP_BOOTSTRAP_USER_AGENT");
    env_config.insecure = flag("RDAP_BOOTSTRAP_INSECURE");
    env_config.experimental = flag("RDAP_BOOTSTRAP_EXPERIMENTAL");
    env_config.config = non_empty("RDAP_BOOTSTRAP_CONFIG").map(PathBuf::from);

    env_config
}

impl EnvConfig {
    /// Overlay the variables that were set onto `config`.
    pub fn apply_to(&self, config: &mut BootstrapConfig) {
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = Some(dir.clone());
        }
        if let Some(disk) = self.disk_cache {
            config.disk_cache = disk;
        }
        if let Some(ttl) = self.cache_ttl {
            config.cache_timeout = ttl;
        }
        if let Some(timeout) = self.timeout {
            config.http_timeout = timeout;
        }
        if let Some(user_agent) = &self.user_agent {
            config.user_agent = user_agent.clone();
        }
        if let Some(insecure) = self.insecure {
            config.accept_invalid_certs = insecure;
        }
        if let Some(experimental) = self.experimental {
            config.service_provider_experiment = experimental;
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a duration like "30s", "5m", "24h", "7d" or a bare number of
/// seconds.
pub fn parse_duration_string(value: &str) -> Option<Duration> {
    let value = value.trim().to_lowercase();

    let (digits, multiplier) = match value.chars().last()? {
        's' => (&value[..value.len() - 1], 1),
        'm' => (&value[..value.len() - 1], 60),
        'h' => (&value[..value.len() - 1], 60 * 60),
        'd' => (&value[..value.len() - 1], 24 * 60 * 60),
        _ => (value.as_str(), 1),
    };

    digits
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_duration_string() {
        assert_eq!(parse_duration_string("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration_string("30"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration_string("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration_string("24H"), Some(Duration::from_secs(86_400)));
        assert_eq!(parse_duration_string("1d"), Some(Duration::from_secs(86_400)));
        assert_eq!(parse_duration_string("0s"), Some(Duration::ZERO));
        assert_eq!(parse_duration_string("invalid"), None);
        assert_eq!(parse_duration_string(""), None);
        assert_eq!(parse_duration_string("-5s"), None);
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("https://rdap.example/bootstrap").unwrap(),
            "https://rdap.example/bootstrap/"
        );
        assert_eq!(normalize_base_url(DEFAULT_BASE_URL).unwrap(), DEFAULT_BASE_URL);
        assert!(normalize_base_url("ftp://example/").is_err());
        assert!(normalize_base_url("not a url").is_err());
    }

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        temp_file
    }

    #[test]
    fn test_load_valid_config() {
        let temp_file = write_config(
            r#"
[bootstrap]
base_url = "http://localhost:8080/rdap"
service_provider_experiment = true

[cache]
disk = false
ttl = "90m"

[http]
timeout = "5s"
insecure = true
"#,
        );

        let manager = ConfigManager::new();
        let file_config = manager.load_file(temp_file.path()).unwrap();

        let mut config = BootstrapConfig::default();
        file_config.apply_to(&mut config).unwrap();

        assert_eq!(config.base_url, "http://localhost:8080/rdap/");
        assert!(config.service_provider_experiment);
        assert!(!config.disk_cache);
        assert_eq!(config.cache_timeout, Duration::from_secs(90 * 60));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert!(config.accept_invalid_certs);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_invalid_configs() {
        let manager = ConfigManager::new();

        for content in [
            "[cache]\nttl = \"soon\"\n",
            "[http]\ntimeout = \"0s\"\n",
            "[bootstrap]\nbase_url = \"ftp://example/\"\n",
            "[http\n",
        ] {
            let temp_file = write_config(content);
            assert!(
                manager.load_file(temp_file.path()).is_err(),
                "expected error for {content:?}"
            );
        }

        assert!(manager.load_file("/nonexistent/rdap-bootstrap.toml").is_err());
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new();

        let lower = FileConfig {
            cache: Some(CacheSection {
                dir: Some(PathBuf::from("/tmp/lower")),
                ttl: Some("1h".to_string()),
                ..Default::default()
            }),
            http: Some(HttpSection {
                timeout: Some("10s".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let higher = FileConfig {
            cache: Some(CacheSection {
                ttl: Some("2h".to_string()),
                ..Default::default()
            }),
            bootstrap: Some(BootstrapSection {
                service_provider_experiment: Some(true),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = manager.merge_configs(lower, higher);
        let cache = merged.cache.unwrap();

        assert_eq!(cache.ttl, Some("2h".to_string())); // Higher wins
        assert_eq!(cache.dir, Some(PathBuf::from("/tmp/lower"))); // Lower preserved
        assert_eq!(merged.http.unwrap().timeout, Some("10s".to_string()));
        assert_eq!(
            merged.bootstrap.unwrap().service_provider_experiment,
            Some(true)
        );
    }

    #[test]
    fn test_env_config() {
        let vars: HashMap<&str, &str> = [
            ("RDAP_BOOTSTRAP_BASE_URL", "http://localhost:9000"),
            ("RDAP_BOOTSTRAP_CACHE_DIR", "/tmp/rdap-cache"),
            ("RDAP_BOOTSTRAP_DISK_CACHE", "no"),
            ("RDAP_BOOTSTRAP_CACHE_TTL", "12h"),
            ("RDAP_BOOTSTRAP_TIMEOUT", "later"),
            ("RDAP_BOOTSTRAP_INSECURE", "maybe"),
            ("RDAP_BOOTSTRAP_EXPERIMENTAL", "1"),
            ("RDAP_BOOTSTRAP_USER_AGENT", "  "),
        ]
        .into_iter()
        .collect();

        let env_config = env_config_from(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(env_config.base_url.as_deref(), Some("http://localhost:9000/"));
        assert_eq!(env_config.disk_cache, Some(false));
        assert_eq!(env_config.cache_ttl, Some(Duration::from_secs(12 * 3600)));
        assert_eq!(env_config.timeout, None);
        assert_eq!(env_config.insecure, None);
        assert_eq!(env_config.user_agent, None);
        assert_eq!(env_config.experimental, Some(true));

        let mut config = BootstrapConfig::default();
        env_config.apply_to(&mut config);
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/rdap-cache")));
        assert!(!config.disk_cache);
        assert!(config.service_provider_experiment);
        assert_eq!(config.http_timeout, DEFAULT_HTTP_TIMEOUT);
    }

    #[test]
    fn test_defaults() {
        let config = BootstrapConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.cache_timeout, Duration::from_secs(24 * 3600));
        assert!(config.disk_cache);
        assert!(!config.service_provider_experiment);
    }
}
