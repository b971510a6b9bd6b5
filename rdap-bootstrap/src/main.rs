//! RDAP Bootstrap CLI Application
//!
//! A command-line interface for finding the RDAP servers responsible for
//! domain names, IP addresses and networks, AS numbers and entity handles.
//! This CLI application provides a user-friendly interface to the
//! rdap-bootstrap-lib library.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, ValueEnum};
use rdap_bootstrap_lib::{
    load_env_config, parse_duration_string, Answer, BootstrapClient, BootstrapConfig,
    BootstrapError, ConfigManager, Question, RegistryType, Request,
};
use serde::Serialize;
use std::path::PathBuf;
use std::process;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use url::Url;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Registry selection for `--type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QueryType {
    /// Detect the kind of each query
    Auto,
    Dns,
    Ipv4,
    Ipv6,
    Asn,
    /// Entity handles, via the experimental service provider registry
    Entity,
}

impl QueryType {
    /// The registry to query directly, `None` for auto detection.
    fn registry_type(self) -> Option<RegistryType> {
        match self {
            QueryType::Auto => None,
            QueryType::Dns => Some(RegistryType::Dns),
            QueryType::Ipv4 => Some(RegistryType::Ipv4),
            QueryType::Ipv6 => Some(RegistryType::Ipv6),
            QueryType::Asn => Some(RegistryType::Asn),
            QueryType::Entity => Some(RegistryType::ServiceProvider),
        }
    }
}

/// CLI arguments for rdap-bootstrap
#[derive(Parser, Debug)]
#[command(name = "rdap-bootstrap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Find the RDAP server for a domain, IP address, AS number or entity")]
#[command(
    long_about = "Find the RDAP servers responsible for domain names, IP addresses and networks, AS numbers and entity handles.\n\nUses the IANA bootstrap registry files (RFC 9224), cached on disk and refreshed when they expire."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// Queries to bootstrap (domain, IP address or network, AS number, entity handle)
    #[arg(value_name = "QUERY", help_heading = "Queries")]
    pub queries: Vec<String>,

    /// Registry to query
    #[arg(
        short = 't',
        long = "type",
        value_enum,
        default_value_t = QueryType::Auto,
        help_heading = "Queries"
    )]
    pub query_type: QueryType,

    /// Download the registry files even if the cached copies are fresh
    #[arg(long = "download", help_heading = "Registry")]
    pub download: bool,

    /// List the top-level domains in the DNS registry
    #[arg(long = "list-tlds", help_heading = "Registry")]
    pub list_tlds: bool,

    /// Base URL of the registry files
    #[arg(long = "base-url", value_name = "URL", help_heading = "Registry")]
    pub base_url: Option<String>,

    /// Bootstrap entity handles through the experimental service provider registry
    #[arg(long = "experimental", help_heading = "Registry")]
    pub experimental: bool,

    /// Cache directory (default: ~/.rdap-bootstrap)
    #[arg(long = "cache-dir", value_name = "DIR", help_heading = "Cache")]
    pub cache_dir: Option<PathBuf>,

    /// Keep registry files in memory only
    #[arg(long = "no-disk-cache", help_heading = "Cache")]
    pub no_disk_cache: bool,

    /// How long cached registry files stay fresh (e.g. 24h, 90m)
    #[arg(long = "cache-ttl", value_name = "DURATION", help_heading = "Cache")]
    pub cache_ttl: Option<String>,

    /// Download timeout (e.g. 30s, 2m)
    #[arg(long = "timeout", value_name = "DURATION", help_heading = "Network")]
    pub timeout: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long = "insecure", help_heading = "Network")]
    pub insecure: bool,

    /// Use this configuration file instead of discovering one
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Print answers as JSON
    #[arg(short = 'j', long = "json", help_heading = "Output")]
    pub json: bool,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Output")]
    pub verbose: u8,
}

/// What happened to one query.
#[derive(Debug, Serialize)]
pub struct QueryOutcome {
    pub query: String,

    /// The registry consulted, if any.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub registry_type: Option<RegistryType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Answer>,

    /// Full RDAP query URLs (auto mode only).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<Url>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryOutcome {
    fn failed(query: &str, registry_type: Option<RegistryType>, error: BootstrapError) -> Self {
        Self {
            query: query.to_string(),
            registry_type,
            answer: None,
            urls: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_match(&self) -> bool {
        !self.urls.is_empty() || self.answer.as_ref().is_some_and(Answer::is_match)
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(args.verbose);

    // Validate arguments
    if let Err(e) = validate_args(&args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    match run(args).await {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

/// Validate command line arguments
fn validate_args(args: &Args) -> Result<(), String> {
    if args.queries.is_empty() && !args.download && !args.list_tlds {
        return Err(
            "You must specify at least one query, or use --download or --list-tlds".to_string(),
        );
    }

    Ok(())
}

/// Main bootstrap logic. Returns whether every query succeeded.
async fn run(args: Args) -> Result<bool, Box<dyn std::error::Error>> {
    let config = build_config(&args)?;
    debug!(?config, "Resolved configuration");

    let mut client = BootstrapClient::with_config(config)?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    if args.download {
        download(&mut client, args.query_type, &cancel).await?;
    }

    if args.list_tlds {
        list_tlds(&mut client, &cancel).await?;
    }

    if args.queries.is_empty() {
        return Ok(true);
    }

    let mut outcomes = Vec::with_capacity(args.queries.len());
    for query in &args.queries {
        outcomes.push(run_query(&mut client, query, args.query_type, &cancel).await);
    }

    if args.json {
        display_json_results(&outcomes)?;
    } else {
        ui::print_outcomes(&outcomes);
    }

    Ok(outcomes.iter().all(|o| o.error.is_none()))
}

fn cancel_on_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("Interrupted, cancelling downloads");
            cancel.cancel();
        }
    });
}

/// Refresh the registry file for `query_type`, or all IANA files in auto mode.
async fn download(
    client: &mut BootstrapClient,
    query_type: QueryType,
    cancel: &CancellationToken,
) -> Result<(), BootstrapError> {
    let registry_types = match query_type.registry_type() {
        Some(registry_type) => vec![registry_type],
        None => RegistryType::IANA.to_vec(),
    };

    for registry_type in registry_types {
        client.download(registry_type, cancel).await?;
        ui::print_downloaded(registry_type, &client.registry_url(registry_type));
    }

    Ok(())
}

async fn list_tlds(
    client: &mut BootstrapClient,
    cancel: &CancellationToken,
) -> Result<(), BootstrapError> {
    if client.dns().is_none() {
        client.download(RegistryType::Dns, cancel).await?;
    }

    let tlds = client.dns().map(|dns| dns.tlds()).unwrap_or_default();
    ui::print_tlds(&tlds);
    Ok(())
}

async fn run_query(
    client: &mut BootstrapClient,
    query: &str,
    query_type: QueryType,
    cancel: &CancellationToken,
) -> QueryOutcome {
    let Some(registry_type) = query_type.registry_type() else {
        return run_auto_query(client, query, cancel).await;
    };

    let question = Question::new(registry_type, query).with_cancel(cancel.clone());
    match client.lookup(&question).await {
        Ok(answer) => QueryOutcome {
            query: query.to_string(),
            registry_type: Some(registry_type),
            answer: Some(answer),
            urls: Vec::new(),
            error: None,
        },
        Err(e) => QueryOutcome::failed(query, Some(registry_type), e),
    }
}

/// Detect the request kind, then resolve it to full RDAP query URLs.
async fn run_auto_query(
    client: &mut BootstrapClient,
    query: &str,
    cancel: &CancellationToken,
) -> QueryOutcome {
    let request = Request::auto(query);
    let registry_type = request.bootstrap_type();
    debug!(query, request_type = %request.request_type(), "Detected request type");

    let (answer, urls) = match client.resolve_with_answer(&request, cancel).await {
        Ok(resolved) => resolved,
        Err(e) => return QueryOutcome::failed(query, registry_type, e),
    };

    QueryOutcome {
        query: query.to_string(),
        registry_type,
        answer,
        urls,
        error: None,
    }
}

/// Build configuration from defaults, config files, environment and CLI args
fn build_config(args: &Args) -> Result<BootstrapConfig, Box<dyn std::error::Error>> {
    let mut config = BootstrapConfig::default();
    let config_manager = ConfigManager::new();
    let env_config = load_env_config();

    // Step 1: config files. An explicit file must load; discovery skips bad files.
    if let Some(explicit_config_path) = &args.config {
        debug!(path = %explicit_config_path, "Using explicit config file (--config)");
        let file_config = config_manager
            .load_file(explicit_config_path)
            .map_err(|e| format!("Failed to load config file '{}': {}", explicit_config_path, e))?;
        file_config.apply_to(&mut config)?;
    } else if let Some(env_config_path) = &env_config.config {
        debug!(path = %env_config_path.display(), "Using explicit config file (RDAP_BOOTSTRAP_CONFIG)");
        let file_config = config_manager.load_file(env_config_path).map_err(|e| {
            format!(
                "Failed to load config file '{}': {}",
                env_config_path.display(),
                e
            )
        })?;
        file_config.apply_to(&mut config)?;
    } else {
        debug!("Discovering config files");
        config_manager.discover_and_load().apply_to(&mut config)?;
    }

    // Step 2: environment variables (RDAP_BOOTSTRAP_*)
    env_config.apply_to(&mut config);

    // Step 3: CLI arguments (highest precedence)
    apply_cli_args_to_config(&mut config, args)?;

    Ok(config)
}

fn apply_cli_args_to_config(
    config: &mut BootstrapConfig,
    args: &Args,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(base_url) = &args.base_url {
        config.set_base_url(base_url)?;
    }

    if let Some(dir) = &args.cache_dir {
        config.cache_dir = Some(dir.clone());
    }

    if args.no_disk_cache {
        config.disk_cache = false;
    }

    if let Some(ttl) = &args.cache_ttl {
        config.cache_timeout = parse_duration_string(ttl)
            .ok_or_else(|| format!("Invalid --cache-ttl '{}'. Use a format like '24h' or '90m'", ttl))?;
    }

    if let Some(timeout) = &args.timeout {
        let timeout = parse_duration_string(timeout)
            .filter(|d| !d.is_zero())
            .ok_or_else(|| format!("Invalid --timeout '{}'. Use a format like '30s' or '2m'", timeout))?;
        config.http_timeout = timeout;
    }

    if args.insecure {
        config.accept_invalid_certs = true;
    }

    if args.experimental {
        config.service_provider_experiment = true;
    }

    Ok(())
}

/// Display results in JSON format
fn display_json_results(outcomes: &[QueryOutcome]) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(outcomes)?;
    println!("{}", json);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("rdap-bootstrap").chain(argv.iter().copied()))
    }

    #[test]
    fn test_query_type_mapping() {
        assert_eq!(QueryType::Auto.registry_type(), None);
        assert_eq!(QueryType::Dns.registry_type(), Some(RegistryType::Dns));
        assert_eq!(
            QueryType::Entity.registry_type(),
            Some(RegistryType::ServiceProvider)
        );
    }

    #[test]
    fn test_validate_args_requires_work() {
        assert!(validate_args(&args(&[])).is_err());
        assert!(validate_args(&args(&["example.com"])).is_ok());
        assert!(validate_args(&args(&["--download"])).is_ok());
        assert!(validate_args(&args(&["--list-tlds"])).is_ok());
    }

    #[test]
    fn test_cli_args_override_config() {
        let mut config = BootstrapConfig::default();
        let args = args(&[
            "--base-url",
            "https://mirror.example/rdap",
            "--cache-dir",
            "/tmp/rdap-cache",
            "--no-disk-cache",
            "--cache-ttl",
            "2h",
            "--timeout",
            "5s",
            "--insecure",
            "--experimental",
            "x",
        ]);

        apply_cli_args_to_config(&mut config, &args).unwrap();

        assert_eq!(config.base_url, "https://mirror.example/rdap/");
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/rdap-cache")));
        assert!(!config.disk_cache);
        assert_eq!(config.cache_timeout, Duration::from_secs(7200));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert!(config.accept_invalid_certs);
        assert!(config.service_provider_experiment);
    }

    #[test]
    fn test_cli_args_reject_bad_durations() {
        let mut config = BootstrapConfig::default();
        assert!(apply_cli_args_to_config(&mut config, &args(&["--cache-ttl", "soon", "x"])).is_err());
        assert!(apply_cli_args_to_config(&mut config, &args(&["--timeout", "0s", "x"])).is_err());
    }

    #[test]
    fn test_outcome_json_shape() {
        let outcome = QueryOutcome::failed(
            "AS-1",
            Some(RegistryType::Asn),
            BootstrapError::invalid_query("AS-1", "invalid AS number"),
        );
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["query"], "AS-1");
        assert_eq!(json["type"], "asn");
        assert!(json.get("answer").is_none());
        assert!(json.get("urls").is_none());
        assert!(json["error"].as_str().unwrap().contains("invalid AS number"));
        assert!(!outcome.is_match());
    }
}
