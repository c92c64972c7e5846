//! Configuration types for the reconciler
//!
//! Configuration is read once at startup into an immutable [`DdnsConfig`]
//! and handed to every collaborator. Nothing below the daemon reads the
//! process environment.
//!
//! ## Keys
//!
//! Required:
//! - `REFRESH_INTERVAL_SECONDS`: Reconciliation period
//! - `SUBDOMAIN`: Label to manage (e.g. `home`)
//! - `VERCEL_TOKEN`: Bearer credential
//! - `VERCEL_DOMAIN`: Domain the label lives in (e.g. `example.com`)
//!
//! Optional:
//! - `VERCEL_TEAM_ID`, `VERCEL_API_BASE`
//! - `VDNS_IPV4_SOURCES`, `VDNS_IPV6_SOURCES`: Comma-separated URLs
//! - `VDNS_DISABLE_IPV4`, `VDNS_DISABLE_IPV6`
//! - `VDNS_HTTP_TIMEOUT_SECS`, `VDNS_CYCLE_TIMEOUT_SECS`
//! - `VDNS_RUN_ON_START`, `VDNS_DRY_RUN`, `VDNS_LOG_LEVEL`

use crate::error::{Error, Result};
use crate::record::AddressFamily;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default IPv4 discovery chain (primary first)
pub const DEFAULT_IPV4_SOURCES: &[&str] = &[
    "https://api.ipify.org",
    "https://ipv4.icanhazip.com",
    "https://v4.ident.me",
];

/// Default IPv6 discovery chain (primary first)
pub const DEFAULT_IPV6_SOURCES: &[&str] = &[
    "https://api6.ipify.org",
    "https://ipv6.icanhazip.com",
    "https://v6.ident.me",
];

/// Default Vercel API base URL
pub const DEFAULT_VERCEL_API_BASE: &str = "https://api.vercel.com";

/// Longest accepted refresh interval (one week)
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

/// Longest accepted cycle timeout (one hour)
pub const MAX_CYCLE_TIMEOUT_SECS: u64 = 60 * 60;

const REQUIRED_KEYS: &[&str] = &[
    "REFRESH_INTERVAL_SECONDS",
    "SUBDOMAIN",
    "VERCEL_TOKEN",
    "VERCEL_DOMAIN",
];

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// Subdomain label whose A / AAAA records are managed
    pub subdomain: String,

    /// Seconds between reconciliation cycles
    pub refresh_interval_secs: u64,

    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Address discovery configuration
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Scheduler settings
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Log level used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl DdnsConfig {
    /// Create a configuration with defaults for everything optional
    pub fn new(
        subdomain: impl Into<String>,
        refresh_interval_secs: u64,
        provider: ProviderConfig,
    ) -> Self {
        Self {
            subdomain: subdomain.into(),
            refresh_interval_secs,
            provider,
            discovery: DiscoveryConfig::default(),
            scheduler: SchedulerConfig::default(),
            log_level: default_log_level(),
        }
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a key lookup function
    ///
    /// Blank values count as missing. Every missing required key is reported
    /// in a single error. The result is validated before it is returned.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let missing: Vec<&str> = REQUIRED_KEYS
            .iter()
            .copied()
            .filter(|key| get(*key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(Error::config(format!(
                "missing required settings: {}",
                missing.join(", ")
            )));
        }

        let refresh_interval_secs =
            parse_u64("REFRESH_INTERVAL_SECONDS", &get("REFRESH_INTERVAL_SECONDS").unwrap_or_default())?;

        let provider = ProviderConfig {
            api_token: get("VERCEL_TOKEN").unwrap_or_default(),
            domain: get("VERCEL_DOMAIN").unwrap_or_default().to_ascii_lowercase(),
            team_id: get("VERCEL_TEAM_ID"),
            api_base: get("VERCEL_API_BASE").unwrap_or_else(default_api_base),
            dry_run: get("VDNS_DRY_RUN")
                .map(|raw| parse_bool("VDNS_DRY_RUN", &raw))
                .transpose()?
                .unwrap_or(false),
        };

        let disable_v4 = get("VDNS_DISABLE_IPV4")
            .map(|raw| parse_bool("VDNS_DISABLE_IPV4", &raw))
            .transpose()?
            .unwrap_or(false);
        let disable_v6 = get("VDNS_DISABLE_IPV6")
            .map(|raw| parse_bool("VDNS_DISABLE_IPV6", &raw))
            .transpose()?
            .unwrap_or(false);

        let ipv4_sources = if disable_v4 {
            Vec::new()
        } else {
            get("VDNS_IPV4_SOURCES")
                .map(|raw| split_list(&raw))
                .unwrap_or_else(default_ipv4_sources)
        };
        let ipv6_sources = if disable_v6 {
            Vec::new()
        } else {
            get("VDNS_IPV6_SOURCES")
                .map(|raw| split_list(&raw))
                .unwrap_or_else(default_ipv6_sources)
        };

        let discovery = DiscoveryConfig {
            ipv4_sources,
            ipv6_sources,
            http_timeout_secs: get("VDNS_HTTP_TIMEOUT_SECS")
                .map(|raw| parse_u64("VDNS_HTTP_TIMEOUT_SECS", &raw))
                .transpose()?
                .unwrap_or_else(default_http_timeout_secs),
        };

        let scheduler = SchedulerConfig {
            run_on_start: get("VDNS_RUN_ON_START")
                .map(|raw| parse_bool("VDNS_RUN_ON_START", &raw))
                .transpose()?
                .unwrap_or_else(default_run_on_start),
            cycle_timeout_secs: get("VDNS_CYCLE_TIMEOUT_SECS")
                .map(|raw| parse_u64("VDNS_CYCLE_TIMEOUT_SECS", &raw))
                .transpose()?
                .unwrap_or_else(default_cycle_timeout_secs),
            event_channel_capacity: default_event_channel_capacity(),
        };

        let config = Self {
            subdomain: get("SUBDOMAIN").unwrap_or_default().to_ascii_lowercase(),
            refresh_interval_secs,
            provider,
            discovery,
            scheduler,
            log_level: get("VDNS_LOG_LEVEL").unwrap_or_else(default_log_level),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_REFRESH_INTERVAL_SECS).contains(&self.refresh_interval_secs) {
            return Err(Error::config(format!(
                "REFRESH_INTERVAL_SECONDS must be between 1 and {} seconds. Got: {}",
                MAX_REFRESH_INTERVAL_SECS, self.refresh_interval_secs
            )));
        }

        validate_dns_name("SUBDOMAIN", &self.subdomain)?;

        self.provider.validate()?;
        self.discovery.validate()?;
        self.scheduler.validate()?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(Error::config(format!(
                "VDNS_LOG_LEVEL '{}' is not valid. Valid levels: trace, debug, info, warn, error",
                self.log_level
            ))),
        }
    }

    /// Reconciliation period
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

/// Vercel provider configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Vercel API token (never logged)
    pub api_token: String,

    /// Domain holding the managed records (e.g. "example.com")
    pub domain: String,

    /// Team scope for the API calls
    #[serde(default)]
    pub team_id: Option<String>,

    /// API base URL
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Log mutations instead of sending them
    #[serde(default)]
    pub dry_run: bool,
}

impl ProviderConfig {
    /// Create a live provider configuration against the default API base
    pub fn new(api_token: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            domain: domain.into(),
            team_id: None,
            api_base: default_api_base(),
            dry_run: false,
        }
    }

    /// Validate the provider configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_token.is_empty() {
            return Err(Error::config("VERCEL_TOKEN cannot be empty"));
        }

        let token_lower = self.api_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower.contains("changeme")
            || token_lower == "token"
        {
            return Err(Error::config(
                "VERCEL_TOKEN appears to be a placeholder. Use an actual API token.",
            ));
        }

        validate_dns_name("VERCEL_DOMAIN", &self.domain)?;
        if !self.domain.contains('.') {
            return Err(Error::config(format!(
                "VERCEL_DOMAIN must be a full domain name, got: {}",
                self.domain
            )));
        }

        validate_url("VERCEL_API_BASE", &self.api_base)
    }
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_token", &"<REDACTED>")
            .field("domain", &self.domain)
            .field("team_id", &self.team_id)
            .field("api_base", &self.api_base)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// Address discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// IPv4 sources, primary first; empty disables the family
    #[serde(default = "default_ipv4_sources")]
    pub ipv4_sources: Vec<String>,

    /// IPv6 sources, primary first; empty disables the family
    #[serde(default = "default_ipv6_sources")]
    pub ipv6_sources: Vec<String>,

    /// Timeout applied to every outbound HTTP request (seconds)
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

impl DiscoveryConfig {
    /// Validate the discovery configuration
    pub fn validate(&self) -> Result<()> {
        if self.ipv4_sources.is_empty() && self.ipv6_sources.is_empty() {
            return Err(Error::config(
                "At least one address family needs a discovery source",
            ));
        }

        for url in self.ipv4_sources.iter().chain(&self.ipv6_sources) {
            validate_url("discovery source", url)?;
        }

        if !(1..=300).contains(&self.http_timeout_secs) {
            return Err(Error::config(format!(
                "VDNS_HTTP_TIMEOUT_SECS must be between 1 and 300 seconds. Got: {}",
                self.http_timeout_secs
            )));
        }

        Ok(())
    }

    /// Sources configured for `family`
    pub fn sources(&self, family: AddressFamily) -> &[String] {
        match family {
            AddressFamily::V4 => &self.ipv4_sources,
            AddressFamily::V6 => &self.ipv6_sources,
        }
    }

    /// Per-request HTTP timeout
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            ipv4_sources: default_ipv4_sources(),
            ipv6_sources: default_ipv6_sources(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}

/// Scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Run one cycle immediately instead of waiting a full interval
    #[serde(default = "default_run_on_start")]
    pub run_on_start: bool,

    /// Upper bound on the duration of one cycle (seconds)
    #[serde(default = "default_cycle_timeout_secs")]
    pub cycle_timeout_secs: u64,

    /// Capacity of the scheduler event channel
    ///
    /// When full, new events are dropped (with a warning log).
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl SchedulerConfig {
    /// Validate the scheduler configuration
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_CYCLE_TIMEOUT_SECS).contains(&self.cycle_timeout_secs) {
            return Err(Error::config(format!(
                "VDNS_CYCLE_TIMEOUT_SECS must be between 1 and {} seconds. Got: {}",
                MAX_CYCLE_TIMEOUT_SECS, self.cycle_timeout_secs
            )));
        }
        if self.event_channel_capacity == 0 {
            return Err(Error::config("Scheduler event channel capacity must be > 0"));
        }
        Ok(())
    }

    /// Upper bound on one cycle
    pub fn cycle_timeout(&self) -> Duration {
        Duration::from_secs(self.cycle_timeout_secs)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            run_on_start: default_run_on_start(),
            cycle_timeout_secs: default_cycle_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_ipv4_sources() -> Vec<String> {
    DEFAULT_IPV4_SOURCES.iter().map(|s| s.to_string()).collect()
}

fn default_ipv6_sources() -> Vec<String> {
    DEFAULT_IPV6_SOURCES.iter().map(|s| s.to_string()).collect()
}

fn default_api_base() -> String {
    DEFAULT_VERCEL_API_BASE.to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

fn default_cycle_timeout_secs() -> u64 {
    120
}

fn default_run_on_start() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn parse_u64(key: &str, raw: &str) -> Result<u64> {
    raw.parse()
        .map_err(|_| Error::config(format!("{} must be a non-negative integer, got: {}", key, raw)))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::config(format!("{} must be a boolean, got: {}", key, raw))),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn validate_url(key: &str, url: &str) -> Result<()> {
    if !url.starts_with("https://") && !url.starts_with("http://") {
        return Err(Error::config(format!(
            "{} must use HTTP or HTTPS scheme. Got: {}",
            key, url
        )));
    }
    Ok(())
}

/// Basic RFC 1035 name validation: dot-separated labels of letters, digits
/// and hyphens, 1-63 chars each, 253 chars total.
fn validate_dns_name(key: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::config(format!("{} cannot be empty", key)));
    }

    if name.len() > 253 {
        return Err(Error::config(format!(
            "{} too long: {} chars (max 253)",
            key,
            name.len()
        )));
    }

    for label in name.split('.') {
        if label.is_empty() {
            return Err(Error::config(format!("{} has an empty label: '{}'", key, name)));
        }

        if label.len() > 63 {
            return Err(Error::config(format!(
                "{} label too long: {} chars (max 63). Label: '{}'",
                key,
                label.len(),
                label
            )));
        }

        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(Error::config(format!(
                "{} label contains invalid characters. Label: '{}'. Valid: alphanumeric and hyphen only.",
                key, label
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::config(format!(
                "{} label cannot start or end with hyphen. Label: '{}'",
                key, label
            )));
        }
    }

    Ok(())
}
