//! Configuration management for tempmail-htmx
//!
//! Configuration is loaded from multiple sources with clear precedence:
//!
//! 1. Environment variables (highest priority, `TEMPMAIL_` prefix, `__` nesting)
//! 2. `./config.toml` (development)
//! 3. `~/.config/tempmail-htmx/config.toml` (user config, XDG)
//! 4. `/etc/tempmail-htmx/config.toml` (system config)
//! 5. Hardcoded defaults (fallback)
//!
//! # Example Configuration
//!
//! ```toml
//! # config.toml
//! [server]
//! host = "127.0.0.1"
//! port = 3000
//!
//! [api]
//! base_url = "https://api.smtp.dev"
//! request_timeout_ms = 15000
//!
//! [refresh]
//! auto_refresh = true
//! interval_secs = 10
//! manual_cooldown_ms = 2000
//!
//! [store]
//! persist = true
//!
//! [proxy]
//! enabled = true
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use tempmail_htmx::config::TempmailConfig;
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = TempmailConfig::load()?;
//! let addr = config.server.bind_addr();
//! # Ok(())
//! # }
//! ```

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::api::{ClientConfig, DEFAULT_API_URL, DEFAULT_MERCURE_URL};

/// Directory name used under the XDG config and data roots
pub const APP_NAME: &str = "tempmail-htmx";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "TEMPMAIL_";

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Interface to bind
    pub host: IpAddr,

    /// Port to bind
    pub port: u16,

    /// Per-request timeout for the web app in milliseconds
    pub request_timeout_ms: u64,

    /// Largest accepted request body in bytes
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3000,
            request_timeout_ms: 30_000,
            body_limit_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServerSettings {
    /// Socket address to listen on
    #[must_use]
    pub const fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// smtp.dev connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// REST base URL
    pub base_url: String,

    /// Mercure hub base URL
    pub mercure_url: String,

    /// Upstream request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// API key used when no key has been stored yet
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            mercure_url: DEFAULT_MERCURE_URL.to_string(),
            request_timeout_ms: 15_000,
            api_key: None,
        }
    }
}

impl ApiSettings {
    /// Client settings derived from this section
    #[must_use]
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            mercure_url: self.mercure_url.clone(),
            timeout: Duration::from_millis(self.request_timeout_ms),
        }
    }
}

/// Refresh cycle tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    /// Poll the open mailbox automatically
    pub auto_refresh: bool,

    /// Seconds between automatic refreshes
    pub interval_secs: u64,

    /// Minimum gap between admitted manual refreshes in milliseconds
    pub manual_cooldown_ms: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            auto_refresh: true,
            interval_secs: 10,
            manual_cooldown_ms: 2000,
        }
    }
}

impl RefreshSettings {
    /// Poll interval, never shorter than one second
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    /// Manual refresh cooldown
    #[must_use]
    pub const fn manual_cooldown(&self) -> Duration {
        Duration::from_millis(self.manual_cooldown_ms)
    }
}

/// Store persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Write the API key, accounts and domains to disk
    pub persist: bool,

    /// Location of the persisted JSON file
    pub path: PathBuf,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            persist: true,
            path: TempmailConfig::default_store_path(),
        }
    }
}

/// Upstream forwarding under `/api` and `/mercure-api`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    /// Mount the proxy routes
    pub enabled: bool,

    /// Mount point forwarding to the REST API
    pub api_prefix: String,

    /// Mount point forwarding to the Mercure hub
    pub mercure_prefix: String,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            api_prefix: "/api".to_string(),
            mercure_prefix: "/mercure-api".to_string(),
        }
    }
}

/// Random credential generation for quick mail
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuickMailSettings {
    /// Generated username length
    pub username_length: usize,

    /// Generated password length
    pub password_length: usize,
}

impl Default for QuickMailSettings {
    fn default() -> Self {
        Self {
            username_length: 8,
            password_length: 12,
        }
    }
}

/// Complete tempmail-htmx configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TempmailConfig {
    /// HTTP listener
    #[serde(default)]
    pub server: ServerSettings,

    /// smtp.dev connection
    #[serde(default)]
    pub api: ApiSettings,

    /// Refresh cycle
    #[serde(default)]
    pub refresh: RefreshSettings,

    /// Store persistence
    #[serde(default)]
    pub store: StoreSettings,

    /// Upstream proxy
    #[serde(default)]
    pub proxy: ProxySettings,

    /// Quick mail
    #[serde(default)]
    pub quick_mail: QuickMailSettings,
}

impl TempmailConfig {
    /// Load configuration from the standard locations
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Default configuration cannot be serialized to TOML
    /// - A configuration file exists but cannot be parsed
    /// - Values fail type conversion
    pub fn load() -> anyhow::Result<Self> {
        let mut figment = Figment::new().merge(Toml::string(&toml::to_string(&Self::default())?));

        let system_config = PathBuf::from("/etc").join(APP_NAME).join("config.toml");
        if system_config.exists() {
            figment = figment.merge(Toml::file(&system_config));
        }

        let user_config = Self::recommended_path();
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }

        let local_config = PathBuf::from("./config.toml");
        if local_config.exists() {
            figment = figment.merge(Toml::file(&local_config));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true));

        Ok(figment.extract()?)
    }

    /// Load configuration from a specific file, still honoring the environment
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or values fail type
    /// conversion.
    pub fn load_from(path: &str) -> anyhow::Result<Self> {
        let config = Figment::new()
            .merge(Toml::string(&toml::to_string(&Self::default())?))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__").lowercase(true))
            .extract()?;

        Ok(config)
    }

    /// `~/.config/tempmail-htmx/config.toml`, or `./config.toml` without a home
    #[must_use]
    pub fn recommended_path() -> PathBuf {
        dirs::config_dir().map_or_else(
            || PathBuf::from("./config.toml"),
            |config_dir| config_dir.join(APP_NAME).join("config.toml"),
        )
    }

    /// `~/.local/share/tempmail-htmx/store.json`, or `./store.json` without a home
    #[must_use]
    pub fn default_store_path() -> PathBuf {
        dirs::data_dir().map_or_else(
            || PathBuf::from("./store.json"),
            |data_dir| data_dir.join(APP_NAME).join("store.json"),
        )
    }
}
