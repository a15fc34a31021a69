//! Configuration management for Rollcall.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides. Region entries describe each source
//! site the engine is allowed to crawl.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/rollcall/config.toml` (or platform
/// equivalent). If the file doesn't exist, default values are used —
/// though a default config carries no regions and thus nothing to crawl.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Database settings
    pub database: DatabaseConfig,
    /// Scraping behavior settings
    pub scraping: ScrapingConfig,
    /// Egress proxy settings
    pub proxy: ProxyConfig,
    /// Per-region crawl settings, keyed by region code (e.g. `us_ny`)
    pub regions: HashMap<String, RegionConfig>,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, falling back to defaults
    /// if the file does not exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `ROLLCALL_DB_PATH`: Override database file path
    /// - `ROLLCALL_PROXY_URL`: Override proxy URL
    /// - `ROLLCALL_PROXY_USER` / `ROLLCALL_PROXY_PASSWORD`: Override proxy credentials
    /// - `ROLLCALL_USER_AGENT`: Override outbound User-Agent string
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;

        if let Ok(val) = std::env::var("ROLLCALL_DB_PATH") {
            config.database.path = val;
        }
        if let Ok(val) = std::env::var("ROLLCALL_PROXY_URL") {
            config.proxy.url = Some(val);
        }
        if let Ok(val) = std::env::var("ROLLCALL_PROXY_USER") {
            config.proxy.user = Some(val);
        }
        if let Ok(val) = std::env::var("ROLLCALL_PROXY_PASSWORD") {
            config.proxy.password = Some(val);
        }
        if let Ok(val) = std::env::var("ROLLCALL_USER_AGENT") {
            config.scraping.user_agent = val;
        }

        Ok(config)
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/rollcall/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("org", "rollcall", "rollcall").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Look up the configuration for a region code.
    ///
    /// # Errors
    /// Returns `ConfigError::UnknownRegion` if no entry exists.
    pub fn region(&self, code: &str) -> ConfigResult<&RegionConfig> {
        self.regions
            .get(code)
            .ok_or_else(|| ConfigError::UnknownRegion {
                region: code.to_string(),
            })
    }
}

/// Database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file (or `:memory:`)
    pub path: String,
    /// Maximum pooled connections
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "rollcall.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Scraping behavior settings shared by all regions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapingConfig {
    /// Number of concurrent workers per region
    pub workers_per_region: u32,
    /// Fixed timeout applied to every outbound fetch, in seconds
    pub fetch_timeout_secs: u64,
    /// Task lease (visibility) window before a leased task is redelivered,
    /// in seconds
    pub lease_secs: u64,
    /// User agent string sent with every request
    pub user_agent: String,
}

impl Default for ScrapingConfig {
    fn default() -> Self {
        Self {
            workers_per_region: 2,
            fetch_timeout_secs: 60,
            lease_secs: 120,
            user_agent: "Rollcall/0.1.0 (+https://github.com/rollcall-data/rollcall)".to_string(),
        }
    }
}

/// Egress proxy settings.
///
/// Source sites throttle aggressively, so production crawls route through
/// a rotating proxy. Credentials are read fresh after `ttl_secs` so a
/// credential rotation is picked up without a restart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy URL without credentials (e.g. `proxy.example.net:8080`);
    /// `None` disables the proxy
    pub url: Option<String>,
    /// Proxy username
    pub user: Option<String>,
    /// Proxy password
    pub password: Option<String>,
    /// How long resolved credentials may be cached before re-reading
    pub ttl_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            url: None,
            user: None,
            password: None,
            ttl_secs: 3600,
        }
    }
}

/// Per-region crawl settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Base URL of the source site
    pub base_url: String,
    /// Queue partition name; defaults to the region code
    pub queue: Option<String>,
    /// Cursor value that marks the end of the site's data, used to tell
    /// "crawl complete" apart from "remote session lost" (e.g. `ZYT` for
    /// the last surname prefix in the NY DOCCS system)
    pub end_of_data_sentinel: String,
    /// Seed query for a fresh background crawl, as a cursor string
    /// (e.g. `aaardvark` returns every listing on sites that search
    /// alphabetically from the nearest match)
    pub seed_query: String,
    /// Whether crawling this region is currently allowed
    pub enabled: bool,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            queue: None,
            end_of_data_sentinel: "ZZZ".to_string(),
            seed_query: "aaardvark".to_string(),
            enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.path, "rollcall.db");
        assert_eq!(config.scraping.workers_per_region, 2);
        assert_eq!(config.scraping.fetch_timeout_secs, 60);
        assert!(config.proxy.url.is_none());
        assert!(config.regions.is_empty());
    }

    #[test]
    fn test_config_serialization() {
        let mut config = AppConfig::default();
        config
            .regions
            .insert("us_ny".to_string(), RegionConfig::default());

        let toml_str = toml::to_string_pretty(&config).expect("serialize config");
        assert!(toml_str.contains("[database]"));
        assert!(toml_str.contains("[scraping]"));
        assert!(toml_str.contains("[regions.us_ny]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.database.path, config.database.path);
        assert!(parsed.regions.contains_key("us_ny"));
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[database]
path = "/var/lib/rollcall/rollcall.db"

[regions.us_ny]
base_url = "http://nysdoccslookup.doccs.ny.gov"
end_of_data_sentinel = "ZYT"
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.database.path, "/var/lib/rollcall/rollcall.db");
        // Defaults fill in the rest
        assert_eq!(config.scraping.lease_secs, 120);
        let region = config.region("us_ny").expect("region entry");
        assert_eq!(region.end_of_data_sentinel, "ZYT");
        assert_eq!(region.seed_query, "aaardvark");
        assert!(region.enabled);
    }

    #[test]
    fn test_unknown_region() {
        let config = AppConfig::default();
        let err = config.region("us_zz").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownRegion { .. }));
    }

    #[test]
    fn test_load_from_missing_file_uses_defaults() {
        let tmp = TempDir::new().expect("create temp dir");
        let path = tmp.path().join("nope.toml");
        let config = AppConfig::load_from(&path).expect("load defaults");
        assert!(config.regions.is_empty());
    }
}
