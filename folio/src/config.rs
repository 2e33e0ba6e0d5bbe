//! Configuration for the folio search service.
//!
//! Loaded from a TOML file; every section has serde defaults so a partial
//! file (or none at all) still yields a runnable config.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// External base URL used when building result and paging links,
    /// e.g. "https://api.example.org/search".
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,
    #[serde(default)]
    pub cors: CorsConfig,
}

fn default_bind_addr() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_public_base_url() -> String {
    "http://localhost:8080/search".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            public_base_url: default_public_base_url(),
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CorsConfig {
    /// Enable CORS (default: true for development)
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Allowed origins. Use "*" for any origin, or list specific origins.
    #[serde(default = "default_cors_origins")]
    pub origins: Vec<String>,
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:3000".to_string(),
    ]
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            origins: default_cors_origins(),
        }
    }
}

/// Connection settings for the search engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_url")]
    pub base_url: String,
    #[serde(default = "default_works_index")]
    pub works_index: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

fn default_backend_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_works_index() -> String {
    "works".to_string()
}

fn default_request_timeout() -> u64 {
    10_000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_backend_url(),
            works_index: default_works_index(),
            request_timeout_ms: default_request_timeout(),
        }
    }
}

/// How the backend client obtains its bearer token.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// "none", "static" or "client_credentials"
    #[serde(default = "default_auth_mode")]
    pub mode: String,
    /// OAuth2 token endpoint (client_credentials mode)
    #[serde(default)]
    pub token_url: String,
    #[serde(default)]
    pub client_id: String,
    /// Override with FOLIO_CLIENT_SECRET env var
    #[serde(default)]
    pub client_secret: String,
    /// Override with FOLIO_BEARER_TOKEN env var (static mode)
    #[serde(default)]
    pub static_token: String,
    /// Refresh the cached token this many seconds before it expires
    #[serde(default = "default_refresh_slack")]
    pub refresh_slack_secs: u64,
}

fn default_auth_mode() -> String {
    "none".to_string()
}

fn default_refresh_slack() -> u64 {
    30
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            mode: default_auth_mode(),
            token_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            static_token: String::new(),
            refresh_slack_secs: default_refresh_slack(),
        }
    }
}

impl AuthConfig {
    pub fn resolved_client_secret(&self) -> String {
        std::env::var("FOLIO_CLIENT_SECRET").unwrap_or_else(|_| self.client_secret.clone())
    }

    pub fn resolved_static_token(&self) -> String {
        std::env::var("FOLIO_BEARER_TOKEN").unwrap_or_else(|_| self.static_token.clone())
    }
}

/// Search request defaults and limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    #[serde(default = "default_page_size")]
    pub default_size: u64,
    #[serde(default = "default_max_size")]
    pub max_size: u64,
    /// Page size for the CSV export walk
    #[serde(default = "default_export_page_size")]
    pub export_page_size: u64,
    /// Hard cap on export continuation pages
    #[serde(default = "default_export_max_pages")]
    pub export_max_pages: u32,
}

fn default_page_size() -> u64 {
    10
}

fn default_max_size() -> u64 {
    1000
}

fn default_export_page_size() -> u64 {
    500
}

fn default_export_max_pages() -> u32 {
    4
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_size: default_page_size(),
            max_size: default_max_size(),
            export_page_size: default_export_page_size(),
            export_max_pages: default_export_max_pages(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter string. Override with RUST_LOG env var
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log output format: "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info,folio=debug".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load config from file path, or create default
    pub fn load_or_create(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = Config::default();
            // Try to save default config
            if let Some(parent) = config_path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            let _ = config.save(config_path);
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }
}
