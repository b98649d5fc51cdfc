//! Configuration module for the versions backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Remote endpoints serving JSON arrays of version records
    pub source_urls: Vec<String>,
    /// Canonical website URL injected into records missing one
    pub canonical_website: String,
    /// Canonical repository URL injected into records missing one
    pub canonical_repository: Option<String>,
    /// Per-request timeout applied to every source read
    pub request_timeout: Duration,
    /// Base URL of the Pages deployments API
    pub pages_api_base: String,
    /// Account id for the Pages deployments API (source disabled if unset)
    pub pages_account_id: Option<String>,
    /// Bearer token for the Pages deployments API (source disabled if unset)
    pub pages_api_token: Option<String>,
    /// Project name for the Pages deployments API (source disabled if unset)
    pub pages_project: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let bind_addr = env::var("VERSIONS_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid VERSIONS_BIND_ADDR format");

        let log_level = env::var("VERSIONS_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let source_urls = env::var("VERSIONS_SOURCE_URLS")
            .map(|raw| {
                raw.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let canonical_website = env::var("VERSIONS_CANONICAL_WEBSITE")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let canonical_repository = env::var("VERSIONS_CANONICAL_REPOSITORY").ok();

        let request_timeout = env::var("VERSIONS_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(10));

        let pages_api_base = env::var("CLOUDFLARE_API_BASE")
            .unwrap_or_else(|_| "https://api.cloudflare.com/client/v4".to_string());

        let pages_account_id = env::var("CLOUDFLARE_ACCOUNT_ID").ok();
        let pages_api_token = env::var("CLOUDFLARE_API_TOKEN").ok();
        let pages_project = env::var("CLOUDFLARE_PAGES_PROJECT").ok();

        Self {
            bind_addr,
            log_level,
            source_urls,
            canonical_website,
            canonical_repository,
            request_timeout,
            pages_api_base,
            pages_account_id,
            pages_api_token,
            pages_project,
        }
    }
}
