use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::catalog::SearchQuery;
use crate::orchestrator::SchedulerConfig;
use crate::processing::ProcessingConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub credentials: Credentials,
    /// Alternate catalog accounts.
    #[serde(default)]
    pub accounts: Vec<Account>,
    /// Default search query template, merged with each area's properties.
    #[serde(default)]
    pub search: SearchQuery,
    #[serde(default)]
    pub download: DownloadConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Log catalog paging progress at info level.
    #[serde(default)]
    pub verbose: bool,
}

impl Config {
    pub fn has_accounts(&self) -> bool {
        !self.accounts.is_empty()
    }
}

/// Catalog credentials (basic auth).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Both username and password are set.
    pub fn is_complete(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Account {
    pub username: String,
    pub password: String,
}

/// Download output settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DownloadConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl DownloadConfig {
    /// The configured output path, only when downloads are enabled.
    pub fn output(&self) -> Option<&PathBuf> {
        if self.enable {
            self.path.as_ref()
        } else {
            None
        }
    }
}

/// Remote catalog (OpenSearch API) settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_url")]
    pub url: String,
    /// Request timeout in seconds (default: 60)
    #[serde(default = "default_catalog_timeout")]
    pub timeout_secs: u64,
    /// Filenames per OR-query chunk (default: 45)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Upper bound on request attempts per search (default: 1000)
    #[serde(default = "default_limit")]
    pub max_iterations: usize,
    /// Stop once this many records have been collected (default: 1000)
    #[serde(default = "default_limit")]
    pub max_records: usize,
    /// Pause before retrying after a connectivity error (default: 2)
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,
    /// Send unrecognized search fields as predicates instead of dropping them.
    #[serde(default)]
    pub forward_extra_fields: bool,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            url: default_catalog_url(),
            timeout_secs: default_catalog_timeout(),
            chunk_size: default_chunk_size(),
            max_iterations: default_limit(),
            max_records: default_limit(),
            retry_delay_secs: default_retry_delay(),
            forward_extra_fields: false,
        }
    }
}

fn default_catalog_url() -> String {
    "https://scihub.copernicus.eu/dhus/search".to_string()
}

fn default_catalog_timeout() -> u64 {
    60
}

fn default_chunk_size() -> usize {
    45
}

fn default_limit() -> usize {
    1000
}

fn default_retry_delay() -> u64 {
    2
}

/// Status endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Sanitized config for logs and the status endpoint (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub credentials_configured: bool,
    pub accounts: usize,
    pub search: SearchQuery,
    pub download_path: Option<PathBuf>,
    pub catalog: CatalogConfig,
    pub scheduler: SchedulerConfig,
    pub processing: ProcessingConfig,
    pub server: ServerConfig,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            credentials_configured: config.credentials.is_complete(),
            accounts: config.accounts.len(),
            search: config.search.clone(),
            download_path: config.download.output().cloned(),
            catalog: config.catalog.clone(),
            scheduler: config.scheduler.clone(),
            processing: config.processing.clone(),
            server: config.server.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::QueryField;

    #[test]
    fn test_deserialize_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.catalog.chunk_size, 45);
        assert_eq!(config.catalog.max_iterations, 1000);
        assert_eq!(config.catalog.retry_delay_secs, 2);
        assert_eq!(config.scheduler.completeness_depth, 1);
        assert!(!config.server.enabled);
        assert_eq!(config.server.port, 8080);
        assert!(!config.credentials.is_complete());
        assert!(config.download.output().is_none());
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
verbose = true

[credentials]
username = "user"
password = "secret"

[[accounts]]
username = "other"
password = "other-secret"

[search]
platformName = "Sentinel-1"
productType = "GRD"
start = 0
rows = 50

[download]
enable = true
path = "/tmp/downloads"

[catalog]
url = "http://localhost:9000/search"
chunk_size = 10
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.verbose);
        assert!(config.has_accounts());
        assert_eq!(config.search.platform(), Some("Sentinel-1"));
        assert_eq!(
            config.search.predicates.get(&QueryField::ProductType).map(String::as_str),
            Some("GRD")
        );
        assert_eq!(config.search.rows, 50);
        assert_eq!(
            config.download.output().unwrap().to_str().unwrap(),
            "/tmp/downloads"
        );
        assert_eq!(config.catalog.url, "http://localhost:9000/search");
        assert_eq!(config.catalog.chunk_size, 10);
    }

    #[test]
    fn test_download_path_ignored_when_disabled() {
        let toml = r#"
[download]
enable = false
path = "/tmp/downloads"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.download.output().is_none());
    }

    #[test]
    fn test_sanitized_config_hides_credentials() {
        let config = Config {
            credentials: Credentials::new("user", "super-secret"),
            ..Default::default()
        };
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.credentials_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("super-secret"));
        assert!(!json.contains("\"user\""));
    }
}
