//! Configuration loading for the Asset Relay CLI.

use anyhow::{Context, Result};
use ar_connectors::{AuthConfig, ConnectorConfig, SecureString, SnipeItConfig};
use ar_core::{FetchSettings, MappingProfile};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const REDACTED: &str = "***REDACTED***";

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Inventory system of record.
    #[serde(default)]
    pub inventory: InventoryConfig,

    /// MDM receiving updates.
    #[serde(default)]
    pub mdm: MdmConfig,

    /// Sync pass tuning.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Site-specific mapping configuration.
    #[serde(default)]
    pub mapping: MappingProfile,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Saves configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_yaml::to_string(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Creates a copy with secrets redacted.
    pub fn redact_secrets(&self) -> Self {
        let mut config = self.clone();
        if !config.inventory.api_token.is_empty() {
            config.inventory.api_token = SecureString::from(REDACTED);
        }
        if !config.mdm.password.is_empty() {
            config.mdm.password = SecureString::from(REDACTED);
        }
        config
    }
}

/// Inventory connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// Base URL of the inventory API.
    #[serde(default)]
    pub base_url: String,

    /// API bearer token.
    #[serde(default)]
    pub api_token: SecureString,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries per request.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Whether to verify TLS certificates.
    #[serde(default = "default_true")]
    pub verify_tls: bool,

    /// Requests per minute to stay under the API throttle.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_token: SecureString::default(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            verify_tls: true,
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

impl InventoryConfig {
    pub fn to_connector_config(&self) -> SnipeItConfig {
        SnipeItConfig {
            connector: ConnectorConfig {
                name: "inventory".to_string(),
                base_url: self.base_url.clone(),
                auth: AuthConfig::BearerToken {
                    token: self.api_token.clone(),
                },
                timeout_secs: self.timeout_secs,
                max_retries: self.max_retries,
                verify_tls: self.verify_tls,
                headers: HashMap::new(),
            },
            requests_per_minute: self.requests_per_minute,
        }
    }
}

/// MDM connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MdmConfig {
    /// Base URL of the MDM API.
    #[serde(default)]
    pub base_url: String,

    /// API account username.
    #[serde(default)]
    pub username: String,

    /// API account password.
    #[serde(default)]
    pub password: SecureString,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries per request.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Whether to verify TLS certificates.
    #[serde(default = "default_true")]
    pub verify_tls: bool,
}

impl Default for MdmConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: SecureString::default(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            verify_tls: true,
        }
    }
}

impl MdmConfig {
    pub fn to_connector_config(&self) -> ConnectorConfig {
        ConnectorConfig {
            name: "mdm".to_string(),
            base_url: self.base_url.clone(),
            auth: AuthConfig::Basic {
                username: self.username.clone(),
                password: self.password.clone(),
            },
            timeout_secs: self.timeout_secs,
            max_retries: self.max_retries,
            verify_tls: self.verify_tls,
            headers: HashMap::new(),
        }
    }
}

/// Sync pass tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Default look-back window, days component.
    #[serde(default)]
    pub lookback_days: i64,

    /// Default look-back window, hours component.
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,

    /// Inventory paging parameters.
    #[serde(default)]
    pub fetch: FetchSettings,

    /// Concurrent deliveries; 1 means strictly sequential.
    #[serde(default = "default_delivery_concurrency")]
    pub delivery_concurrency: usize,

    /// Path of the retry ledger document.
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    /// Custom field definition holding the building list.
    #[serde(default = "default_building_field_id")]
    pub building_field_id: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lookback_days: 0,
            lookback_hours: default_lookback_hours(),
            fetch: FetchSettings::default(),
            delivery_concurrency: default_delivery_concurrency(),
            ledger_path: default_ledger_path(),
            building_field_id: default_building_field_id(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to use JSON format.
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_true() -> bool {
    true
}

fn default_requests_per_minute() -> u32 {
    120
}

fn default_lookback_hours() -> i64 {
    6
}

fn default_delivery_concurrency() -> usize {
    1
}

fn default_ledger_path() -> PathBuf {
    PathBuf::from("failed_assets.json")
}

fn default_building_field_id() -> u64 {
    6
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.sync.lookback_days, 0);
        assert_eq!(config.sync.lookback_hours, 6);
        assert_eq!(config.sync.delivery_concurrency, 1);
        assert_eq!(config.sync.ledger_path, PathBuf::from("failed_assets.json"));
        assert!(config.inventory.verify_tls);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
inventory:
  base_url: https://inventory.example.edu
  api_token: ${INVENTORY_API_TOKEN}
  requests_per_minute: 60

mdm:
  base_url: https://mdm.example.edu
  username: relay
  password: ${MDM_API_PASS}

sync:
  lookback_days: 1
  lookback_hours: 0
  delivery_concurrency: 4
  fetch:
    page_size: 100
    manufacturer_id: 1

mapping:
  email_domain: asu.edu
  on_hold_labels: ["ready to deploy", "received", "30 day hold"]
"#;

        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.inventory.base_url, "https://inventory.example.edu");
        assert_eq!(config.inventory.requests_per_minute, 60);
        assert_eq!(config.mdm.username, "relay");
        assert_eq!(config.sync.lookback_days, 1);
        assert_eq!(config.sync.fetch.page_size, 100);
        assert_eq!(config.sync.delivery_concurrency, 4);
        assert_eq!(config.mapping.email_domain, "asu.edu");
        // Unspecified sections keep their defaults.
        assert_eq!(config.sync.building_field_id, 6);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_redact_secrets() {
        let mut config = AppConfig::default();
        config.inventory.api_token = SecureString::from("inventory-secret");
        config.mdm.password = SecureString::from("mdm-secret");

        let redacted = config.redact_secrets();
        assert_eq!(redacted.inventory.api_token.expose_secret(), REDACTED);
        assert_eq!(redacted.mdm.password.expose_secret(), REDACTED);
    }

    #[test]
    fn test_redact_leaves_empty_secrets_alone() {
        let redacted = AppConfig::default().redact_secrets();
        assert!(redacted.inventory.api_token.is_empty());
        assert!(redacted.mdm.password.is_empty());
    }

    #[test]
    fn test_to_connector_configs() {
        let mut config = AppConfig::default();
        config.inventory.base_url = "https://inventory.example.edu".to_string();
        config.mdm.base_url = "https://mdm.example.edu".to_string();
        config.mdm.username = "relay".to_string();

        let inventory = config.inventory.to_connector_config();
        assert_eq!(inventory.connector.name, "inventory");
        assert!(matches!(
            inventory.connector.auth,
            AuthConfig::BearerToken { .. }
        ));

        let mdm = config.mdm.to_connector_config();
        assert_eq!(mdm.name, "mdm");
        assert!(matches!(mdm.auth, AuthConfig::Basic { .. }));
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = AppConfig::default();
        config.inventory.base_url = "https://inventory.example.edu".to_string();
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.inventory.base_url, "https://inventory.example.edu");
    }

    #[test]
    fn test_load_missing_file_is_an_error() {
        assert!(AppConfig::load(Path::new("/nonexistent/config.yaml")).is_err());
    }
}
