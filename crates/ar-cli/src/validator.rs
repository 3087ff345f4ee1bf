//! Configuration validation for Asset Relay.
//!
//! Scheduled runs are unattended; anything a human would only discover from
//! a failed 3 AM cron job should be caught here instead.

use crate::config::AppConfig;
use colored::Colorize;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Critical errors that prevent a run.
    pub errors: Vec<String>,
    /// Warnings that should be addressed but don't prevent a run.
    pub warnings: Vec<String>,
}

impl ValidationResult {
    /// Creates a new empty validation result.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an error to the result.
    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Adds a warning to the result.
    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Returns true if there are any errors.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns true if there are any warnings.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Prints the validation result to the console.
    pub fn print(&self) {
        if !self.warnings.is_empty() {
            println!();
            println!("{}", "Configuration Warnings:".yellow().bold());
            for warning in &self.warnings {
                println!("  {} {}", "⚠".yellow(), warning);
            }
        }

        if !self.errors.is_empty() {
            println!();
            println!("{}", "Configuration Errors:".red().bold());
            for error in &self.errors {
                println!("  {} {}", "✗".red(), error);
            }
        }

        if self.errors.is_empty() && self.warnings.is_empty() {
            println!("  {} Configuration OK", "✓".green());
        }
    }
}

/// Validates application configuration before a run.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validates the application configuration.
    ///
    /// Returns a ValidationResult containing any errors and warnings found.
    pub fn validate(config: &AppConfig) -> ValidationResult {
        let mut result = ValidationResult::new();

        Self::validate_inventory(config, &mut result);
        Self::validate_mdm(config, &mut result);
        Self::validate_sync(config, &mut result);
        Self::validate_mapping(config, &mut result);

        result
    }

    fn validate_base_url(
        side: &str,
        base_url: &str,
        result: &mut ValidationResult,
    ) {
        if base_url.is_empty() {
            result.add_error(format!(
                "{}: base_url is required (e.g., https://{}.example.edu)",
                side,
                side.to_lowercase()
            ));
        } else if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            result.add_error(format!(
                "{}: base_url '{}' must start with http:// or https://",
                side, base_url
            ));
        } else if base_url.starts_with("http://") {
            result.add_warning(format!(
                "{}: base_url uses plain http; credentials will travel unencrypted",
                side
            ));
        }
    }

    fn validate_inventory(config: &AppConfig, result: &mut ValidationResult) {
        Self::validate_base_url("Inventory", &config.inventory.base_url, result);

        if config.inventory.api_token.is_empty() {
            result.add_warning(
                "Inventory: api_token is empty; requests will be unauthenticated".to_string(),
            );
        }

        if config.inventory.requests_per_minute == 0 {
            result.add_error("Inventory: requests_per_minute must be at least 1".to_string());
        }
    }

    fn validate_mdm(config: &AppConfig, result: &mut ValidationResult) {
        Self::validate_base_url("MDM", &config.mdm.base_url, result);

        if config.mdm.username.is_empty() {
            result.add_warning(
                "MDM: username is empty; requests will be unauthenticated".to_string(),
            );
        } else if config.mdm.password.is_empty() {
            result.add_warning(format!(
                "MDM: no password configured for account '{}'",
                config.mdm.username
            ));
        }
    }

    fn validate_sync(config: &AppConfig, result: &mut ValidationResult) {
        let sync = &config.sync;

        if sync.fetch.page_size == 0 {
            result.add_error("Sync: fetch.page_size must be at least 1".to_string());
        }

        if sync.lookback_days <= 0 && sync.lookback_hours <= 0 {
            result.add_warning(
                "Sync: look-back window is zero; only previously failed serials will sync"
                    .to_string(),
            );
        }

        if sync.delivery_concurrency == 0 {
            result.add_warning(
                "Sync: delivery_concurrency 0 is treated as 1 (sequential)".to_string(),
            );
        }

        if let Some(parent) = sync.ledger_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                result.add_error(format!(
                    "Sync: ledger directory '{}' does not exist; a completed run could not \
                     persist its retry state",
                    parent.display()
                ));
            }
        }
    }

    fn validate_mapping(config: &AppConfig, result: &mut ValidationResult) {
        let mapping = &config.mapping;

        if mapping.email_domain.is_empty() {
            result.add_error(
                "Mapping: email_domain is required to synthesize record email addresses"
                    .to_string(),
            );
        }

        if mapping.shared_team.email_address.is_empty() {
            result.add_warning(
                "Mapping: shared_team.email_address is empty; records assigned to \
                 locations/assets will carry no contact"
                    .to_string(),
            );
        }

        if mapping.on_hold_labels.is_empty() {
            result.add_warning(
                "Mapping: on_hold_labels is empty; no status will classify as \"On Hold\""
                    .to_string(),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.inventory.base_url = "https://inventory.example.edu".to_string();
        config.inventory.api_token = "token".into();
        config.mdm.base_url = "https://mdm.example.edu".to_string();
        config.mdm.username = "relay".to_string();
        config.mdm.password = "secret".into();
        config.sync.lookback_days = 1;
        config
    }

    #[test]
    fn test_validation_result_operations() {
        let mut result = ValidationResult::new();
        assert!(!result.has_errors());
        assert!(!result.has_warnings());

        result.add_error("Test error");
        assert!(result.has_errors());

        result.add_warning("Test warning");
        assert!(result.has_warnings());
    }

    #[test]
    fn test_valid_config_passes() {
        let result = ConfigValidator::validate(&valid_config());
        assert!(!result.has_errors(), "errors: {:?}", result.errors);
        assert!(!result.has_warnings(), "warnings: {:?}", result.warnings);
    }

    #[test]
    fn test_empty_base_urls_are_errors() {
        let result = ConfigValidator::validate(&AppConfig::default());
        assert!(result.has_errors());
        assert!(result.errors.iter().any(|e| e.contains("Inventory")));
        assert!(result.errors.iter().any(|e| e.contains("MDM")));
    }

    #[test]
    fn test_malformed_base_url_is_an_error() {
        let mut config = valid_config();
        config.inventory.base_url = "inventory.example.edu".to_string();
        let result = ConfigValidator::validate(&config);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("must start with http")));
    }

    #[test]
    fn test_plain_http_is_a_warning() {
        let mut config = valid_config();
        config.mdm.base_url = "http://mdm.example.edu".to_string();
        let result = ConfigValidator::validate(&config);
        assert!(!result.has_errors());
        assert!(result.warnings.iter().any(|w| w.contains("plain http")));
    }

    #[test]
    fn test_zero_rate_limit_is_an_error() {
        let mut config = valid_config();
        config.inventory.requests_per_minute = 0;
        let result = ConfigValidator::validate(&config);
        assert!(result
            .errors
            .iter()
            .any(|e| e.contains("requests_per_minute")));
    }

    #[test]
    fn test_zero_page_size_is_an_error() {
        let mut config = valid_config();
        config.sync.fetch.page_size = 0;
        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("page_size")));
    }

    #[test]
    fn test_zero_window_is_a_warning() {
        let mut config = valid_config();
        config.sync.lookback_days = 0;
        config.sync.lookback_hours = 0;
        let result = ConfigValidator::validate(&config);
        assert!(!result.has_errors());
        assert!(result.warnings.iter().any(|w| w.contains("look-back")));
    }

    #[test]
    fn test_missing_ledger_directory_is_an_error() {
        let mut config = valid_config();
        config.sync.ledger_path = "/nonexistent-dir/failed_assets.json".into();
        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("ledger")));
    }

    #[test]
    fn test_empty_email_domain_is_an_error() {
        let mut config = valid_config();
        config.mapping.email_domain = String::new();
        let result = ConfigValidator::validate(&config);
        assert!(result.errors.iter().any(|e| e.contains("email_domain")));
    }

    #[test]
    fn test_missing_credentials_are_warnings() {
        let mut config = valid_config();
        config.inventory.api_token = "".into();
        config.mdm.password = "".into();
        let result = ConfigValidator::validate(&config);
        assert!(!result.has_errors());
        assert_eq!(result.warnings.len(), 2);
    }
}
