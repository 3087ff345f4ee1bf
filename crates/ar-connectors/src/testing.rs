//! Testing harness for connector and pipeline tests.
//!
//! Provides helper functions to build configs and inventory fixtures without
//! repeating the full record shape in every test.

use crate::traits::{
    Assignee, AuthConfig, ConnectorConfig, InventoryAsset, NamedRef, StatusLabel,
};
use chrono::NaiveDateTime;
use std::collections::HashMap;

/// Creates a test connector config with sensible defaults.
pub fn test_connector_config(name: &str, base_url: &str) -> ConnectorConfig {
    ConnectorConfig {
        name: name.to_string(),
        base_url: base_url.to_string(),
        auth: AuthConfig::None,
        timeout_secs: 30,
        max_retries: 0,
        verify_tls: true,
        headers: HashMap::new(),
    }
}

/// Creates a test connector config with bearer token auth.
pub fn test_connector_config_with_bearer(
    name: &str,
    base_url: &str,
    token: &str,
) -> ConnectorConfig {
    ConnectorConfig {
        auth: AuthConfig::BearerToken {
            token: crate::SecureString::new(token.to_string()),
        },
        ..test_connector_config(name, base_url)
    }
}

/// Creates a minimal unassigned laptop asset with the given modification
/// time. Category is "Laptop", status is "Ready to Deploy" (id 2).
pub fn sample_asset(serial: &str, name: &str, updated_at: NaiveDateTime) -> InventoryAsset {
    InventoryAsset {
        id: 1,
        serial: serial.to_string(),
        name: name.to_string(),
        asset_tag: None,
        category: NamedRef {
            id: 3,
            name: "Laptop".to_string(),
        },
        assigned_to: None,
        company: None,
        status_label: StatusLabel {
            id: 2,
            name: "Ready to Deploy".to_string(),
        },
        purchase_date: None,
        purchase_cost: None,
        order_number: None,
        warranty_expires: None,
        supplier: None,
        custom_fields: HashMap::new(),
        updated_at,
    }
}

/// Same as [`sample_asset`], checked out to a user.
pub fn sample_assigned_asset(
    serial: &str,
    name: &str,
    username: &str,
    updated_at: NaiveDateTime,
) -> InventoryAsset {
    InventoryAsset {
        assigned_to: Some(Assignee::User {
            username: username.to_string(),
            name: format!("{} Display", username),
        }),
        ..sample_asset(serial, name, updated_at)
    }
}
