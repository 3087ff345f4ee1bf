//! Client trait definitions for Asset Relay.
//!
//! This module defines the interfaces the sync pipeline consumes (one for
//! the inventory system of record, one for the MDM receiving updates) along
//! with the record types both sides share.

use crate::secure_string::SecureString;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur in connectors.
#[derive(Error, Debug, Clone)]
pub enum ConnectorError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Rate limited: retry after {0} seconds")]
    RateLimited(u64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConnectorError {
    /// Whether this error came from the transport layer rather than the
    /// remote application (connection, timeout, throttling).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::Timeout(_) | Self::RateLimited(_)
        )
    }
}

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Health status of a connector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectorHealth {
    /// Connector is healthy and operational.
    Healthy,
    /// Connector is degraded but still functional.
    Degraded(String),
    /// Connector is unhealthy and not operational.
    Unhealthy(String),
    /// Health status is unknown.
    Unknown,
}

/// Configuration for a connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Connector name/identifier.
    pub name: String,
    /// Base URL for the API.
    pub base_url: String,
    /// Authentication configuration.
    pub auth: AuthConfig,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Maximum retries.
    pub max_retries: u32,
    /// Whether to verify TLS certificates.
    pub verify_tls: bool,
    /// Additional headers to include.
    pub headers: HashMap<String, String>,
}

/// Authentication configuration.
///
/// All credential fields use `SecureString` so sensitive data is zeroized
/// from memory when no longer needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// No authentication.
    None,
    /// API key authentication.
    ApiKey {
        /// The API key (zeroized on drop).
        key: SecureString,
        /// The header name to use for the API key.
        header_name: String,
    },
    /// Bearer token authentication.
    BearerToken {
        /// The bearer token (zeroized on drop).
        token: SecureString,
    },
    /// Basic authentication.
    Basic {
        /// The username.
        username: String,
        /// The password (zeroized on drop).
        password: SecureString,
    },
}

/// Base trait for all connectors.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns the connector name.
    fn name(&self) -> &str;

    /// Returns the connector type ("inventory" or "mdm").
    fn connector_type(&self) -> &str;

    /// Checks the health of the connector.
    async fn health_check(&self) -> ConnectorResult<ConnectorHealth>;

    /// Tests the connection to the external system.
    async fn test_connection(&self) -> ConnectorResult<bool>;
}

// ============================================================================
// Inventory-side types
// ============================================================================

/// A named reference in the inventory system (category, company, supplier).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRef {
    /// Numeric id in the inventory system.
    pub id: u64,
    /// Display name.
    pub name: String,
}

/// An asset's status label (lifecycle state).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLabel {
    /// Numeric status id.
    pub id: i64,
    /// Status name, e.g. "Ready to Deploy".
    pub name: String,
}

/// Immutable per-run snapshot of status labels, keyed by lower-cased name.
///
/// Fetched once at the start of a run and passed into the mapper by value;
/// a run that starts always sees a consistent snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusLabelMap(HashMap<String, i64>);

impl StatusLabelMap {
    /// Builds a snapshot from (name, id) pairs, lower-casing names.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, i64)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(name, id)| (name.to_lowercase(), id))
                .collect(),
        )
    }

    /// Looks up a status id by name (case-insensitive).
    pub fn id_of(&self, name: &str) -> Option<i64> {
        self.0.get(&name.to_lowercase()).copied()
    }

    /// Whether a label with this name exists (case-insensitive).
    pub fn contains_name(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A date as the inventory API reports it: a machine value plus a
/// human-formatted rendering. The sync passes the formatted value through.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedDate {
    /// ISO date, when the API provides one.
    pub date: Option<String>,
    /// Human-formatted date string.
    pub formatted: Option<String>,
}

/// What an asset is checked out to.
///
/// The inventory API reports assignment polymorphically; only user
/// assignments carry a username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assignee {
    /// Checked out to a person.
    User {
        /// Login name in the inventory (and, by convention, the MDM).
        username: String,
        /// Display name.
        name: String,
    },
    /// Checked out to a physical location.
    Location { name: String },
    /// Checked out to another asset.
    Asset { name: String },
}

/// One asset record from the inventory system. Read-only input to a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryAsset {
    /// Numeric id in the inventory system.
    pub id: u64,
    /// Unique serial number; the sync key on both sides.
    pub serial: String,
    /// Device name, e.g. "HIDA-4121212".
    pub name: String,
    /// Asset tag, when one was entered.
    pub asset_tag: Option<String>,
    /// Device category; "Tablet" selects the mobile-device record shape.
    pub category: NamedRef,
    /// Current assignment, if any.
    pub assigned_to: Option<Assignee>,
    /// Owning company; maps to the MDM department.
    pub company: Option<NamedRef>,
    /// Lifecycle status.
    pub status_label: StatusLabel,
    pub purchase_date: Option<FormattedDate>,
    /// Purchase cost as the API renders it (string, possibly grouped).
    pub purchase_cost: Option<String>,
    pub order_number: Option<String>,
    pub warranty_expires: Option<FormattedDate>,
    pub supplier: Option<NamedRef>,
    /// Custom field values keyed by field name. Keys are trimmed of
    /// surrounding whitespace at the parse boundary; a null value means the
    /// field exists but is unset.
    pub custom_fields: HashMap<String, Option<String>>,
    /// Last modification time (naive, in the inventory server's timezone).
    pub updated_at: NaiveDateTime,
}

/// Client for the inventory system of record.
#[async_trait]
pub trait InventoryClient: Send + Sync {
    /// Lists a page of assets sorted by `updated_at` descending, filtered to
    /// one manufacturer.
    async fn list_assets(
        &self,
        limit: usize,
        offset: usize,
        manufacturer_id: u64,
    ) -> ConnectorResult<Vec<InventoryAsset>>;

    /// Point lookup by search term (serial). Fails with `NotFound` when the
    /// term matches nothing.
    async fn find_asset(&self, term: &str) -> ConnectorResult<InventoryAsset>;

    /// Fetches the full status-label snapshot.
    async fn status_labels(&self) -> ConnectorResult<StatusLabelMap>;

    /// Lists the known values of a custom field definition (used by the
    /// building reconciliation).
    async fn custom_field_values(&self, field_id: u64) -> ConnectorResult<Vec<String>>;

    /// Lists company names (used by the department reconciliation).
    async fn companies(&self) -> ConnectorResult<Vec<String>>;
}

// ============================================================================
// MDM-side types
// ============================================================================

/// A user profile as the MDM reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MdmUserProfile {
    /// Login name in the MDM.
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
}

/// A device record in the shape the MDM expects, keyed externally by serial.
///
/// Serializes to `{"computer": {...}}` or `{"mobile_device": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceRecord {
    Computer(DevicePayload),
    MobileDevice(DevicePayload),
}

impl DeviceRecord {
    /// The payload, regardless of device kind.
    pub fn payload(&self) -> &DevicePayload {
        match self {
            Self::Computer(p) | Self::MobileDevice(p) => p,
        }
    }

    pub fn is_mobile_device(&self) -> bool {
        matches!(self, Self::MobileDevice(_))
    }
}

/// The sections of a device record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevicePayload {
    pub general: GeneralSection,
    pub purchasing: PurchasingSection,
    /// Always present once assignment resolution completes; null-filled for
    /// unassigned devices.
    pub location: LocationSection,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension_attributes: Option<ExtensionAttributes>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralSection {
    pub name: String,
    pub asset_tag: Option<String>,
}

/// Purchasing details; each field is independently nullable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchasingSection {
    pub po_number: Option<String>,
    pub po_date: Option<String>,
    pub purchase_price: Option<String>,
    pub warranty_expires: Option<String>,
    pub vendor: Option<String>,
}

/// User and location details.
///
/// `realname`/`real_name` and `phone`/`phone_number` are deliberately
/// duplicated: different MDM API surfaces read different keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationSection {
    pub username: Option<String>,
    pub realname: Option<String>,
    pub real_name: Option<String>,
    pub email_address: Option<String>,
    pub position: Option<String>,
    pub phone: Option<String>,
    pub phone_number: Option<String>,
    pub building: Option<String>,
    pub room: Option<String>,
    pub department: Option<String>,
}

/// Extension attributes carried on a device record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionAttributes {
    pub extension_attribute: Vec<ExtensionAttribute>,
}

impl ExtensionAttributes {
    /// The single "Usage" classification attribute.
    pub fn usage(value: impl Into<String>) -> Self {
        Self {
            extension_attribute: vec![ExtensionAttribute {
                name: "Usage".to_string(),
                value: value.into(),
            }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionAttribute {
    pub name: String,
    pub value: String,
}

/// Client for the MDM receiving updates.
#[async_trait]
pub trait MdmClient: Send + Sync {
    /// Looks up a user by username. Fails with `NotFound` when absent.
    async fn user_by_username(&self, username: &str) -> ConnectorResult<MdmUserProfile>;

    /// Upserts a computer record by serial number. Idempotent on the MDM
    /// side; safe to re-deliver.
    async fn put_computer(&self, serial: &str, record: &DeviceRecord) -> ConnectorResult<()>;

    /// Upserts a mobile-device record by serial number.
    async fn put_mobile_device(&self, serial: &str, record: &DeviceRecord) -> ConnectorResult<()>;

    /// Lists building names known to the MDM.
    async fn building_names(&self) -> ConnectorResult<Vec<String>>;

    /// Creates a building.
    async fn create_building(&self, name: &str) -> ConnectorResult<()>;

    /// Lists department names known to the MDM.
    async fn department_names(&self) -> ConnectorResult<Vec<String>>;

    /// Creates a department.
    async fn create_department(&self, name: &str) -> ConnectorResult<()>;
}
