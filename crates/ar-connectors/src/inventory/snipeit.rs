//! Snipe-IT inventory connector.
//!
//! Speaks the Snipe-IT v1 REST API: paginated hardware listings, point
//! lookups by search term, status labels, custom field definitions, and
//! companies.

use crate::http::{HttpClient, RateLimitConfig};
use crate::traits::{
    Assignee, Connector, ConnectorConfig, ConnectorError, ConnectorHealth, ConnectorResult,
    FormattedDate, InventoryAsset, InventoryClient, NamedRef, StatusLabel, StatusLabelMap,
};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Wire format of asset timestamps.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Snipe-IT connector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnipeItConfig {
    #[serde(flatten)]
    pub connector: ConnectorConfig,
    /// Requests per minute to stay under the API throttle.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

fn default_requests_per_minute() -> u32 {
    120
}

/// Snipe-IT inventory connector.
pub struct SnipeItConnector {
    config: SnipeItConfig,
    client: HttpClient,
}

impl SnipeItConnector {
    pub fn new(config: SnipeItConfig) -> ConnectorResult<Self> {
        let client = HttpClient::with_rate_limit(
            config.connector.clone(),
            Some(RateLimitConfig {
                max_requests: config.requests_per_minute,
                period: Duration::from_secs(60),
                burst_size: 10,
            }),
        )?;
        info!(
            "Inventory connector initialized for '{}'",
            config.connector.base_url
        );
        Ok(Self { config, client })
    }

    /// Converts one wire asset into the shared record type.
    ///
    /// Returns `None` (with a warning) when a row is missing the fields the
    /// sync cannot work without: serial, category, status, or a parseable
    /// modification time.
    fn parse_asset(raw: RawAsset) -> Option<InventoryAsset> {
        let serial = match raw.serial {
            Some(s) if !s.is_empty() => s,
            _ => {
                warn!(asset_id = raw.id, "skipping asset without a serial number");
                return None;
            }
        };
        let Some(category) = raw.category else {
            warn!(serial = %serial, "skipping asset without a category");
            return None;
        };
        let Some(status_label) = raw.status_label else {
            warn!(serial = %serial, "skipping asset without a status label");
            return None;
        };
        let updated_at = raw
            .updated_at
            .as_ref()
            .and_then(|ts| NaiveDateTime::parse_from_str(&ts.datetime, DATETIME_FORMAT).ok());
        let Some(updated_at) = updated_at else {
            warn!(serial = %serial, "skipping asset with an unparseable updated_at");
            return None;
        };

        Some(InventoryAsset {
            id: raw.id,
            serial,
            name: raw.name.unwrap_or_default(),
            asset_tag: raw.asset_tag,
            category,
            assigned_to: raw.assigned_to,
            company: raw.company,
            status_label,
            purchase_date: raw.purchase_date,
            purchase_cost: raw.purchase_cost.as_ref().and_then(scalar_to_string),
            order_number: raw.order_number.as_ref().and_then(scalar_to_string),
            warranty_expires: raw.warranty_expires,
            supplier: raw.supplier,
            custom_fields: parse_custom_fields(&raw.custom_fields),
            updated_at,
        })
    }
}

/// Renders a scalar JSON value as a string, treating null as absent.
fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

/// Flattens the custom-field block into name → nullable value.
///
/// The API serializes "no custom fields" as an empty array and a populated
/// block as an object of `{"FieldName": {"value": ...}}` entries. Keys are
/// trimmed here: the room field's key carries an incidental trailing space
/// in the source schema.
fn parse_custom_fields(value: &Value) -> HashMap<String, Option<String>> {
    let Some(object) = value.as_object() else {
        return HashMap::new();
    };
    object
        .iter()
        .map(|(key, field)| {
            let parsed = field.get("value").and_then(scalar_to_string);
            (key.trim().to_string(), parsed)
        })
        .collect()
}

#[async_trait]
impl Connector for SnipeItConnector {
    fn name(&self) -> &str {
        &self.config.connector.name
    }

    fn connector_type(&self) -> &str {
        "inventory"
    }

    async fn health_check(&self) -> ConnectorResult<ConnectorHealth> {
        match self.client.get("/api/v1/statuslabels?limit=1").await {
            Ok(r) if r.status().is_success() => Ok(ConnectorHealth::Healthy),
            Ok(r) if r.status().as_u16() == 401 => {
                Ok(ConnectorHealth::Unhealthy("Auth failed".into()))
            }
            Ok(_) => Ok(ConnectorHealth::Degraded("Unexpected response".into())),
            Err(ConnectorError::ConnectionFailed(e)) => Ok(ConnectorHealth::Unhealthy(format!(
                "Connection failed: {}",
                e
            ))),
            Err(e) => Ok(ConnectorHealth::Unhealthy(e.to_string())),
        }
    }

    async fn test_connection(&self) -> ConnectorResult<bool> {
        let r = self.client.get("/api/v1/statuslabels?limit=1").await?;
        Ok(r.status().is_success())
    }
}

#[async_trait]
impl InventoryClient for SnipeItConnector {
    #[instrument(skip(self))]
    async fn list_assets(
        &self,
        limit: usize,
        offset: usize,
        manufacturer_id: u64,
    ) -> ConnectorResult<Vec<InventoryAsset>> {
        let path = format!(
            "/api/v1/hardware?limit={}&offset={}&sort=updated_at&order=desc&manufacturer_id={}",
            limit, offset, manufacturer_id
        );
        let page: RawPage<RawAsset> = self.client.get_json(&path).await?;
        Ok(page
            .rows
            .into_iter()
            .filter_map(Self::parse_asset)
            .collect())
    }

    #[instrument(skip(self))]
    async fn find_asset(&self, term: &str) -> ConnectorResult<InventoryAsset> {
        let path = format!(
            "/api/v1/hardware?search={}&limit=1",
            urlencoding::encode(term)
        );
        let page: RawPage<RawAsset> = self.client.get_json(&path).await?;
        page.rows
            .into_iter()
            .filter_map(Self::parse_asset)
            .next()
            .ok_or_else(|| ConnectorError::NotFound(format!("No asset matches '{}'", term)))
    }

    async fn status_labels(&self) -> ConnectorResult<StatusLabelMap> {
        let page: RawPage<StatusLabel> = self
            .client
            .get_json("/api/v1/statuslabels?limit=500")
            .await?;
        Ok(StatusLabelMap::from_pairs(
            page.rows.into_iter().map(|label| (label.name, label.id)),
        ))
    }

    async fn custom_field_values(&self, field_id: u64) -> ConnectorResult<Vec<String>> {
        let path = format!("/api/v1/fields/{}", field_id);
        let field: RawFieldDefinition = self.client.get_json(&path).await?;
        Ok(field.field_values_array)
    }

    async fn companies(&self) -> ConnectorResult<Vec<String>> {
        let page: RawPage<NamedRef> = self.client.get_json("/api/v1/companies?limit=500").await?;
        Ok(page.rows.into_iter().map(|company| company.name).collect())
    }
}

/// Paged listing envelope: `{"total": n, "rows": [...]}`.
#[derive(Debug, Deserialize)]
struct RawPage<T> {
    #[serde(default)]
    rows: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAsset {
    id: u64,
    serial: Option<String>,
    name: Option<String>,
    asset_tag: Option<String>,
    category: Option<NamedRef>,
    assigned_to: Option<Assignee>,
    company: Option<NamedRef>,
    status_label: Option<StatusLabel>,
    purchase_date: Option<FormattedDate>,
    purchase_cost: Option<Value>,
    order_number: Option<Value>,
    warranty_expires: Option<FormattedDate>,
    supplier: Option<NamedRef>,
    #[serde(default)]
    custom_fields: Value,
    updated_at: Option<RawDateTime>,
}

#[derive(Debug, Deserialize)]
struct RawDateTime {
    datetime: String,
}

#[derive(Debug, Deserialize)]
struct RawFieldDefinition {
    #[serde(default)]
    field_values_array: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_connector_config;

    fn create_test_config() -> SnipeItConfig {
        SnipeItConfig {
            connector: test_connector_config("inventory-test", "https://inventory.example.edu"),
            requests_per_minute: default_requests_per_minute(),
        }
    }

    fn full_asset_json() -> Value {
        serde_json::json!({
            "id": 104,
            "serial": "C02XW0AAJG5H",
            "name": "HIDA-4121212",
            "asset_tag": null,
            "category": {"id": 3, "name": "Laptop"},
            "assigned_to": {"id": 17, "username": "jdoe", "name": "John Doe", "type": "user"},
            "company": {"id": 2, "name": "Design School"},
            "status_label": {"id": 2, "name": "Ready to Deploy"},
            "purchase_date": {"date": "2023-08-01", "formatted": "08/01/2023"},
            "purchase_cost": "1,299.00",
            "order_number": 44120,
            "warranty_expires": null,
            "supplier": {"id": 1, "name": "Apple"},
            "custom_fields": {
                "Building": {"field": "_snipeit_building_6", "value": "Music West"},
                "Room ": {"field": "_snipeit_room_7", "value": "201B"}
            },
            "updated_at": {"datetime": "2024-03-01 14:22:10", "formatted": "2024-03-01 2:22PM"}
        })
    }

    #[test]
    fn test_connector_creation() {
        assert!(SnipeItConnector::new(create_test_config()).is_ok());
    }

    #[test]
    fn test_connector_name_and_type() {
        let c = SnipeItConnector::new(create_test_config()).unwrap();
        assert_eq!(c.name(), "inventory-test");
        assert_eq!(c.connector_type(), "inventory");
    }

    #[test]
    fn test_parse_full_asset() {
        let raw: RawAsset = serde_json::from_value(full_asset_json()).unwrap();
        let asset = SnipeItConnector::parse_asset(raw).unwrap();

        assert_eq!(asset.serial, "C02XW0AAJG5H");
        assert_eq!(asset.name, "HIDA-4121212");
        assert_eq!(asset.asset_tag, None);
        assert_eq!(asset.category.name, "Laptop");
        assert_eq!(asset.status_label.id, 2);
        assert_eq!(asset.order_number.as_deref(), Some("44120"));
        assert_eq!(asset.purchase_cost.as_deref(), Some("1,299.00"));
        assert_eq!(
            asset.purchase_date.unwrap().formatted.as_deref(),
            Some("08/01/2023")
        );
        assert_eq!(
            asset.assigned_to,
            Some(Assignee::User {
                username: "jdoe".into(),
                name: "John Doe".into()
            })
        );
        assert_eq!(
            asset.updated_at,
            NaiveDateTime::parse_from_str("2024-03-01 14:22:10", DATETIME_FORMAT).unwrap()
        );
    }

    #[test]
    fn test_custom_field_keys_are_trimmed() {
        let raw: RawAsset = serde_json::from_value(full_asset_json()).unwrap();
        let asset = SnipeItConnector::parse_asset(raw).unwrap();

        // "Room " arrives with a trailing space; lookups use the trimmed key.
        assert_eq!(
            asset.custom_fields.get("Room").and_then(Clone::clone),
            Some("201B".to_string())
        );
        assert_eq!(
            asset.custom_fields.get("Building").and_then(Clone::clone),
            Some("Music West".to_string())
        );
    }

    #[test]
    fn test_empty_custom_fields_array() {
        let mut json = full_asset_json();
        json["custom_fields"] = serde_json::json!([]);
        let raw: RawAsset = serde_json::from_value(json).unwrap();
        let asset = SnipeItConnector::parse_asset(raw).unwrap();
        assert!(asset.custom_fields.is_empty());
    }

    #[test]
    fn test_null_custom_field_value() {
        let mut json = full_asset_json();
        json["custom_fields"] = serde_json::json!({"Building": {"value": null}});
        let raw: RawAsset = serde_json::from_value(json).unwrap();
        let asset = SnipeItConnector::parse_asset(raw).unwrap();
        assert_eq!(asset.custom_fields.get("Building"), Some(&None));
    }

    #[test]
    fn test_asset_without_serial_is_skipped() {
        let mut json = full_asset_json();
        json["serial"] = Value::Null;
        let raw: RawAsset = serde_json::from_value(json).unwrap();
        assert!(SnipeItConnector::parse_asset(raw).is_none());
    }

    #[test]
    fn test_asset_with_bad_timestamp_is_skipped() {
        let mut json = full_asset_json();
        json["updated_at"] = serde_json::json!({"datetime": "yesterday-ish"});
        let raw: RawAsset = serde_json::from_value(json).unwrap();
        assert!(SnipeItConnector::parse_asset(raw).is_none());
    }

    #[test]
    fn test_minimal_asset_with_nulls() {
        let json = serde_json::json!({
            "id": 9,
            "serial": "SER-9",
            "name": "LABROOM",
            "asset_tag": null,
            "category": {"id": 3, "name": "Laptop"},
            "assigned_to": null,
            "company": null,
            "status_label": {"id": 5, "name": "Archived"},
            "purchase_date": null,
            "purchase_cost": null,
            "order_number": null,
            "warranty_expires": null,
            "supplier": null,
            "custom_fields": [],
            "updated_at": {"datetime": "2024-01-05 08:00:00"}
        });
        let raw: RawAsset = serde_json::from_value(json).unwrap();
        let asset = SnipeItConnector::parse_asset(raw).unwrap();
        assert_eq!(asset.assigned_to, None);
        assert_eq!(asset.order_number, None);
        assert!(asset.custom_fields.is_empty());
    }
}
