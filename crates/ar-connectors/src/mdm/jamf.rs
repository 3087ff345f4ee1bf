//! Jamf MDM connector.
//!
//! Speaks the classic JSSResource API: user lookups by name, serial-keyed
//! computer and mobile-device upserts, and building/department management.

use crate::http::HttpClient;
use crate::traits::{
    Connector, ConnectorConfig, ConnectorError, ConnectorHealth, ConnectorResult, DeviceRecord,
    MdmClient, MdmUserProfile,
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, instrument};

/// Jamf MDM connector.
pub struct JamfConnector {
    config: ConnectorConfig,
    client: HttpClient,
}

impl JamfConnector {
    pub fn new(config: ConnectorConfig) -> ConnectorResult<Self> {
        let client = HttpClient::new(config.clone())?;
        info!("MDM connector initialized for '{}'", config.base_url);
        Ok(Self { config, client })
    }

    fn parse_user(user: RawUser) -> MdmUserProfile {
        MdmUserProfile {
            username: user.name,
            full_name: non_empty(user.full_name),
            email: non_empty(user.email_address),
            phone: non_empty(user.phone_number),
            position: non_empty(user.position),
        }
    }
}

/// Treats the API's empty strings as absent values.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.is_empty())
}

#[async_trait]
impl Connector for JamfConnector {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn connector_type(&self) -> &str {
        "mdm"
    }

    async fn health_check(&self) -> ConnectorResult<ConnectorHealth> {
        match self.client.get("/JSSResource/buildings").await {
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
        let r = self.client.get("/JSSResource/buildings").await?;
        Ok(r.status().is_success())
    }
}

#[async_trait]
impl MdmClient for JamfConnector {
    #[instrument(skip(self))]
    async fn user_by_username(&self, username: &str) -> ConnectorResult<MdmUserProfile> {
        let path = format!(
            "/JSSResource/users/name/{}",
            urlencoding::encode(username)
        );
        let envelope: RawUserEnvelope = self.client.get_json(&path).await?;
        Ok(Self::parse_user(envelope.user))
    }

    #[instrument(skip(self, record))]
    async fn put_computer(&self, serial: &str, record: &DeviceRecord) -> ConnectorResult<()> {
        let path = format!(
            "/JSSResource/computers/serialnumber/{}",
            urlencoding::encode(serial)
        );
        self.client.put(&path, record).await?;
        Ok(())
    }

    #[instrument(skip(self, record))]
    async fn put_mobile_device(&self, serial: &str, record: &DeviceRecord) -> ConnectorResult<()> {
        let path = format!(
            "/JSSResource/mobiledevices/serialnumber/{}",
            urlencoding::encode(serial)
        );
        self.client.put(&path, record).await?;
        Ok(())
    }

    async fn building_names(&self) -> ConnectorResult<Vec<String>> {
        let envelope: RawBuildings = self.client.get_json("/JSSResource/buildings").await?;
        Ok(envelope.buildings.into_iter().map(|b| b.name).collect())
    }

    async fn create_building(&self, name: &str) -> ConnectorResult<()> {
        let body = serde_json::json!({"building": {"name": name}});
        self.client.post("/JSSResource/buildings", &body).await?;
        Ok(())
    }

    async fn department_names(&self) -> ConnectorResult<Vec<String>> {
        let envelope: RawDepartments = self.client.get_json("/JSSResource/departments").await?;
        Ok(envelope.departments.into_iter().map(|d| d.name).collect())
    }

    async fn create_department(&self, name: &str) -> ConnectorResult<()> {
        let body = serde_json::json!({"department": {"name": name}});
        self.client.post("/JSSResource/departments", &body).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RawUserEnvelope {
    user: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    name: String,
    full_name: Option<String>,
    email_address: Option<String>,
    phone_number: Option<String>,
    position: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawNamed {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawBuildings {
    #[serde(default)]
    buildings: Vec<RawNamed>,
}

#[derive(Debug, Deserialize)]
struct RawDepartments {
    #[serde(default)]
    departments: Vec<RawNamed>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_connector_config;

    #[test]
    fn test_connector_creation() {
        let c = JamfConnector::new(test_connector_config("mdm-test", "https://mdm.example.edu"));
        assert!(c.is_ok());
    }

    #[test]
    fn test_connector_name_and_type() {
        let c =
            JamfConnector::new(test_connector_config("mdm-test", "https://mdm.example.edu"))
                .unwrap();
        assert_eq!(c.name(), "mdm-test");
        assert_eq!(c.connector_type(), "mdm");
    }

    #[test]
    fn test_parse_user() {
        let raw: RawUserEnvelope = serde_json::from_value(serde_json::json!({
            "user": {
                "id": 88,
                "name": "jdoe",
                "full_name": "John Doe",
                "email_address": "jdoe@mdm.example.edu",
                "phone_number": "480-555-0100",
                "position": "Lab Manager"
            }
        }))
        .unwrap();

        let user = JamfConnector::parse_user(raw.user);
        assert_eq!(user.username, "jdoe");
        assert_eq!(user.full_name.as_deref(), Some("John Doe"));
        assert_eq!(user.phone.as_deref(), Some("480-555-0100"));
    }

    #[test]
    fn test_parse_user_blank_fields_become_none() {
        let raw = RawUser {
            name: "jdoe".into(),
            full_name: Some(String::new()),
            email_address: None,
            phone_number: Some(String::new()),
            position: None,
        };
        let user = JamfConnector::parse_user(raw);
        assert_eq!(user.full_name, None);
        assert_eq!(user.phone, None);
        assert_eq!(user.position, None);
    }
}
