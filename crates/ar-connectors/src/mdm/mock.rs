//! Mock MDM client for testing.

use crate::traits::{
    Connector, ConnectorError, ConnectorHealth, ConnectorResult, DeviceRecord, MdmClient,
    MdmUserProfile,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory MDM that records every upsert it receives.
///
/// Individual serials can be marked as failing to exercise the delivery
/// loop's retry ledger.
pub struct MockMdmClient {
    name: String,
    users: Arc<RwLock<HashMap<String, MdmUserProfile>>>,
    computers: Arc<RwLock<HashMap<String, DeviceRecord>>>,
    mobile_devices: Arc<RwLock<HashMap<String, DeviceRecord>>>,
    buildings: Arc<RwLock<Vec<String>>>,
    departments: Arc<RwLock<Vec<String>>>,
    failing_serials: Arc<RwLock<HashSet<String>>>,
}

impl MockMdmClient {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            users: Arc::new(RwLock::new(HashMap::new())),
            computers: Arc::new(RwLock::new(HashMap::new())),
            mobile_devices: Arc::new(RwLock::new(HashMap::new())),
            buildings: Arc::new(RwLock::new(Vec::new())),
            departments: Arc::new(RwLock::new(Vec::new())),
            failing_serials: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    pub fn with_sample_users(name: &str) -> Self {
        let mut users = HashMap::new();
        users.insert(
            "jdoe".to_string(),
            MdmUserProfile {
                username: "jdoe".into(),
                full_name: Some("John Doe".into()),
                email: Some("jdoe@mdm.example.edu".into()),
                phone: Some("480-555-0100".into()),
                position: Some("Lab Manager".into()),
            },
        );
        Self {
            users: Arc::new(RwLock::new(users)),
            ..Self::new(name)
        }
    }

    pub async fn add_user(&self, user: MdmUserProfile) {
        self.users.write().await.insert(user.username.clone(), user);
    }

    /// Makes deliveries for this serial fail with a transport error.
    pub async fn fail_serial(&self, serial: &str) {
        self.failing_serials.write().await.insert(serial.to_string());
    }

    /// Clears an injected failure.
    pub async fn heal_serial(&self, serial: &str) {
        self.failing_serials.write().await.remove(serial);
    }

    pub async fn add_building(&self, name: &str) {
        self.buildings.write().await.push(name.to_string());
    }

    pub async fn add_department(&self, name: &str) {
        self.departments.write().await.push(name.to_string());
    }

    /// The computer record last delivered for a serial, if any.
    pub async fn computer(&self, serial: &str) -> Option<DeviceRecord> {
        self.computers.read().await.get(serial).cloned()
    }

    /// The mobile-device record last delivered for a serial, if any.
    pub async fn mobile_device(&self, serial: &str) -> Option<DeviceRecord> {
        self.mobile_devices.read().await.get(serial).cloned()
    }

    pub async fn delivered_count(&self) -> usize {
        self.computers.read().await.len() + self.mobile_devices.read().await.len()
    }

    async fn check_failure(&self, serial: &str) -> ConnectorResult<()> {
        if self.failing_serials.read().await.contains(serial) {
            return Err(ConnectorError::ConnectionFailed(format!(
                "injected delivery failure for {}",
                serial
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for MockMdmClient {
    fn name(&self) -> &str {
        &self.name
    }
    fn connector_type(&self) -> &str {
        "mdm"
    }
    async fn health_check(&self) -> ConnectorResult<ConnectorHealth> {
        Ok(ConnectorHealth::Healthy)
    }
    async fn test_connection(&self) -> ConnectorResult<bool> {
        Ok(true)
    }
}

#[async_trait]
impl MdmClient for MockMdmClient {
    async fn user_by_username(&self, username: &str) -> ConnectorResult<MdmUserProfile> {
        self.users
            .read()
            .await
            .get(username)
            .cloned()
            .ok_or_else(|| ConnectorError::NotFound(format!("User not found: {}", username)))
    }

    async fn put_computer(&self, serial: &str, record: &DeviceRecord) -> ConnectorResult<()> {
        self.check_failure(serial).await?;
        self.computers
            .write()
            .await
            .insert(serial.to_string(), record.clone());
        Ok(())
    }

    async fn put_mobile_device(&self, serial: &str, record: &DeviceRecord) -> ConnectorResult<()> {
        self.check_failure(serial).await?;
        self.mobile_devices
            .write()
            .await
            .insert(serial.to_string(), record.clone());
        Ok(())
    }

    async fn building_names(&self) -> ConnectorResult<Vec<String>> {
        Ok(self.buildings.read().await.clone())
    }

    async fn create_building(&self, name: &str) -> ConnectorResult<()> {
        self.buildings.write().await.push(name.to_string());
        Ok(())
    }

    async fn department_names(&self) -> ConnectorResult<Vec<String>> {
        Ok(self.departments.read().await.clone())
    }

    async fn create_department(&self, name: &str) -> ConnectorResult<()> {
        self.departments.write().await.push(name.to_string());
        Ok(())
    }
}
