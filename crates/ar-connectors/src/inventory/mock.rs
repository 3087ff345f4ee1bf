//! Mock inventory client for testing.

use crate::traits::{
    Connector, ConnectorError, ConnectorHealth, ConnectorResult, InventoryAsset, InventoryClient,
    StatusLabelMap,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory inventory backed by a plain asset list.
///
/// `list_assets` serves pages from the stored assets sorted by `updated_at`
/// descending, mirroring the real API's ordering contract. A transport
/// failure can be injected at a specific page offset to exercise the
/// fetcher's partial-result policy.
pub struct MockInventoryClient {
    name: String,
    assets: Arc<RwLock<Vec<InventoryAsset>>>,
    status_labels: Arc<RwLock<StatusLabelMap>>,
    field_values: Arc<RwLock<HashMap<u64, Vec<String>>>>,
    companies: Arc<RwLock<Vec<String>>>,
    fail_at_offset: Arc<RwLock<Option<usize>>>,
}

impl MockInventoryClient {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            assets: Arc::new(RwLock::new(Vec::new())),
            status_labels: Arc::new(RwLock::new(StatusLabelMap::default())),
            field_values: Arc::new(RwLock::new(HashMap::new())),
            companies: Arc::new(RwLock::new(Vec::new())),
            fail_at_offset: Arc::new(RwLock::new(None)),
        }
    }

    pub async fn add_asset(&self, asset: InventoryAsset) {
        self.assets.write().await.push(asset);
    }

    pub async fn set_status_labels(&self, labels: StatusLabelMap) {
        *self.status_labels.write().await = labels;
    }

    pub async fn set_field_values(&self, field_id: u64, values: Vec<String>) {
        self.field_values.write().await.insert(field_id, values);
    }

    pub async fn set_companies(&self, companies: Vec<String>) {
        *self.companies.write().await = companies;
    }

    /// Makes `list_assets` fail with a connection error when called at the
    /// given offset.
    pub async fn fail_at_offset(&self, offset: usize) {
        *self.fail_at_offset.write().await = Some(offset);
    }
}

#[async_trait]
impl Connector for MockInventoryClient {
    fn name(&self) -> &str {
        &self.name
    }
    fn connector_type(&self) -> &str {
        "inventory"
    }
    async fn health_check(&self) -> ConnectorResult<ConnectorHealth> {
        Ok(ConnectorHealth::Healthy)
    }
    async fn test_connection(&self) -> ConnectorResult<bool> {
        Ok(true)
    }
}

#[async_trait]
impl InventoryClient for MockInventoryClient {
    async fn list_assets(
        &self,
        limit: usize,
        offset: usize,
        _manufacturer_id: u64,
    ) -> ConnectorResult<Vec<InventoryAsset>> {
        if *self.fail_at_offset.read().await == Some(offset) {
            return Err(ConnectorError::ConnectionFailed(
                "injected listing failure".into(),
            ));
        }

        let mut sorted = self.assets.read().await.clone();
        sorted.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sorted.into_iter().skip(offset).take(limit).collect())
    }

    async fn find_asset(&self, term: &str) -> ConnectorResult<InventoryAsset> {
        let assets = self.assets.read().await;
        assets
            .iter()
            .find(|a| a.serial == term || a.name == term)
            .cloned()
            .ok_or_else(|| ConnectorError::NotFound(format!("No asset matches '{}'", term)))
    }

    async fn status_labels(&self) -> ConnectorResult<StatusLabelMap> {
        let labels = self.status_labels.read().await;
        if labels.is_empty() {
            return Err(ConnectorError::InvalidResponse(
                "no status labels configured".into(),
            ));
        }
        Ok(labels.clone())
    }

    async fn custom_field_values(&self, field_id: u64) -> ConnectorResult<Vec<String>> {
        Ok(self
            .field_values
            .read()
            .await
            .get(&field_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn companies(&self) -> ConnectorResult<Vec<String>> {
        Ok(self.companies.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_asset;
    use chrono::NaiveDate;

    fn at(day: u32, hour: u32) -> chrono::NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[tokio::test]
    async fn test_pages_are_sorted_descending() {
        let mock = MockInventoryClient::new("inv");
        mock.add_asset(sample_asset("A", "HOST-1", at(1, 9))).await;
        mock.add_asset(sample_asset("B", "HOST-2", at(3, 9))).await;
        mock.add_asset(sample_asset("C", "HOST-3", at(2, 9))).await;

        let page = mock.list_assets(10, 0, 1).await.unwrap();
        let serials: Vec<_> = page.iter().map(|a| a.serial.as_str()).collect();
        assert_eq!(serials, vec!["B", "C", "A"]);
    }

    #[tokio::test]
    async fn test_offset_paging() {
        let mock = MockInventoryClient::new("inv");
        for (i, day) in [1u32, 2, 3, 4, 5].iter().enumerate() {
            mock.add_asset(sample_asset(&format!("S{}", i), "HOST", at(*day, 0)))
                .await;
        }

        let first = mock.list_assets(2, 0, 1).await.unwrap();
        let second = mock.list_assets(2, 2, 1).await.unwrap();
        let third = mock.list_assets(2, 4, 1).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.len(), 2);
        assert_eq!(third.len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let mock = MockInventoryClient::new("inv");
        mock.add_asset(sample_asset("A", "HOST-1", at(1, 0))).await;
        mock.fail_at_offset(0).await;
        assert!(matches!(
            mock.list_assets(10, 0, 1).await,
            Err(ConnectorError::ConnectionFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_find_asset_not_found() {
        let mock = MockInventoryClient::new("inv");
        assert!(matches!(
            mock.find_asset("nope").await,
            Err(ConnectorError::NotFound(_))
        ));
    }
}
