//! Create-if-missing reconciliation of buildings and departments.
//!
//! Before a sync pass, the MDM's building and department lists are topped up
//! from the inventory so that mapped records never reference a name the MDM
//! has not heard of. Comparison is case-insensitive; nothing is ever renamed
//! or deleted. Every error here is logged and skipped; reconciliation can
//! only improve a pass, never block one.

use ar_connectors::traits::{InventoryClient, MdmClient};
use std::sync::Arc;
use tracing::{info, warn};

/// Outcome counts for one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Names examined on the inventory side.
    pub examined: usize,
    /// Names created in the MDM.
    pub created: usize,
    /// Creations that failed (logged and skipped).
    pub failed: usize,
}

/// Reconciles inventory-side name lists into the MDM.
pub struct Reconciler {
    inventory: Arc<dyn InventoryClient>,
    mdm: Arc<dyn MdmClient>,
    /// Custom field definition holding the building list.
    building_field_id: u64,
}

impl Reconciler {
    pub fn new(
        inventory: Arc<dyn InventoryClient>,
        mdm: Arc<dyn MdmClient>,
        building_field_id: u64,
    ) -> Self {
        Self {
            inventory,
            mdm,
            building_field_id,
        }
    }

    /// Creates MDM buildings for inventory building values the MDM lacks.
    pub async fn reconcile_buildings(&self) -> ReconcileSummary {
        let inventory_names = match self
            .inventory
            .custom_field_values(self.building_field_id)
            .await
        {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "could not list inventory buildings; skipping reconciliation");
                return ReconcileSummary::default();
            }
        };
        let mdm_names = match self.mdm.building_names().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "could not list MDM buildings; skipping reconciliation");
                return ReconcileSummary::default();
            }
        };

        let mut summary = ReconcileSummary {
            examined: inventory_names.len(),
            ..ReconcileSummary::default()
        };
        for name in missing_names(&inventory_names, &mdm_names) {
            info!(building = %name, "building not in MDM, creating");
            match self.mdm.create_building(&name).await {
                Ok(()) => summary.created += 1,
                Err(e) => {
                    warn!(building = %name, error = %e, "could not create building");
                    summary.failed += 1;
                }
            }
        }
        summary
    }

    /// Creates MDM departments for inventory companies the MDM lacks.
    pub async fn reconcile_departments(&self) -> ReconcileSummary {
        let inventory_names = match self.inventory.companies().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "could not list inventory companies; skipping reconciliation");
                return ReconcileSummary::default();
            }
        };
        let mdm_names = match self.mdm.department_names().await {
            Ok(names) => names,
            Err(e) => {
                warn!(error = %e, "could not list MDM departments; skipping reconciliation");
                return ReconcileSummary::default();
            }
        };

        let mut summary = ReconcileSummary {
            examined: inventory_names.len(),
            ..ReconcileSummary::default()
        };
        for name in missing_names(&inventory_names, &mdm_names) {
            info!(department = %name, "department not in MDM, creating");
            match self.mdm.create_department(&name).await {
                Ok(()) => summary.created += 1,
                Err(e) => {
                    warn!(department = %name, error = %e, "could not create department");
                    summary.failed += 1;
                }
            }
        }
        summary
    }
}

/// Names present on the inventory side but not in the MDM, compared
/// case-insensitively. Original casing is preserved for creation.
fn missing_names(inventory: &[String], mdm: &[String]) -> Vec<String> {
    let known: std::collections::HashSet<String> =
        mdm.iter().map(|n| n.to_lowercase()).collect();
    inventory
        .iter()
        .filter(|name| !known.contains(&name.to_lowercase()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ar_connectors::inventory::MockInventoryClient;
    use ar_connectors::mdm::MockMdmClient;

    const BUILDING_FIELD: u64 = 6;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[tokio::test]
    async fn test_missing_buildings_are_created() {
        let inventory = Arc::new(MockInventoryClient::new("inv"));
        inventory
            .set_field_values(BUILDING_FIELD, strings(&["Music West", "Design North"]))
            .await;
        let mdm = Arc::new(MockMdmClient::new("mdm"));
        mdm.add_building("Music West").await;

        let summary = Reconciler::new(inventory, mdm.clone(), BUILDING_FIELD)
            .reconcile_buildings()
            .await;

        assert_eq!(summary.examined, 2);
        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 0);
        assert!(mdm
            .building_names()
            .await
            .unwrap()
            .contains(&"Design North".to_string()));
    }

    #[tokio::test]
    async fn test_comparison_is_case_insensitive() {
        let inventory = Arc::new(MockInventoryClient::new("inv"));
        inventory
            .set_field_values(BUILDING_FIELD, strings(&["MUSIC WEST"]))
            .await;
        let mdm = Arc::new(MockMdmClient::new("mdm"));
        mdm.add_building("Music West").await;

        let summary = Reconciler::new(inventory, mdm, BUILDING_FIELD)
            .reconcile_buildings()
            .await;
        assert_eq!(summary.created, 0);
    }

    #[tokio::test]
    async fn test_departments_come_from_companies() {
        let inventory = Arc::new(MockInventoryClient::new("inv"));
        inventory.set_companies(strings(&["Design School"])).await;
        let mdm = Arc::new(MockMdmClient::new("mdm"));

        let summary = Reconciler::new(inventory, mdm.clone(), BUILDING_FIELD)
            .reconcile_departments()
            .await;

        assert_eq!(summary.created, 1);
        assert_eq!(
            mdm.department_names().await.unwrap(),
            strings(&["Design School"])
        );
    }

    #[tokio::test]
    async fn test_empty_inventory_side_is_a_no_op() {
        let inventory = Arc::new(MockInventoryClient::new("inv"));
        let mdm = Arc::new(MockMdmClient::new("mdm"));

        let summary = Reconciler::new(inventory, mdm, BUILDING_FIELD)
            .reconcile_buildings()
            .await;
        assert_eq!(summary, ReconcileSummary::default());
    }
}
