//! The sync command: building/department reconciliation followed by one
//! synchronization pass.

use crate::config::AppConfig;
use anyhow::Result;
use ar_connectors::{JamfConnector, SnipeItConnector};
use ar_core::{Reconciler, RetryLedger, SyncOptions, SyncOrchestrator, SyncReport};
use chrono::{Duration, Local};
use std::sync::Arc;
use tracing::info;

/// Effective parameters of a sync pass after flag/config merging.
#[derive(Debug, Clone)]
pub struct SyncInvocation {
    pub days: i64,
    pub hours: i64,
    pub skip_reconcile: bool,
    pub dry_run: bool,
}

impl SyncInvocation {
    /// Merges CLI overrides with configured defaults. A flag replaces its
    /// configured component entirely; absent flags fall back to the config.
    pub fn resolve(
        days: Option<i64>,
        hours: Option<i64>,
        skip_reconcile: bool,
        dry_run: bool,
        config: &AppConfig,
    ) -> Self {
        Self {
            days: days.unwrap_or(config.sync.lookback_days),
            hours: hours.unwrap_or(config.sync.lookback_hours),
            skip_reconcile,
            dry_run,
        }
    }

    /// The look-back window this invocation covers.
    pub fn window(&self) -> Duration {
        Duration::days(self.days) + Duration::hours(self.hours)
    }
}

/// Runs reconciliation and one sync pass against the configured systems.
pub async fn run_sync(invocation: SyncInvocation, config: AppConfig) -> Result<SyncReport> {
    let inventory = Arc::new(SnipeItConnector::new(
        config.inventory.to_connector_config(),
    )?);
    let mdm = Arc::new(JamfConnector::new(config.mdm.to_connector_config())?);

    if invocation.dry_run || invocation.skip_reconcile {
        info!("skipping building/department reconciliation");
    } else {
        let reconciler = Reconciler::new(
            inventory.clone(),
            mdm.clone(),
            config.sync.building_field_id,
        );

        info!("reconciling buildings");
        let buildings = reconciler.reconcile_buildings().await;
        info!(
            examined = buildings.examined,
            created = buildings.created,
            failed = buildings.failed,
            "buildings reconciled"
        );

        info!("reconciling departments");
        let departments = reconciler.reconcile_departments().await;
        info!(
            examined = departments.examined,
            created = departments.created,
            failed = departments.failed,
            "departments reconciled"
        );
    }

    let orchestrator = SyncOrchestrator::with_options(
        inventory,
        mdm,
        RetryLedger::new(&config.sync.ledger_path),
        SyncOptions {
            profile: config.mapping.clone(),
            fetch: config.sync.fetch.clone(),
            delivery_concurrency: config.sync.delivery_concurrency,
            dry_run: invocation.dry_run,
        },
    );

    let now = Local::now().naive_local();
    let report = orchestrator.run(now, invocation.window()).await?;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config_per_component() {
        let mut config = AppConfig::default();
        config.sync.lookback_days = 2;
        config.sync.lookback_hours = 12;

        let invocation = SyncInvocation::resolve(Some(1), None, false, false, &config);
        assert_eq!(invocation.days, 1);
        assert_eq!(invocation.hours, 12);

        let invocation = SyncInvocation::resolve(None, Some(3), false, false, &config);
        assert_eq!(invocation.days, 2);
        assert_eq!(invocation.hours, 3);
    }

    #[test]
    fn test_window_combines_days_and_hours() {
        let invocation = SyncInvocation {
            days: 1,
            hours: 6,
            skip_reconcile: false,
            dry_run: false,
        };
        assert_eq!(invocation.window(), Duration::hours(30));
    }
}
