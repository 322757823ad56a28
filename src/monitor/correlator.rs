//! Tenant connectivity correlator.
//!
//! Reconciles each tenant's cached connectivity flag against the
//! observed state from the external feed.

use crate::db::{Alert, DbError, Severity, Store};
use crate::provider::{ConnectivityProvider, TenantConnectivity};

/// Run one correlation pass.
///
/// If the feed itself is unavailable the whole tick is skipped; it will
/// be retried on the next cadence. Per-tenant failures are isolated.
pub async fn run_correlation(provider: &dyn ConnectivityProvider, store: &Store) {
    let snapshot = match provider.snapshot().await {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!("Correlator: skipping tick, {}", e);
            return;
        }
    };

    for entry in snapshot {
        if let Err(e) = correlate_tenant(store, &entry) {
            tracing::error!(
                "Correlator: failed to reconcile tenant {}: {}",
                entry.tenant_id,
                e
            );
        }
    }
}

fn correlate_tenant(store: &Store, entry: &TenantConnectivity) -> Result<(), DbError> {
    let tenant = match store.tenant(entry.tenant_id) {
        Ok(t) => t,
        // Feed entries for tenants this platform does not know are ignored
        Err(DbError::NotFound) => return Ok(()),
        Err(e) => return Err(e),
    };

    let healthy = entry.connected && entry.authenticated;

    if tenant.channel_connected && !healthy {
        let alert = Alert::for_tenant(
            "external_channel_disconnected",
            tenant.id,
            Severity::Warning,
            format!("{} lost its messaging channel connection", tenant.company_name),
        );
        // A failed alert write must not block the flag reconciliation
        if let Err(e) = store.record_alert(&alert) {
            tracing::error!(
                "Correlator: failed to persist disconnect alert for {}: {}",
                tenant.company_name,
                e
            );
        }
    }

    if tenant.channel_connected != healthy {
        if healthy {
            tracing::info!("Correlator: {} channel reconnected", tenant.company_name);
        }
        store.set_tenant_connected(tenant.id, healthy)?;
    }

    Ok(())
}
