//! pulsewatch - operational health monitoring and uptime accounting.
//!
//! Probes a fixed set of platform services on a schedule, detects
//! sustained failure and raises alerts, reconciles each tenant's cached
//! messaging-channel connectivity against the observed feed, and tracks
//! per-tenant channel uptime over rolling windows.
//!
//! The engine has no wire protocol of its own; an embedding route layer
//! calls the query surface on [`Monitor`], [`UptimeTracker`] and
//! [`db::Store`].

pub mod config;
pub mod db;
pub mod history;
pub mod monitor;
pub mod probe;
pub mod provider;
pub mod uptime;

pub use config::MonitorConfig;
pub use db::{Alert, CheckResult, DbError, HealthState, Severity, Store, Tenant, UptimeRecord};
pub use history::HistoryStore;
pub use monitor::{Monitor, ServiceStatus};
pub use probe::{Endpoint, Prober, Target};
pub use provider::{
    ConnectivityProvider, ConnectivitySnapshot, HttpConnectivityProvider, ProviderError,
    TenantConnectivity,
};
pub use uptime::{UptimeTracker, Window};
