//! Database model types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single health check against a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    /// Target responded with a success indicator within the timeout.
    Healthy,
    /// Target responded, but with a non-success indicator.
    Unhealthy,
    /// No response: connection error or timeout.
    Offline,
}

/// One immutable health check result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    pub time: DateTime<Utc>,
    pub status: HealthState,
    pub response_time_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Alert severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Severity {
        match s {
            "critical" => Severity::Critical,
            "warning" => Severity::Warning,
            _ => Severity::Info,
        }
    }
}

/// A persisted alert record.
///
/// Exactly one of `service_id` / `tenant_id` is set for scoped alerts;
/// both are `None` for system-wide ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: i64,
    pub alert_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<i64>,
    pub message: String,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
    pub acknowledged: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acknowledged_at: Option<DateTime<Utc>>,
}

impl Alert {
    fn new(alert_type: &str, severity: Severity, message: String) -> Self {
        Self {
            id: 0,
            alert_type: alert_type.to_string(),
            service_id: None,
            tenant_id: None,
            message,
            severity,
            created_at: Utc::now(),
            acknowledged: false,
            acknowledged_by: None,
            acknowledged_at: None,
        }
    }

    /// Alert scoped to a probed service.
    pub fn for_service(alert_type: &str, service_id: &str, severity: Severity, message: String) -> Self {
        Self {
            service_id: Some(service_id.to_string()),
            ..Self::new(alert_type, severity, message)
        }
    }

    /// Alert scoped to a tenant.
    pub fn for_tenant(alert_type: &str, tenant_id: i64, severity: Severity, message: String) -> Self {
        Self {
            tenant_id: Some(tenant_id),
            ..Self::new(alert_type, severity, message)
        }
    }

    /// System-wide alert, tied to neither a service nor a tenant.
    pub fn system_wide(alert_type: &str, severity: Severity, message: String) -> Self {
        Self::new(alert_type, severity, message)
    }
}

/// Up/down state of a tenant's external channel at snapshot time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelState {
    Up,
    Down,
}

impl ChannelState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Up => "up",
            ChannelState::Down => "down",
        }
    }

    pub fn parse(s: &str) -> ChannelState {
        if s == "up" {
            ChannelState::Up
        } else {
            ChannelState::Down
        }
    }
}

/// One timestamped connectivity snapshot for a tenant. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UptimeRecord {
    pub tenant_id: i64,
    pub service_type: String,
    pub status: ChannelState,
    pub recorded_at: DateTime<Utc>,
}

/// Lifecycle state of a tenant account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantStatus {
    Active,
    Inactive,
    Suspended,
}

impl TenantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TenantStatus::Active => "active",
            TenantStatus::Inactive => "inactive",
            TenantStatus::Suspended => "suspended",
        }
    }

    pub fn parse(s: &str) -> TenantStatus {
        match s {
            "active" => TenantStatus::Active,
            "suspended" => TenantStatus::Suspended,
            _ => TenantStatus::Inactive,
        }
    }
}

/// A tenant account as seen by this engine.
///
/// `channel_connected` is the cached connectivity flag the correlator
/// reconciles against observed state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: i64,
    pub company_name: String,
    pub status: TenantStatus,
    pub channel_connected: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alert_scope_constructors() {
        let a = Alert::for_service("service_down", "api", Severity::Critical, "msg".into());
        assert!(a.service_id.is_some() && a.tenant_id.is_none());

        let a = Alert::for_tenant("external_channel_disconnected", 7, Severity::Warning, "msg".into());
        assert!(a.service_id.is_none() && a.tenant_id == Some(7));

        let a = Alert::system_wide("maintenance", Severity::Info, "msg".into());
        assert!(a.service_id.is_none() && a.tenant_id.is_none());
        assert!(!a.acknowledged);
    }

    #[test]
    fn test_enum_round_trips() {
        assert_eq!(Severity::parse(Severity::Critical.as_str()), Severity::Critical);
        assert_eq!(ChannelState::parse("up"), ChannelState::Up);
        assert_eq!(ChannelState::parse("garbage"), ChannelState::Down);
        assert_eq!(TenantStatus::parse("suspended"), TenantStatus::Suspended);
    }
}
