//! Per-tenant uptime recording and reporting.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::db::{ChannelState, DbError, Store, UptimeRecord};

/// Service type stamped on snapshot rows written by this tracker.
pub const EXTERNAL_CHANNEL: &str = "external-channel";

/// Reporting window sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Window {
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl Window {
    pub fn parse(s: &str) -> Option<Window> {
        match s {
            "24h" => Some(Window::Day),
            "7d" => Some(Window::Week),
            "30d" => Some(Window::Month),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Window::Day => "24h",
            Window::Week => "7d",
            Window::Month => "30d",
        }
    }

    pub fn days(self) -> i64 {
        match self {
            Window::Day => 1,
            Window::Week => 7,
            Window::Month => 30,
        }
    }

    fn lower_bound(self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.days())
    }
}

/// Uptime percentage and check counts over one window.
#[derive(Debug, Clone, Serialize)]
pub struct UptimeSummary {
    pub percentage: f64,
    pub total_checks: i64,
    pub up_checks: i64,
    pub down_checks: i64,
}

/// One calendar-day bucket of a tenant's uptime history.
#[derive(Debug, Clone, Serialize)]
pub struct DailyUptime {
    pub date: NaiveDate,
    pub percentage: f64,
    pub total_checks: i64,
    pub up_checks: i64,
    pub down_checks: i64,
}

/// One tenant's uptime standing, for cross-tenant listings.
#[derive(Debug, Clone, Serialize)]
pub struct TenantUptime {
    pub tenant_id: i64,
    pub company_name: String,
    pub percentage: f64,
    pub total_checks: i64,
}

/// Down-snapshot count for one calendar day.
#[derive(Debug, Clone, Serialize)]
pub struct DayIncidents {
    pub date: String,
    pub count: i64,
}

/// A tenant ranked by recent down snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct ProblemTenant {
    pub tenant_id: i64,
    pub company_name: String,
    pub down_count: i64,
}

/// System-wide uptime bundle.
#[derive(Debug, Clone, Serialize)]
pub struct SystemMetrics {
    /// Cross-tenant uptime percentage over the last 24h.
    pub uptime_percentage: f64,
    pub total_checks: i64,
    pub active_tenants: i64,
    /// Down snapshots bucketed by day over the last 7 days.
    pub incidents_by_day: Vec<DayIncidents>,
    /// Top 5 tenants by down count over the last 24h. Tie order is
    /// implementation-defined but stable.
    pub problem_tenants: Vec<ProblemTenant>,
}

/// Full per-tenant report bundle.
#[derive(Debug, Clone, Serialize)]
pub struct UptimeReport {
    pub tenant_id: i64,
    pub company_name: String,
    pub period: Window,
    pub summary: UptimeSummary,
    pub daily: Vec<DailyUptime>,
    pub recent_incidents: Vec<UptimeRecord>,
}

/// Records connectivity snapshots and computes uptime reports.
pub struct UptimeTracker {
    store: Arc<Store>,
}

impl UptimeTracker {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    /// Snapshot every active tenant's cached connectivity flag as one
    /// uptime row. Runs on the snapshot cadence.
    ///
    /// Per-tenant write failures are logged and do not stop the pass.
    pub fn record_snapshots(&self) {
        let tenants = match self.store.active_tenants() {
            Ok(t) => t,
            Err(e) => {
                tracing::error!("UptimeTracker: failed to list active tenants: {}", e);
                return;
            }
        };

        let now = Utc::now();
        for tenant in tenants {
            let record = UptimeRecord {
                tenant_id: tenant.id,
                service_type: EXTERNAL_CHANNEL.to_string(),
                status: if tenant.channel_connected {
                    ChannelState::Up
                } else {
                    ChannelState::Down
                },
                recorded_at: now,
            };
            if let Err(e) = self.store.add_uptime_record(&record) {
                tracing::error!(
                    "UptimeTracker: failed to record snapshot for {}: {}",
                    tenant.company_name,
                    e
                );
            }
        }
    }

    /// Uptime percentage and counts for one tenant over a window.
    pub fn calculate_uptime(&self, tenant_id: i64, window: Window) -> Result<UptimeSummary, DbError> {
        let since = window.lower_bound(Utc::now());
        let (total, up) = self.store.uptime_counts(tenant_id, since)?;
        Ok(UptimeSummary {
            percentage: percentage(up, total),
            total_checks: total,
            up_checks: up,
            down_checks: total - up,
        })
    }

    /// Per-day uptime buckets for a tenant, ascending by date.
    pub fn daily_history(&self, tenant_id: i64, days: i64) -> Result<Vec<DailyUptime>, DbError> {
        let since = Utc::now() - Duration::days(days);
        let records = self.store.uptime_records_since(tenant_id, since)?;

        let mut buckets: BTreeMap<NaiveDate, (i64, i64)> = BTreeMap::new();
        for record in records {
            let entry = buckets.entry(record.recorded_at.date_naive()).or_insert((0, 0));
            entry.0 += 1;
            if record.status == ChannelState::Up {
                entry.1 += 1;
            }
        }

        Ok(buckets
            .into_iter()
            .map(|(date, (total, up))| DailyUptime {
                date,
                percentage: percentage(up, total),
                total_checks: total,
                up_checks: up,
                down_checks: total - up,
            })
            .collect())
    }

    /// All active tenants with their uptime over a window, worst first.
    pub fn all_tenants_uptime(&self, window: Window) -> Result<Vec<TenantUptime>, DbError> {
        let since = window.lower_bound(Utc::now());
        let mut listing = Vec::new();

        for tenant in self.store.active_tenants()? {
            let (total, up) = self.store.uptime_counts(tenant.id, since)?;
            listing.push(TenantUptime {
                tenant_id: tenant.id,
                company_name: tenant.company_name,
                percentage: percentage(up, total),
                total_checks: total,
            });
        }

        // Stable sort keeps directory order among equal percentages
        listing.sort_by(|a, b| {
            a.percentage
                .partial_cmp(&b.percentage)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(listing)
    }

    /// System-wide uptime bundle: 24h percentage, active tenant count,
    /// 7-day incident buckets and the most problematic tenants.
    pub fn system_metrics(&self) -> Result<SystemMetrics, DbError> {
        let now = Utc::now();
        let day_ago = now - Duration::hours(24);

        let (total, up) = self.store.system_uptime_counts(day_ago)?;
        let incidents_by_day = self
            .store
            .down_counts_by_day(now - Duration::days(7))?
            .into_iter()
            .map(|(date, count)| DayIncidents { date, count })
            .collect();
        let problem_tenants = self
            .store
            .top_down_tenants(day_ago, 5)?
            .into_iter()
            .map(|(tenant_id, company_name, down_count)| ProblemTenant {
                tenant_id,
                company_name,
                down_count,
            })
            .collect();

        Ok(SystemMetrics {
            uptime_percentage: percentage(up, total),
            total_checks: total,
            active_tenants: self.store.count_active_tenants()?,
            incidents_by_day,
            problem_tenants,
        })
    }

    /// Full report bundle for one tenant. `NotFound` for unknown tenants.
    pub fn report(&self, tenant_id: i64, period: Window) -> Result<UptimeReport, DbError> {
        let tenant = self.store.tenant(tenant_id)?;
        let summary = self.calculate_uptime(tenant_id, period)?;
        let daily = self.daily_history(tenant_id, period.days())?;
        let recent_incidents = self.store.recent_down_events(tenant_id, 10)?;

        Ok(UptimeReport {
            tenant_id,
            company_name: tenant.company_name,
            period,
            summary,
            daily,
            recent_incidents,
        })
    }

    /// Delete snapshots older than `days_to_keep` days. Operator-triggered
    /// maintenance, not part of the scheduled loops.
    pub fn prune(&self, days_to_keep: i64) -> Result<usize, DbError> {
        let cutoff = Utc::now() - Duration::days(days_to_keep);
        let deleted = self.store.delete_uptime_records_before(cutoff)?;
        tracing::info!(
            "UptimeTracker: pruned {} uptime records older than {} days",
            deleted,
            days_to_keep
        );
        Ok(deleted)
    }
}

/// A tenant with no snapshots in the window reports 100% by convention:
/// absence of evidence of downtime is not counted as downtime.
fn percentage(up: i64, total: i64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    (up as f64 / total as f64 * 10000.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Tenant, TenantStatus};
    use chrono::TimeZone;
    use tempfile::NamedTempFile;

    fn tracker() -> (NamedTempFile, Arc<Store>, UptimeTracker) {
        let tmp = NamedTempFile::new().unwrap();
        let store = Arc::new(Store::new(tmp.path()).unwrap());
        let tracker = UptimeTracker::new(store.clone());
        (tmp, store, tracker)
    }

    fn seed_tenant(store: &Store, id: i64, status: TenantStatus, connected: bool) {
        store
            .upsert_tenant(&Tenant {
                id,
                company_name: format!("Tenant {}", id),
                status,
                channel_connected: connected,
            })
            .unwrap();
    }

    fn add_record(store: &Store, tenant_id: i64, status: ChannelState, minutes_ago: i64) {
        add_record_at(store, tenant_id, status, Utc::now() - Duration::minutes(minutes_ago));
    }

    fn add_record_at(store: &Store, tenant_id: i64, status: ChannelState, at: DateTime<Utc>) {
        store
            .add_uptime_record(&UptimeRecord {
                tenant_id,
                service_type: EXTERNAL_CHANNEL.to_string(),
                status,
                recorded_at: at,
            })
            .unwrap();
    }

    #[test]
    fn test_window_parse() {
        assert_eq!(Window::parse("24h"), Some(Window::Day));
        assert_eq!(Window::parse("7d"), Some(Window::Week));
        assert_eq!(Window::parse("30d"), Some(Window::Month));
        assert_eq!(Window::parse("1y"), None);
        assert_eq!(Window::Month.as_str(), "30d");
    }

    #[test]
    fn test_uptime_percentage() {
        let (_tmp, store, tracker) = tracker();

        for i in 0..8 {
            add_record(&store, 1, ChannelState::Up, i * 5);
        }
        add_record(&store, 1, ChannelState::Down, 45);
        add_record(&store, 1, ChannelState::Down, 50);

        let summary = tracker.calculate_uptime(1, Window::Day).unwrap();
        assert_eq!(summary.percentage, 80.0);
        assert_eq!(summary.total_checks, 10);
        assert_eq!(summary.up_checks, 8);
        assert_eq!(summary.down_checks, 2);
    }

    #[test]
    fn test_no_records_reports_full_uptime() {
        let (_tmp, _store, tracker) = tracker();
        let summary = tracker.calculate_uptime(1, Window::Day).unwrap();
        assert_eq!(summary.percentage, 100.0);
        assert_eq!(summary.total_checks, 0);
    }

    #[test]
    fn test_down_record_never_raises_percentage() {
        let (_tmp, store, tracker) = tracker();

        add_record(&store, 1, ChannelState::Up, 10);
        let before = tracker.calculate_uptime(1, Window::Day).unwrap().percentage;

        add_record(&store, 1, ChannelState::Down, 5);
        let after = tracker.calculate_uptime(1, Window::Day).unwrap().percentage;
        assert!(after <= before);

        // Idempotent with no new records
        let again = tracker.calculate_uptime(1, Window::Day).unwrap().percentage;
        assert_eq!(after, again);
    }

    #[test]
    fn test_record_snapshots_covers_active_tenants_only() {
        let (_tmp, store, tracker) = tracker();

        seed_tenant(&store, 1, TenantStatus::Active, true);
        seed_tenant(&store, 2, TenantStatus::Active, false);
        seed_tenant(&store, 3, TenantStatus::Suspended, true);

        tracker.record_snapshots();

        let up = tracker.calculate_uptime(1, Window::Day).unwrap();
        assert_eq!((up.total_checks, up.up_checks), (1, 1));

        let down = tracker.calculate_uptime(2, Window::Day).unwrap();
        assert_eq!((down.total_checks, down.down_checks), (1, 1));

        // Suspended tenant gets no snapshot
        let none = tracker.calculate_uptime(3, Window::Day).unwrap();
        assert_eq!(none.total_checks, 0);
    }

    #[test]
    fn test_daily_history_buckets_ascending() {
        let (_tmp, store, tracker) = tracker();

        let at = |date: NaiveDate, hour: u32| {
            Utc.from_utc_datetime(&date.and_hms_opt(hour, 0, 0).unwrap())
        };
        let today = Utc::now().date_naive();
        let yesterday = today - Duration::days(1);

        // Yesterday: 1 up, 1 down; today: 2 up
        add_record_at(&store, 1, ChannelState::Up, at(yesterday, 8));
        add_record_at(&store, 1, ChannelState::Down, at(yesterday, 9));
        add_record_at(&store, 1, ChannelState::Up, at(today, 0));
        add_record_at(&store, 1, ChannelState::Up, at(today, 0));

        let daily = tracker.daily_history(1, 7).unwrap();
        assert_eq!(daily.len(), 2);
        assert!(daily[0].date < daily[1].date);
        assert_eq!(daily[0].percentage, 50.0);
        assert_eq!(daily[1].percentage, 100.0);
        assert_eq!(daily[1].total_checks, 2);
    }

    #[test]
    fn test_all_tenants_uptime_worst_first() {
        let (_tmp, store, tracker) = tracker();

        seed_tenant(&store, 1, TenantStatus::Active, true);
        seed_tenant(&store, 2, TenantStatus::Active, true);
        add_record(&store, 1, ChannelState::Up, 5);
        add_record(&store, 2, ChannelState::Down, 5);

        let listing = tracker.all_tenants_uptime(Window::Day).unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing[0].tenant_id, 2);
        assert_eq!(listing[0].percentage, 0.0);
        assert_eq!(listing[1].percentage, 100.0);
    }

    #[test]
    fn test_report_bundles_and_not_found() {
        let (_tmp, store, tracker) = tracker();

        seed_tenant(&store, 1, TenantStatus::Active, true);
        for i in 0..15 {
            add_record(&store, 1, ChannelState::Down, i * 3);
        }

        let report = tracker.report(1, Window::Week).unwrap();
        assert_eq!(report.company_name, "Tenant 1");
        assert_eq!(report.summary.down_checks, 15);
        assert_eq!(report.recent_incidents.len(), 10);
        assert!(!report.daily.is_empty());

        assert!(matches!(
            tracker.report(42, Window::Week),
            Err(DbError::NotFound)
        ));
    }

    #[test]
    fn test_system_metrics() {
        let (_tmp, store, tracker) = tracker();

        seed_tenant(&store, 1, TenantStatus::Active, true);
        seed_tenant(&store, 2, TenantStatus::Active, false);
        add_record(&store, 1, ChannelState::Up, 5);
        add_record(&store, 2, ChannelState::Down, 5);
        add_record(&store, 2, ChannelState::Down, 10);

        let metrics = tracker.system_metrics().unwrap();
        assert_eq!(metrics.active_tenants, 2);
        assert_eq!(metrics.total_checks, 3);
        assert_eq!(metrics.uptime_percentage, 33.33);
        assert_eq!(metrics.problem_tenants.len(), 1);
        assert_eq!(metrics.problem_tenants[0].tenant_id, 2);
        assert_eq!(metrics.problem_tenants[0].down_count, 2);
        assert!(!metrics.incidents_by_day.is_empty());
    }

    #[test]
    fn test_prune_runs_twice_without_change() {
        let (_tmp, store, tracker) = tracker();

        add_record(&store, 1, ChannelState::Up, 5);
        store
            .add_uptime_record(&UptimeRecord {
                tenant_id: 1,
                service_type: EXTERNAL_CHANNEL.to_string(),
                status: ChannelState::Up,
                recorded_at: Utc::now() - Duration::days(120),
            })
            .unwrap();

        assert_eq!(tracker.prune(90).unwrap(), 1);
        assert_eq!(tracker.prune(90).unwrap(), 0);
    }
}
