//! SQLite database store implementation.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use super::models::*;

/// Database error types.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Migration error: {0}")]
    Migration(String),
    #[error("Not found")]
    NotFound,
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.9f";

fn fmt_time(t: DateTime<Utc>) -> String {
    t.format(TIME_FORMAT).to_string()
}

/// Thread-safe database store.
///
/// Holds alerts, per-tenant uptime records and the tenant directory.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Create a new store with the given database path.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.init()?;
        Ok(store)
    }

    /// Initialize the database with migrations.
    fn init(&self) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(include_str!("../../migrations/000001_init.up.sql"))
            .map_err(|e| DbError::Migration(format!("Migration 1 failed: {}", e)))?;
        Ok(())
    }

    /// Lightweight connectivity check, used by the relational-store probe.
    pub fn ping(&self) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row("SELECT 1", [], |_| Ok(()))?;
        Ok(())
    }

    // --- Alerts ---

    /// Persist an alert and return its ID.
    pub fn record_alert(&self, alert: &Alert) -> Result<i64, DbError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO alerts (alert_type, service_id, tenant_id, message, severity, created_at, acknowledged)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
            params![
                alert.alert_type,
                alert.service_id,
                alert.tenant_id,
                alert.message,
                alert.severity.as_str(),
                fmt_time(alert.created_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Mark an alert acknowledged by the given user.
    pub fn acknowledge_alert(&self, id: i64, user: &str) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE alerts SET acknowledged=1, acknowledged_by=?1, acknowledged_at=?2 WHERE id=?3",
            params![user, fmt_time(Utc::now()), id],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }

    /// Get the most recent alerts, newest first.
    pub fn recent_alerts(&self, limit: i64) -> Result<Vec<Alert>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, alert_type, service_id, tenant_id, message, severity, created_at,
                    acknowledged, acknowledged_by, acknowledged_at
             FROM alerts ORDER BY created_at DESC, id DESC LIMIT ?1",
        )?;

        let alerts = stmt
            .query_map(params![limit], row_to_alert)?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(alerts)
    }

    /// Count alerts that have not been acknowledged yet.
    pub fn unacknowledged_alert_count(&self) -> Result<i64, DbError> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM alerts WHERE acknowledged = 0",
            [],
            |r| r.get(0),
        )?)
    }

    // --- Uptime records ---

    /// Append one uptime snapshot row.
    pub fn add_uptime_record(&self, record: &UptimeRecord) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO uptime_records (tenant_id, service_type, status, recorded_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                record.tenant_id,
                record.service_type,
                record.status.as_str(),
                fmt_time(record.recorded_at),
            ],
        )?;
        Ok(())
    }

    /// Total and up counts for one tenant since the given time.
    pub fn uptime_counts(&self, tenant_id: i64, since: DateTime<Utc>) -> Result<(i64, i64), DbError> {
        let conn = self.conn.lock().unwrap();
        let counts = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = 'up' THEN 1 ELSE 0 END), 0)
             FROM uptime_records WHERE tenant_id = ?1 AND recorded_at >= ?2",
            params![tenant_id, fmt_time(since)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }

    /// All uptime rows for a tenant since the given time, ascending.
    pub fn uptime_records_since(
        &self,
        tenant_id: i64,
        since: DateTime<Utc>,
    ) -> Result<Vec<UptimeRecord>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT tenant_id, service_type, status, recorded_at FROM uptime_records
             WHERE tenant_id = ?1 AND recorded_at >= ?2 ORDER BY recorded_at ASC",
        )?;

        let records = stmt
            .query_map(params![tenant_id, fmt_time(since)], row_to_uptime_record)?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(records)
    }

    /// Total and up counts across all tenants since the given time.
    pub fn system_uptime_counts(&self, since: DateTime<Utc>) -> Result<(i64, i64), DbError> {
        let conn = self.conn.lock().unwrap();
        let counts = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(CASE WHEN status = 'up' THEN 1 ELSE 0 END), 0)
             FROM uptime_records WHERE recorded_at >= ?1",
            params![fmt_time(since)],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }

    /// Down-snapshot counts bucketed by calendar date, ascending.
    pub fn down_counts_by_day(&self, since: DateTime<Utc>) -> Result<Vec<(String, i64)>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT substr(recorded_at, 1, 10) AS day, COUNT(*) FROM uptime_records
             WHERE status = 'down' AND recorded_at >= ?1 GROUP BY day ORDER BY day ASC",
        )?;

        let rows = stmt
            .query_map(params![fmt_time(since)], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(rows)
    }

    /// Tenants with the most down snapshots since the given time.
    ///
    /// Tie order among equal counts is whatever SQLite returns; callers
    /// must not rely on it beyond being stable for a given dataset.
    pub fn top_down_tenants(
        &self,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<(i64, String, i64)>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT u.tenant_id, COALESCE(t.company_name, ''), COUNT(*) AS down_count
             FROM uptime_records u LEFT JOIN tenants t ON u.tenant_id = t.id
             WHERE u.status = 'down' AND u.recorded_at >= ?1
             GROUP BY u.tenant_id ORDER BY down_count DESC LIMIT ?2",
        )?;

        let rows = stmt
            .query_map(params![fmt_time(since), limit], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(rows)
    }

    /// The most recent down snapshots for a tenant, newest first.
    pub fn recent_down_events(&self, tenant_id: i64, limit: i64) -> Result<Vec<UptimeRecord>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT tenant_id, service_type, status, recorded_at FROM uptime_records
             WHERE tenant_id = ?1 AND status = 'down' ORDER BY recorded_at DESC LIMIT ?2",
        )?;

        let records = stmt
            .query_map(params![tenant_id, limit], row_to_uptime_record)?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(records)
    }

    /// Delete uptime rows older than the cutoff. Returns rows deleted.
    pub fn delete_uptime_records_before(&self, cutoff: DateTime<Utc>) -> Result<usize, DbError> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            "DELETE FROM uptime_records WHERE recorded_at < ?1",
            params![fmt_time(cutoff)],
        )?;
        Ok(deleted)
    }

    // --- Tenant directory ---

    /// Insert or replace a tenant record.
    pub fn upsert_tenant(&self, tenant: &Tenant) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO tenants (id, company_name, status, channel_connected) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
             company_name=excluded.company_name, status=excluded.status,
             channel_connected=excluded.channel_connected",
            params![
                tenant.id,
                tenant.company_name,
                tenant.status.as_str(),
                tenant.channel_connected,
            ],
        )?;
        Ok(())
    }

    /// Look up a tenant by ID.
    pub fn tenant(&self, id: i64) -> Result<Tenant, DbError> {
        let conn = self.conn.lock().unwrap();
        let tenant = conn
            .query_row(
                "SELECT id, company_name, status, channel_connected FROM tenants WHERE id = ?1",
                params![id],
                row_to_tenant,
            )
            .optional()?;
        tenant.ok_or(DbError::NotFound)
    }

    /// All tenants whose status is active.
    pub fn active_tenants(&self) -> Result<Vec<Tenant>, DbError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT id, company_name, status, channel_connected FROM tenants
             WHERE status = 'active' ORDER BY id ASC",
        )?;

        let tenants = stmt
            .query_map([], row_to_tenant)?
            .collect::<SqlResult<Vec<_>>>()?;

        Ok(tenants)
    }

    /// Count of active tenants.
    pub fn count_active_tenants(&self) -> Result<i64, DbError> {
        let conn = self.conn.lock().unwrap();
        Ok(conn.query_row(
            "SELECT COUNT(*) FROM tenants WHERE status = 'active'",
            [],
            |r| r.get(0),
        )?)
    }

    /// Write the reconciled connectivity flag onto a tenant record.
    pub fn set_tenant_connected(&self, id: i64, connected: bool) -> Result<(), DbError> {
        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            "UPDATE tenants SET channel_connected = ?1 WHERE id = ?2",
            params![connected, id],
        )?;
        if changed == 0 {
            return Err(DbError::NotFound);
        }
        Ok(())
    }
}

fn row_to_alert(row: &rusqlite::Row<'_>) -> SqlResult<Alert> {
    let severity: String = row.get(5)?;
    let created_at: String = row.get(6)?;
    let acknowledged_at: Option<String> = row.get(9)?;
    Ok(Alert {
        id: row.get(0)?,
        alert_type: row.get(1)?,
        service_id: row.get(2)?,
        tenant_id: row.get(3)?,
        message: row.get(4)?,
        severity: Severity::parse(&severity),
        created_at: parse_db_time(&created_at).unwrap_or_else(Utc::now),
        acknowledged: row.get(7)?,
        acknowledged_by: row.get(8)?,
        acknowledged_at: acknowledged_at.and_then(|s| parse_db_time(&s)),
    })
}

fn row_to_uptime_record(row: &rusqlite::Row<'_>) -> SqlResult<UptimeRecord> {
    let status: String = row.get(2)?;
    let recorded_at: String = row.get(3)?;
    Ok(UptimeRecord {
        tenant_id: row.get(0)?,
        service_type: row.get(1)?,
        status: ChannelState::parse(&status),
        recorded_at: parse_db_time(&recorded_at).unwrap_or_else(Utc::now),
    })
}

fn row_to_tenant(row: &rusqlite::Row<'_>) -> SqlResult<Tenant> {
    let status: String = row.get(2)?;
    Ok(Tenant {
        id: row.get(0)?,
        company_name: row.get(1)?,
        status: TenantStatus::parse(&status),
        channel_connected: row.get(3)?,
    })
}

/// Parse a datetime string from the database.
fn parse_db_time(s: &str) -> Option<DateTime<Utc>> {
    // Try various formats
    let formats = [
        "%Y-%m-%d %H:%M:%S%.9f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.9fZ",
        "%Y-%m-%dT%H:%M:%SZ",
    ];

    for fmt in &formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(dt, Utc));
        }
    }

    // Try ISO 8601
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    None
}
