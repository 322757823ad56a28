//! Relational-store probe implementation.

use std::time::Instant;

use chrono::Utc;

use crate::db::{CheckResult, HealthState, Store};

/// Run a lightweight connectivity check against the relational store.
///
/// Binary outcome: this target has no unhealthy state.
pub fn check_database(store: &Store) -> CheckResult {
    let time = Utc::now();
    let start = Instant::now();

    match store.ping() {
        Ok(()) => CheckResult {
            time,
            status: HealthState::Healthy,
            response_time_ms: start.elapsed().as_millis() as u64,
            http_status: None,
            error: None,
        },
        Err(e) => CheckResult {
            time,
            status: HealthState::Offline,
            response_time_ms: start.elapsed().as_millis() as u64,
            http_status: None,
            error: Some(e.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_database_check_is_healthy() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();

        let result = check_database(&store);
        assert_eq!(result.status, HealthState::Healthy);
        assert!(result.error.is_none());
        assert!(result.http_status.is_none());
    }
}
