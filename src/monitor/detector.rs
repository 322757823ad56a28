//! Alert threshold detection over a target's recent history.

use crate::db::{Alert, HealthState, Severity};
use crate::history::HistoryStore;
use crate::probe::Target;

/// Consecutive non-healthy results required before alerting.
pub const DEFAULT_ALERT_THRESHOLD: usize = 3;

/// Evaluate a target's history tail after a new result.
///
/// Stateless between calls: the suffix is re-evaluated on every new
/// result, so a sustained outage re-emits an alert on each failing tick
/// until the target recovers.
pub fn evaluate(target: &Target, history: &HistoryStore, threshold: usize) -> Option<Alert> {
    let tail = history.tail(&target.id, threshold);
    if tail.len() < threshold {
        return None;
    }
    if tail.iter().any(|r| r.status == HealthState::Healthy) {
        return None;
    }

    Some(Alert::for_service(
        "service_down",
        &target.id,
        Severity::Critical,
        format!(
            "{} has failed the last {} health checks",
            target.display_name, threshold
        ),
    ))
}
