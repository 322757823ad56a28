//! Fixed-capacity per-target history of recent check results.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use crate::db::{CheckResult, HealthState};

/// Capacity of each per-target ring.
pub const HISTORY_CAPACITY: usize = 100;

/// In-memory store of per-target history rings, FIFO-evicting at capacity.
///
/// Constructed by the embedding application and injected into the
/// monitor, so separate monitor instances never share rings. The monitor
/// is the only writer; the detector and status queries read.
pub struct HistoryStore {
    rings: RwLock<HashMap<String, VecDeque<CheckResult>>>,
    capacity: usize,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::with_capacity(HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rings: RwLock::new(HashMap::new()),
            capacity,
        }
    }

    /// Append a result to a target's ring, evicting the oldest at capacity.
    pub fn append(&self, target_id: &str, result: CheckResult) {
        let mut rings = self.rings.write().unwrap();
        let ring = rings.entry(target_id.to_string()).or_default();
        ring.push_back(result);
        while ring.len() > self.capacity {
            ring.pop_front();
        }
    }

    /// Number of results held for a target.
    pub fn len(&self, target_id: &str) -> usize {
        let rings = self.rings.read().unwrap();
        rings.get(target_id).map_or(0, |r| r.len())
    }

    /// The most recent result for a target.
    pub fn last(&self, target_id: &str) -> Option<CheckResult> {
        let rings = self.rings.read().unwrap();
        rings.get(target_id).and_then(|r| r.back().cloned())
    }

    /// The last `k` results in tick order, oldest first.
    pub fn tail(&self, target_id: &str, k: usize) -> Vec<CheckResult> {
        let rings = self.rings.read().unwrap();
        match rings.get(target_id) {
            Some(ring) => {
                let skip = ring.len().saturating_sub(k);
                ring.iter().skip(skip).cloned().collect()
            }
            None => Vec::new(),
        }
    }

    /// The most recent results, newest first, up to `limit`.
    pub fn history(&self, target_id: &str, limit: usize) -> Vec<CheckResult> {
        let rings = self.rings.read().unwrap();
        match rings.get(target_id) {
            Some(ring) => ring.iter().rev().take(limit).cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Healthy fraction over the ring as a percentage.
    ///
    /// 100.0 for a target with no results yet, matching the engine-wide
    /// no-data convention.
    pub fn healthy_percent(&self, target_id: &str) -> f64 {
        let rings = self.rings.read().unwrap();
        match rings.get(target_id) {
            Some(ring) if !ring.is_empty() => {
                let healthy = ring
                    .iter()
                    .filter(|r| r.status == HealthState::Healthy)
                    .count();
                (healthy as f64 / ring.len() as f64 * 10000.0).round() / 100.0
            }
            _ => 100.0,
        }
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}
