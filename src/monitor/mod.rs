//! Scheduling module: periodic health checks, threshold alerting and
//! the connectivity/uptime loops.

pub mod correlator;
pub mod detector;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::config::MonitorConfig;
use crate::db::{CheckResult, HealthState, Store};
use crate::history::HistoryStore;
use crate::probe::{Prober, Target};
use crate::provider::ConnectivityProvider;
use crate::uptime::UptimeTracker;

/// Current standing of one probed service, for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub id: String,
    pub name: String,
    pub endpoint: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<HealthState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub uptime_percent: f64,
}

/// The engine's scheduler.
///
/// Owns the probed targets and drives three independent loops: service
/// health checks, connectivity correlation and uptime snapshots. Each
/// loop has its own timer so a slow tick on one cadence never delays
/// the others.
pub struct Monitor {
    config: MonitorConfig,
    targets: Arc<Vec<Target>>,
    store: Arc<Store>,
    history: Arc<HistoryStore>,
    prober: Arc<Prober>,
    uptime: Arc<UptimeTracker>,
    provider: Arc<dyn ConnectivityProvider>,
    stop: Mutex<Option<broadcast::Sender<()>>>,
}

impl Monitor {
    pub fn new(
        config: MonitorConfig,
        store: Arc<Store>,
        history: Arc<HistoryStore>,
        uptime: Arc<UptimeTracker>,
        provider: Arc<dyn ConnectivityProvider>,
    ) -> Self {
        let targets = Arc::new(config.default_targets());
        let prober = Arc::new(Prober::new(
            store.clone(),
            Duration::from_secs(config.probe_timeout_secs),
        ));

        Self {
            config,
            targets,
            store,
            history,
            prober,
            uptime,
            provider,
            stop: Mutex::new(None),
        }
    }

    /// Start the three loops. A no-op when already running.
    pub async fn start(&self) {
        let mut stop = self.stop.lock().await;
        if stop.is_some() {
            tracing::debug!("Monitor: start called while already running");
            return;
        }

        tracing::info!("Monitor: starting with {} targets", self.targets.len());
        let (tx, _) = broadcast::channel(1);

        tokio::spawn(run_service_loop(
            self.targets.clone(),
            self.prober.clone(),
            self.history.clone(),
            self.store.clone(),
            self.config.alert_threshold,
            Duration::from_secs(self.config.probe_interval_secs),
            tx.subscribe(),
        ));
        tokio::spawn(run_correlator_loop(
            self.provider.clone(),
            self.store.clone(),
            Duration::from_secs(self.config.correlator_interval_secs),
            tx.subscribe(),
        ));
        tokio::spawn(run_snapshot_loop(
            self.uptime.clone(),
            Duration::from_secs(self.config.snapshot_interval_secs),
            tx.subscribe(),
        ));

        *stop = Some(tx);
    }

    /// Stop all loops. In-flight probes from the final tick complete or
    /// time out naturally. Safe to call multiple times.
    pub async fn stop(&self) {
        let mut stop = self.stop.lock().await;
        if let Some(tx) = stop.take() {
            let _ = tx.send(());
            tracing::info!("Monitor: stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.stop.lock().await.is_some()
    }

    /// Current standing of every probed service.
    pub fn current_status(&self) -> Vec<ServiceStatus> {
        self.targets
            .iter()
            .map(|target| {
                let last = self.history.last(&target.id);
                ServiceStatus {
                    id: target.id.clone(),
                    name: target.display_name.clone(),
                    endpoint: target.endpoint.to_string(),
                    status: last.as_ref().map(|r| r.status),
                    last_check: last.as_ref().map(|r| r.time),
                    response_time_ms: last.as_ref().map(|r| r.response_time_ms),
                    error: last.as_ref().and_then(|r| r.error.clone()),
                    uptime_percent: self.history.healthy_percent(&target.id),
                }
            })
            .collect()
    }

    /// Recent check results for one service, newest first.
    pub fn service_history(&self, target_id: &str, limit: usize) -> Vec<CheckResult> {
        self.history.history(target_id, limit)
    }
}

/// Probe every target concurrently, then feed results through the ring
/// and the threshold detector.
pub(crate) async fn run_service_tick(
    targets: &[Target],
    prober: &Arc<Prober>,
    history: &Arc<HistoryStore>,
    store: &Arc<Store>,
    threshold: usize,
) {
    let mut probes = JoinSet::new();
    for target in targets {
        let prober = prober.clone();
        let target = target.clone();
        probes.spawn(async move {
            let result = prober.check(&target).await;
            (target, result)
        });
    }

    while let Some(joined) = probes.join_next().await {
        let (target, result) = match joined {
            Ok(pair) => pair,
            Err(e) => {
                tracing::error!("Monitor: probe task failed: {}", e);
                continue;
            }
        };

        // The ring is updated before any persistence so detection keeps
        // working on current-session data even when writes fail.
        history.append(&target.id, result);

        if let Some(alert) = detector::evaluate(&target, history, threshold) {
            tracing::warn!("Monitor: {} is down, raising alert", target.display_name);
            if let Err(e) = store.record_alert(&alert) {
                tracing::error!(
                    "Monitor: failed to persist alert for {}: {}",
                    target.id,
                    e
                );
            }
        }
    }
}

async fn run_service_loop(
    targets: Arc<Vec<Target>>,
    prober: Arc<Prober>,
    history: Arc<HistoryStore>,
    store: Arc<Store>,
    threshold: usize,
    period: Duration,
    mut stop_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            _ = interval.tick() => {
                run_service_tick(&targets, &prober, &history, &store, threshold).await;
            }
        }
    }
}

async fn run_correlator_loop(
    provider: Arc<dyn ConnectivityProvider>,
    store: Arc<Store>,
    period: Duration,
    mut stop_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            _ = interval.tick() => {
                correlator::run_correlation(provider.as_ref(), &store).await;
            }
        }
    }
}

async fn run_snapshot_loop(
    uptime: Arc<UptimeTracker>,
    period: Duration,
    mut stop_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = stop_rx.recv() => break,
            _ = interval.tick() => {
                uptime.record_snapshots();
            }
        }
    }
}
