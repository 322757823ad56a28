//! Configuration module.
//!
//! Loads configuration from environment variables with sensible defaults.

use std::env;

use crate::monitor::detector::DEFAULT_ALERT_THRESHOLD;
use crate::probe::{Endpoint, Target};

/// Engine configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Path to the SQLite database file (default: "pulsewatch.db")
    pub db_path: String,
    /// Period of the service health-check loop in seconds (default: 30)
    pub probe_interval_secs: u64,
    /// Period of the connectivity correlator loop in seconds (default: 15)
    pub correlator_interval_secs: u64,
    /// Period of the uptime snapshot loop in seconds (default: 300)
    pub snapshot_interval_secs: u64,
    /// Consecutive non-healthy results required to raise an alert (default: 3)
    pub alert_threshold: usize,
    /// Per-probe hard timeout in seconds (default: 10)
    pub probe_timeout_secs: u64,
    /// Days of uptime records kept by `prune` (default: 90)
    pub retention_days: i64,
    /// Base URL of the platform API service
    pub api_url: String,
    /// Base URL of the messaging backend service
    pub messaging_url: String,
    /// Base URL of the web frontend
    pub frontend_url: String,
    /// URL of the external connectivity-state feed
    pub connectivity_url: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            db_path: "pulsewatch.db".to_string(),
            probe_interval_secs: 30,
            correlator_interval_secs: 15,
            snapshot_interval_secs: 300,
            alert_threshold: DEFAULT_ALERT_THRESHOLD,
            probe_timeout_secs: 10,
            retention_days: 90,
            api_url: "http://localhost:3000/health".to_string(),
            messaging_url: "http://localhost:3001/health".to_string(),
            frontend_url: "http://localhost:8080/".to_string(),
            connectivity_url: "http://localhost:3001/channels/status".to_string(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from `PULSEWATCH_*` environment variables.
    pub fn load() -> Self {
        let mut cfg = Self::default();

        if let Ok(path) = env::var("PULSEWATCH_DB_PATH") {
            cfg.db_path = path;
        }
        if let Ok(url) = env::var("PULSEWATCH_API_URL") {
            cfg.api_url = url;
        }
        if let Ok(url) = env::var("PULSEWATCH_MESSAGING_URL") {
            cfg.messaging_url = url;
        }
        if let Ok(url) = env::var("PULSEWATCH_FRONTEND_URL") {
            cfg.frontend_url = url;
        }
        if let Ok(url) = env::var("PULSEWATCH_CONNECTIVITY_URL") {
            cfg.connectivity_url = url;
        }

        cfg.probe_interval_secs = env_u64("PULSEWATCH_PROBE_INTERVAL", cfg.probe_interval_secs);
        cfg.correlator_interval_secs =
            env_u64("PULSEWATCH_CORRELATOR_INTERVAL", cfg.correlator_interval_secs);
        cfg.snapshot_interval_secs =
            env_u64("PULSEWATCH_SNAPSHOT_INTERVAL", cfg.snapshot_interval_secs);
        cfg.probe_timeout_secs = env_u64("PULSEWATCH_PROBE_TIMEOUT", cfg.probe_timeout_secs);
        cfg.alert_threshold =
            env_u64("PULSEWATCH_ALERT_THRESHOLD", cfg.alert_threshold as u64) as usize;
        cfg.retention_days =
            env_u64("PULSEWATCH_RETENTION_DAYS", cfg.retention_days as u64) as i64;

        cfg
    }

    /// The fixed set of probed services this deployment monitors.
    pub fn default_targets(&self) -> Vec<Target> {
        vec![
            Target {
                id: "api".to_string(),
                display_name: "Platform API".to_string(),
                endpoint: Endpoint::Http(self.api_url.clone()),
            },
            Target {
                id: "messaging".to_string(),
                display_name: "Messaging Backend".to_string(),
                endpoint: Endpoint::Http(self.messaging_url.clone()),
            },
            Target {
                id: "web".to_string(),
                display_name: "Web Frontend".to_string(),
                endpoint: Endpoint::Http(self.frontend_url.clone()),
            },
            Target {
                id: "database".to_string(),
                display_name: "Relational Store".to_string(),
                endpoint: Endpoint::Database,
            },
        ]
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = MonitorConfig::default();
        assert_eq!(cfg.db_path, "pulsewatch.db");
        assert_eq!(cfg.probe_interval_secs, 30);
        assert_eq!(cfg.correlator_interval_secs, 15);
        assert_eq!(cfg.snapshot_interval_secs, 300);
        assert_eq!(cfg.alert_threshold, 3);
        assert_eq!(cfg.probe_timeout_secs, 10);
        assert_eq!(cfg.retention_days, 90);
    }

    #[test]
    fn test_default_targets() {
        let cfg = MonitorConfig::default();
        let targets = cfg.default_targets();
        assert_eq!(targets.len(), 4);
        assert!(targets.iter().any(|t| t.id == "database"));
        assert!(targets.iter().any(|t| t.id == "api"));
    }
}
