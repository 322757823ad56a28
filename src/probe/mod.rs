//! Probe module for service health checks.
//!
//! Supports HTTP endpoints and the relational store.

mod database;
mod http;

pub use database::*;
pub use http::*;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::db::{CheckResult, Store};

/// Where a target is reached for probing.
#[derive(Debug, Clone)]
pub enum Endpoint {
    /// An HTTP URL probed with a GET request.
    Http(String),
    /// The engine's own relational store, probed with a connectivity check.
    Database,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Http(url) => f.write_str(url),
            Endpoint::Database => f.write_str("sqlite"),
        }
    }
}

/// A named, addressable thing to probe. Static configuration.
#[derive(Debug, Clone)]
pub struct Target {
    pub id: String,
    pub display_name: String,
    pub endpoint: Endpoint,
}

/// Runs bounded-time health checks against targets.
pub struct Prober {
    store: Arc<Store>,
    timeout: Duration,
}

impl Prober {
    pub fn new(store: Arc<Store>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Run one bounded-time check against a target.
    ///
    /// Never fails: every failure mode resolves into a `CheckResult`.
    pub async fn check(&self, target: &Target) -> CheckResult {
        // Add jitter to avoid thundering herd
        let jitter = rand::random::<u64>() % 100;
        tokio::time::sleep(Duration::from_millis(jitter)).await;

        match &target.endpoint {
            Endpoint::Http(url) => check_http(url, self.timeout).await,
            Endpoint::Database => check_database(&self.store),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_display() {
        let e = Endpoint::Http("http://localhost:3000/health".to_string());
        assert_eq!(e.to_string(), "http://localhost:3000/health");
        assert_eq!(Endpoint::Database.to_string(), "sqlite");
    }
}
