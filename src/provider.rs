//! Typed ingestion boundary for the external connectivity feed.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

/// Observed connectivity state for one tenant's external channel.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantConnectivity {
    pub tenant_id: i64,
    pub connected: bool,
    pub authenticated: bool,
}

/// One full snapshot of the feed, as delivered per correlator tick.
pub type ConnectivitySnapshot = Vec<TenantConnectivity>;

/// Connectivity feed error types.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("connectivity feed unavailable: {0}")]
    Unavailable(String),
    #[error("connectivity feed returned a malformed payload: {0}")]
    Malformed(String),
}

/// Source of tenant connectivity snapshots.
#[async_trait]
pub trait ConnectivityProvider: Send + Sync {
    async fn snapshot(&self) -> Result<ConnectivitySnapshot, ProviderError>;
}

/// Provider fetching the snapshot from an HTTP endpoint.
pub struct HttpConnectivityProvider {
    url: String,
    timeout: Duration,
}

impl HttpConnectivityProvider {
    pub fn new(url: &str, timeout: Duration) -> Self {
        Self {
            url: url.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl ConnectivityProvider for HttpConnectivityProvider {
    async fn snapshot(&self) -> Result<ConnectivitySnapshot, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let response = client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ProviderError::Unavailable(format!(
                "HTTP {}",
                response.status().as_u16()
            )));
        }

        response
            .json::<ConnectivitySnapshot>()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_snapshot_deserialization() {
        let payload = r#"[
            {"tenant_id": 1, "connected": true, "authenticated": true},
            {"tenant_id": 2, "connected": true, "authenticated": false}
        ]"#;
        let snapshot: ConnectivitySnapshot = serde_json::from_str(payload).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(snapshot[0].connected && snapshot[0].authenticated);
        assert!(!snapshot[1].authenticated);
    }

    #[test]
    fn test_missing_field_is_rejected() {
        let payload = r#"[{"tenant_id": 1, "connected": true}]"#;
        assert!(serde_json::from_str::<ConnectivitySnapshot>(payload).is_err());
    }

    #[tokio::test]
    async fn test_http_provider_fetches_snapshot() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels/status"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"[{"tenant_id": 5, "connected": true, "authenticated": true}]"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let provider = HttpConnectivityProvider::new(
            &format!("{}/channels/status", server.uri()),
            Duration::from_secs(2),
        );
        let snapshot = provider.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].tenant_id, 5);
    }

    #[tokio::test]
    async fn test_http_provider_server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let provider = HttpConnectivityProvider::new(&server.uri(), Duration::from_secs(2));
        let err = provider.snapshot().await.unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_http_provider_bad_payload_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("not json", "application/json"))
            .mount(&server)
            .await;

        let provider = HttpConnectivityProvider::new(&server.uri(), Duration::from_secs(2));
        let err = provider.snapshot().await.unwrap_err();
        assert!(matches!(err, ProviderError::Malformed(_)));
    }
}
