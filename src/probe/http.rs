//! HTTP probe implementation.

use std::time::{Duration, Instant};

use chrono::Utc;

use crate::db::{CheckResult, HealthState};

/// Run an HTTP health check with a GET request.
///
/// A 2xx response is healthy, any other response is unhealthy, and a
/// timeout or connection failure is offline.
pub async fn check_http(url: &str, timeout: Duration) -> CheckResult {
    let time = Utc::now();
    let start = Instant::now();

    let client = match reqwest::Client::builder().timeout(timeout).build() {
        Ok(c) => c,
        Err(e) => {
            return CheckResult {
                time,
                status: HealthState::Offline,
                response_time_ms: 0,
                http_status: None,
                error: Some(e.to_string()),
            }
        }
    };

    match client.get(url).send().await {
        Ok(response) => {
            let elapsed = start.elapsed().as_millis() as u64;
            let code = response.status().as_u16();
            if response.status().is_success() {
                CheckResult {
                    time,
                    status: HealthState::Healthy,
                    response_time_ms: elapsed,
                    http_status: Some(code),
                    error: None,
                }
            } else {
                CheckResult {
                    time,
                    status: HealthState::Unhealthy,
                    response_time_ms: elapsed,
                    http_status: Some(code),
                    error: Some(format!("HTTP {}", code)),
                }
            }
        }
        Err(e) => {
            let elapsed = start.elapsed().as_millis() as u64;
            let error = if e.is_timeout() {
                "Timeout".to_string()
            } else {
                e.to_string()
            };
            CheckResult {
                time,
                status: HealthState::Offline,
                response_time_ms: elapsed,
                http_status: None,
                error: Some(error),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_success_response_is_healthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let result = check_http(&format!("{}/health", server.uri()), Duration::from_secs(2)).await;
        assert_eq!(result.status, HealthState::Healthy);
        assert_eq!(result.http_status, Some(200));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_server_error_is_unhealthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = check_http(&format!("{}/health", server.uri()), Duration::from_secs(2)).await;
        assert_eq!(result.status, HealthState::Unhealthy);
        assert_eq!(result.http_status, Some(500));
        assert_eq!(result.error.as_deref(), Some("HTTP 500"));
    }

    #[tokio::test]
    async fn test_timeout_is_offline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let result =
            check_http(&format!("{}/health", server.uri()), Duration::from_millis(50)).await;
        assert_eq!(result.status, HealthState::Offline);
        assert_eq!(result.error.as_deref(), Some("Timeout"));
        assert!(result.http_status.is_none());
    }

    #[tokio::test]
    async fn test_connection_failure_is_offline() {
        // Nothing listens on this port
        let result = check_http("http://127.0.0.1:1/health", Duration::from_secs(2)).await;
        assert_eq!(result.status, HealthState::Offline);
        assert!(result.error.is_some());
    }
}
