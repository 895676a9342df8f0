//! Scan status polling.
//!
//! The service has no push notification, so completion is detected by
//! re-reading the scan resource at a fixed interval until it reports a
//! terminal status. The sleep between checks is the only suspension point
//! and is the only place cancellation is observed.

use crate::core::{OsaError, OsaResult, ScanOutcome, ScanStatus};
use crate::transport::{HttpRequest, Transport};
use crate::validate::send_validated;

use serde::Deserialize;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Configuration for status polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between two status checks.
    pub interval: Duration,

    /// Maximum number of status checks, or `None` to wait indefinitely.
    pub max_attempts: Option<u32>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: None,
        }
    }
}

impl PollConfig {
    /// Creates a configuration with defaults: every 5 seconds, no limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the interval between status checks.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Caps the number of status checks.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts.max(1));
        self
    }

    /// Removes the cap on status checks.
    pub fn unbounded(mut self) -> Self {
        self.max_attempts = None;
        self
    }

    /// Returns whether another status check is allowed after `attempts`.
    pub fn allows_another(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

/// Result of a completed poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollReport {
    /// Terminal outcome reported by the service.
    pub outcome: ScanOutcome,
    /// Number of status checks performed.
    pub attempts: u32,
    /// Time spent polling.
    pub elapsed: Duration,
}

#[derive(Debug, Deserialize)]
struct ScanStatusResponse {
    status: StatusField,
    #[serde(default)]
    message: Option<String>,
}

// Older service versions wrap the code as `{"id": 1, "value": "InProgress"}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StatusField {
    Code(i64),
    Object { id: i64 },
}

impl StatusField {
    fn code(&self) -> i64 {
        match self {
            Self::Code(code) | Self::Object { id: code } => *code,
        }
    }
}

/// Polls `request` until the scan reaches a terminal status.
///
/// `request` must already carry the session cookies and CSRF header; it is
/// re-sent unchanged on every check.
///
/// # Errors
///
/// - `Connection` / `Service` from any status check, as classified by
///   [`validate_response`](crate::validate::validate_response).
/// - `Service` if the status body cannot be decoded.
/// - `InvalidScanStatus` for an unrecognised status code, without sleeping.
/// - `PollLimitExceeded` once `max_attempts` checks saw the scan in progress.
/// - `Cancelled` if `cancel` fires while waiting between checks.
pub async fn poll_scan(
    transport: &dyn Transport,
    request: &HttpRequest,
    config: &PollConfig,
    cancel: &CancellationToken,
) -> OsaResult<PollReport> {
    let started = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let response = send_validated(transport, request.clone()).await?;
        let body: ScanStatusResponse = response.json().map_err(|e| {
            OsaError::service(response.status, format!("could not decode scan status: {}", e))
        })?;
        let status = ScanStatus::from_code(body.status.code());

        tracing::debug!(
            scan_link = %request.url,
            attempt = attempts,
            status = %status,
            "Scan status checked"
        );

        let outcome = match status {
            ScanStatus::InProgress => None,
            ScanStatus::Finished => Some(ScanOutcome::Finished),
            ScanStatus::Failed => Some(ScanOutcome::Failed {
                message: body
                    .message
                    .unwrap_or_else(|| "scan failed without a message".to_string()),
            }),
            ScanStatus::Unknown(code) => {
                tracing::warn!(scan_link = %request.url, code = code, "Unrecognised scan status");
                return Err(OsaError::InvalidScanStatus { code });
            }
        };

        if let Some(outcome) = outcome {
            return Ok(PollReport {
                outcome,
                attempts,
                elapsed: started.elapsed(),
            });
        }

        if !config.allows_another(attempts) {
            tracing::warn!(scan_link = %request.url, attempts = attempts, "Poll limit reached");
            return Err(OsaError::PollLimitExceeded { attempts });
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(scan_link = %request.url, attempts = attempts, "Polling cancelled");
                return Err(OsaError::Cancelled);
            }
            _ = tokio::time::sleep(config.interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TransportError;
    use crate::transport::{HttpResponse, Method, MockReply, MockTransport};
    use url::Url;

    const SCAN: &str = "osa/scans/42";

    fn request() -> HttpRequest {
        HttpRequest::get(Url::parse("https://cx.example.com/CxRestAPI/osa/scans/42").unwrap())
    }

    fn status(code: i64) -> HttpResponse {
        HttpResponse::new(200).with_json(serde_json::json!({ "status": code }))
    }

    fn failed(message: &str) -> HttpResponse {
        HttpResponse::new(200).with_json(serde_json::json!({ "status": 3, "message": message }))
    }

    // With the clock paused each sleep advances virtual time by exactly one
    // interval, so elapsed time counts the sleeps.
    fn assert_elapsed(elapsed: Duration, secs: u64) {
        assert!(elapsed >= Duration::from_secs(secs), "elapsed {:?}", elapsed);
        assert!(elapsed < Duration::from_secs(secs) + Duration::from_secs(1), "elapsed {:?}", elapsed);
    }

    #[test]
    fn test_default_config() {
        let config = PollConfig::default();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert_eq!(config.max_attempts, None);
        assert!(config.allows_another(u32::MAX - 1));
    }

    #[test]
    fn test_max_attempts() {
        let config = PollConfig::new().with_max_attempts(3);
        assert!(config.allows_another(2));
        assert!(!config.allows_another(3));
        assert_eq!(PollConfig::new().with_max_attempts(0).max_attempts, Some(1));
        assert_eq!(config.unbounded().max_attempts, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_sleeps_then_finished() {
        let transport =
            MockTransport::new().on_sequence(Method::Get, SCAN, [status(1), status(1), status(2)]);

        let report = poll_scan(&transport, &request(), &PollConfig::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.outcome, ScanOutcome::Finished);
        assert_eq!(report.attempts, 3);
        assert_elapsed(report.elapsed, 10);
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_one_sleep_then_failed() {
        let transport = MockTransport::new()
            .on_sequence(Method::Get, SCAN, [status(1), failed("Archive could not be extracted")]);

        let report = poll_scan(&transport, &request(), &PollConfig::default(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            report.outcome,
            ScanOutcome::Failed {
                message: "Archive could not be extracted".into()
            }
        );
        assert_eq!(report.attempts, 2);
        assert_elapsed(report.elapsed, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_status_fails_without_sleeping() {
        let transport = MockTransport::new().on(Method::Get, SCAN, status(999));

        let err = poll_scan(&transport, &request(), &PollConfig::default(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, OsaError::InvalidScanStatus { code: 999 }));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_blip_during_polling() {
        let transport = MockTransport::new()
            .on_sequence(Method::Get, SCAN, [status(1), HttpResponse::new(503)]);

        let err = poll_scan(&transport, &request(), &PollConfig::default(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_connection());
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_mid_polling_is_connection_error() {
        let transport = MockTransport::new().on_sequence(
            Method::Get,
            SCAN,
            [
                MockReply::from(status(1)),
                MockReply::Unreachable("connection reset".into()),
            ],
        );

        let err = poll_scan(&transport, &request(), &PollConfig::default(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OsaError::Connection {
                source: Some(TransportError::Connect(_))
            }
        ));
        assert!(err.is_recoverable());
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_undecodable_status_is_service_error() {
        let transport =
            MockTransport::new().on(Method::Get, SCAN, HttpResponse::new(200).with_body("<html/>"));

        let err = poll_scan(&transport, &request(), &PollConfig::default(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, OsaError::Service { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_status_object_form() {
        let transport = MockTransport::new().on(
            Method::Get,
            SCAN,
            HttpResponse::new(200)
                .with_json(serde_json::json!({ "status": { "id": 2, "value": "Finished" } })),
        );

        let report = poll_scan(&transport, &request(), &PollConfig::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(report.outcome.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_limit() {
        let transport = MockTransport::new().on(Method::Get, SCAN, status(1));
        let config = PollConfig::new().with_max_attempts(4);

        let err = poll_scan(&transport, &request(), &config, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, OsaError::PollLimitExceeded { attempts: 4 }));
        assert_eq!(transport.request_count(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_sleep() {
        let transport = MockTransport::new().on(Method::Get, SCAN, status(1));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            trigger.cancel();
        });

        let err = poll_scan(&transport, &request(), &PollConfig::default(), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, OsaError::Cancelled));
        // Checks at t=0 and t=5; cancelled during the second sleep.
        assert_eq!(transport.request_count(), 2);
    }

    #[tokio::test]
    async fn test_already_cancelled_still_checks_once() {
        let transport = MockTransport::new().on(Method::Get, SCAN, status(2));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = poll_scan(&transport, &request(), &PollConfig::default(), &cancel)
            .await
            .unwrap();
        assert!(report.outcome.is_finished());
    }
}
