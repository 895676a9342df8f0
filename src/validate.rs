//! Response validation and error classification.
//!
//! Every response the client receives passes through [`validate_response`]
//! before its body is interpreted, and every transport call is made through
//! [`send`], which folds transport failures into
//! [`OsaError::Connection`].

use crate::core::{OsaError, OsaResult, ServiceDiagnostic};
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// HTTP status the service uses to signal it is unavailable.
pub const SERVICE_UNAVAILABLE: u16 = 503;

// Applies to non-JSON bodies only; JSON bodies are service text and kept whole.
const MAX_BODY_IN_MESSAGE: usize = 8192;

/// Sends a request and normalizes transport failures.
///
/// The response status is not inspected; call [`validate_response`] next.
pub async fn send(transport: &dyn Transport, request: HttpRequest) -> OsaResult<HttpResponse> {
    let method = request.method;
    let url = request.url.clone();

    transport.execute(request).await.map_err(|e| {
        tracing::warn!(
            transport = transport.name(),
            method = %method,
            url = %url,
            error = %e,
            "Transport failure"
        );
        OsaError::from(e)
    })
}

/// Sends a request and validates the response.
pub async fn send_validated(
    transport: &dyn Transport,
    request: HttpRequest,
) -> OsaResult<HttpResponse> {
    let response = send(transport, request).await?;
    validate_response(&response)?;
    Ok(response)
}

/// Classifies a response by HTTP status.
///
/// - `< 400`: accepted.
/// - `503`: [`OsaError::Connection`], whatever the body says.
/// - any other `>= 400`: [`OsaError::Service`], carrying the service
///   diagnostic (`messageCode` and `messageDetails` joined by a newline)
///   when the body has one, or a message built from the status and raw body.
pub fn validate_response(response: &HttpResponse) -> OsaResult<()> {
    let status = response.status;
    if status < 400 {
        return Ok(());
    }

    if status == SERVICE_UNAVAILABLE {
        tracing::warn!(status = status, "Service unavailable");
        return Err(OsaError::unavailable());
    }

    let err = match response.json::<ServiceDiagnostic>() {
        Ok(diagnostic) => OsaError::Service {
            status,
            message: diagnostic.to_string(),
            diagnostic: Some(diagnostic),
        },
        Err(_) => OsaError::service(status, generic_message(response)),
    };

    tracing::warn!(status = status, error = %err, "Service rejected request");
    Err(err)
}

fn generic_message(response: &HttpResponse) -> String {
    let reason = canonical_reason(response.status);
    let body = response.text();
    let body = body.trim();

    let mut message = format!("HTTP {} {}", response.status, reason);
    if !body.is_empty() {
        message.push_str(": ");
        if serde_json::from_str::<serde::de::IgnoredAny>(body).is_ok() {
            message.push_str(body);
            return message;
        }
        match body.char_indices().nth(MAX_BODY_IN_MESSAGE) {
            Some((cut, _)) => {
                message.push_str(&body[..cut]);
                message.push_str("...");
            }
            None => message.push_str(body),
        }
    }
    message
}

fn canonical_reason(status: u16) -> &'static str {
    match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        413 => "Payload Too Large",
        415 => "Unsupported Media Type",
        422 => "Unprocessable Entity",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        504 => "Gateway Timeout",
        400..=499 => "Client Error",
        _ => "Server Error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::CONNECTION_FAILED_MESSAGE;
    use crate::transport::{Method, MockTransport};
    use url::Url;

    #[test]
    fn test_success_statuses_pass() {
        for status in [100, 200, 201, 204, 301, 302, 304, 399] {
            assert!(validate_response(&HttpResponse::new(status)).is_ok(), "status {}", status);
        }
    }

    #[test]
    fn test_error_bodies_ignored_below_400() {
        let response = HttpResponse::new(200)
            .with_json(serde_json::json!({"messageCode": "1", "messageDetails": "ignored"}));
        assert!(validate_response(&response).is_ok());
    }

    #[test]
    fn test_503_is_connection_error_regardless_of_body() {
        let bodies = [
            HttpResponse::new(503),
            HttpResponse::new(503).with_body("maintenance"),
            HttpResponse::new(503)
                .with_json(serde_json::json!({"messageCode": "9", "messageDetails": "down"})),
        ];
        for response in bodies {
            let err = validate_response(&response).unwrap_err();
            assert!(err.is_connection());
            assert_eq!(err.to_string(), CONNECTION_FAILED_MESSAGE);
        }
    }

    #[test]
    fn test_diagnostic_included_verbatim() {
        for status in [400, 401, 404, 500, 502] {
            let response = HttpResponse::new(status).with_json(serde_json::json!({
                "messageCode": "15021",
                "messageDetails": "Project does not exist"
            }));
            let err = validate_response(&response).unwrap_err();
            match &err {
                OsaError::Service {
                    status: got,
                    message,
                    diagnostic,
                } => {
                    assert_eq!(*got, status);
                    assert_eq!(message, "15021\nProject does not exist");
                    assert_eq!(diagnostic.as_ref().map(|d| d.details()), Some("Project does not exist"));
                }
                other => panic!("unexpected error: {:?}", other),
            }
            assert!(err.to_string().contains("15021"));
            assert!(err.to_string().contains("Project does not exist"));
        }
    }

    #[test]
    fn test_generic_message_without_diagnostic() {
        let err = validate_response(&HttpResponse::new(404)).unwrap_err();
        assert!(matches!(err, OsaError::Service { status: 404, diagnostic: None, .. }));
        assert!(err.to_string().contains("HTTP 404 Not Found"));

        let err = validate_response(&HttpResponse::new(500).with_body("<html>boom</html>")).unwrap_err();
        assert!(err.to_string().contains("HTTP 500 Internal Server Error: <html>boom</html>"));

        // Partial diagnostics are not diagnostics.
        let response = HttpResponse::new(400).with_json(serde_json::json!({"messageCode": "1"}));
        let err = validate_response(&response).unwrap_err();
        assert!(err.service_diagnostic().is_none());
    }

    #[test]
    fn test_generic_message_truncates_long_bodies() {
        let body = "x".repeat(20_000);
        let err = validate_response(&HttpResponse::new(418).with_body(body)).unwrap_err();
        let text = err.to_string();
        assert!(text.contains("HTTP 418 Client Error"));
        assert!(text.ends_with("..."));
        assert!(text.len() < 8_500);
    }

    #[test]
    fn test_partial_diagnostic_kept_verbatim() {
        let details = "d".repeat(2_000);
        let payload = serde_json::json!({ "messageDetails": details });
        let response = HttpResponse::new(400).with_json(payload.clone());

        let err = validate_response(&response).unwrap_err();
        assert!(err.service_diagnostic().is_none());
        assert!(err.to_string().contains(&details));
        assert!(!err.to_string().ends_with("..."));
    }

    #[tokio::test]
    async fn test_send_wraps_transport_failure() {
        let transport = MockTransport::new().unreachable(Method::Post, "auth/login");
        let url = Url::parse("https://cx.example.com/CxRestAPI/auth/login").unwrap();

        let err = send(&transport, HttpRequest::post(url)).await.unwrap_err();
        assert!(err.is_connection());
        assert_eq!(err.to_string(), CONNECTION_FAILED_MESSAGE);
    }
}
