//! Session acquisition and CSRF token propagation.
//!
//! Logging in yields two cookies: the session cookie and the CSRF token.
//! Every authenticated request carries both cookies and repeats the CSRF
//! token in a header of the same name; the service rejects requests where
//! the double submission is missing.

use crate::core::{ClientConfig, Credentials, OsaError, OsaResult, Session};
use crate::transport::{HttpRequest, RequestBody, Transport};
use crate::validate::send_validated;

/// Login endpoint below the API root.
pub const AUTHENTICATION_PATH: &str = "auth/login";

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "cxCookie";

/// Name of the CSRF cookie and of the header echoing it.
pub const CSRF_COOKIE: &str = "CXCSRFToken";

/// Logs in and returns the session token pair.
///
/// # Errors
///
/// - `Connection` if the service is unreachable or answers 503.
/// - `Service` for any other error status.
/// - `MissingSessionToken` if either cookie is absent or empty.
pub async fn authenticate(
    transport: &dyn Transport,
    config: &ClientConfig,
    credentials: &Credentials,
) -> OsaResult<Session> {
    let request = HttpRequest::post(config.endpoint(AUTHENTICATION_PATH)?)
        .with_body(RequestBody::Json(credentials.login_body()));

    tracing::debug!(username = %credentials.username(), "Logging in");
    let response = send_validated(transport, request).await?;

    let session_cookie = response.cookie(SESSION_COOKIE).unwrap_or_default();
    let csrf_token = response.cookie(CSRF_COOKIE).unwrap_or_default();
    let session = Session::new(session_cookie, csrf_token).map_err(|e| {
        tracing::warn!(error = %e, "Login response is missing a security token");
        e
    })?;

    tracing::debug!(username = %credentials.username(), "Logged in");
    Ok(session)
}

impl Session {
    /// Attaches both cookies and the CSRF header to a request.
    pub fn authorize(&self, request: HttpRequest) -> HttpRequest {
        request
            .with_cookie(SESSION_COOKIE, self.session_cookie())
            .with_cookie(CSRF_COOKIE, self.csrf_token())
            .with_header(CSRF_COOKIE, self.csrf_token())
    }
}

/// Returns `true` if a request carries the full authentication triple.
#[cfg(test)]
pub(crate) fn is_authorized(request: &HttpRequest, session: &Session) -> bool {
    request.cookie(SESSION_COOKIE) == Some(session.session_cookie())
        && request.cookie(CSRF_COOKIE) == Some(session.csrf_token())
        && request.header(CSRF_COOKIE) == Some(session.csrf_token())
}

/// Builds an error for a login that returned no usable session.
pub(crate) fn missing_token(cookie: &str) -> OsaError {
    OsaError::MissingSessionToken {
        cookie: cookie.to_string(),
    }
}
