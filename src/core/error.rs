//! Error types for the osabridge library.
//!
//! Every failure is returned as an [`OsaError`]. Transport library internals
//! never leak to callers: anything the HTTP stack raises is folded into
//! [`OsaError::Connection`] with a fixed message, and the underlying
//! [`TransportError`] is kept only as the error source.

use crate::core::types::ServiceDiagnostic;

use thiserror::Error;

/// Message carried by every connection failure.
pub const CONNECTION_FAILED_MESSAGE: &str = "connection to the scanning service failed";

/// The main error type for client operations.
#[derive(Debug, Error)]
pub enum OsaError {
    /// The service could not be reached, timed out, or reported itself
    /// unavailable (HTTP 503).
    #[error("connection to the scanning service failed")]
    Connection {
        /// Transport failure that caused this error, if any.
        #[source]
        source: Option<TransportError>,
    },

    /// The service answered with an application error.
    #[error("service error (HTTP {status}): {message}")]
    Service {
        /// HTTP status of the offending response.
        status: u16,
        /// Human-readable message, including any service diagnostic verbatim.
        message: String,
        /// Structured diagnostic decoded from the response body.
        diagnostic: Option<ServiceDiagnostic>,
    },

    /// The remote scan reached its failed terminal state.
    #[error("scan failed: {message}")]
    ScanFailed {
        /// Failure message reported by the service.
        message: String,
    },

    /// The service reported a scan status this client does not know.
    #[error("Scan Status invalid: {code}")]
    InvalidScanStatus {
        /// The raw status code.
        code: i64,
    },

    /// A local precondition failed before any request was sent.
    #[error("validation failed: {message}")]
    Validation {
        /// What was wrong with the input.
        message: String,
    },

    /// Login succeeded but one of the required security cookies was absent.
    #[error("login response did not provide the '{cookie}' cookie")]
    MissingSessionToken {
        /// Name of the missing cookie.
        cookie: String,
    },

    /// The configured poll attempt limit was reached while the scan was
    /// still in progress.
    #[error("scan still in progress after {attempts} status checks")]
    PollLimitExceeded {
        /// Number of status checks performed.
        attempts: u32,
    },

    /// Waiting for the scan was cancelled.
    #[error("waiting for the scan was cancelled")]
    Cancelled,

    /// The client was configured incorrectly.
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },
}

impl OsaError {
    /// Returns `true` for connectivity failures, including HTTP 503.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }

    /// Returns `true` if a caller-side retry could plausibly succeed.
    ///
    /// The client itself never retries.
    pub fn is_recoverable(&self) -> bool {
        self.is_connection()
    }

    /// Returns the structured service diagnostic, if the error carries one.
    pub fn service_diagnostic(&self) -> Option<&ServiceDiagnostic> {
        match self {
            Self::Service { diagnostic, .. } => diagnostic.as_ref(),
            _ => None,
        }
    }

    /// Returns the HTTP status associated with this error, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Service { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Creates a `Connection` error with no underlying transport failure.
    pub fn unavailable() -> Self {
        Self::Connection { source: None }
    }

    /// Creates a `Service` error without a diagnostic.
    pub fn service(status: u16, message: impl Into<String>) -> Self {
        Self::Service {
            status,
            message: message.into(),
            diagnostic: None,
        }
    }

    /// Creates a `Validation` error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a `Configuration` error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

impl From<TransportError> for OsaError {
    fn from(err: TransportError) -> Self {
        Self::Connection { source: Some(err) }
    }
}

/// Failure raised by a [`Transport`](crate::transport::Transport)
/// implementation before an HTTP status was obtained.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request timed out.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The connection could not be established (DNS, refused, TLS).
    #[error("could not connect: {0}")]
    Connect(String),

    /// The request could not be built or sent.
    #[error("request failed: {0}")]
    Request(String),

    /// The response body could not be read.
    #[error("could not read response body: {0}")]
    Body(String),
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_body() || err.is_decode() {
            Self::Body(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

/// A specialized `Result` type for client operations.
pub type OsaResult<T> = Result<T, OsaError>;
