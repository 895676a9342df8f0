//! Core types used throughout the osabridge library.
//!
//! This module defines credentials, the session token pair, scan
//! submissions and handles, scan status decoding, service diagnostics and
//! the open-source summary returned by the service.

use crate::core::error::{OsaError, OsaResult};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Credentials used to log in to the scanning service.
///
/// Supplied once when the client is built and never logged.
pub struct Credentials {
    username: String,
    password: SecretString,
}

impl Credentials {
    /// Creates credentials from a username and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::new(password.into().into()),
        }
    }

    /// Returns the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Builds the JSON login body.
    pub(crate) fn login_body(&self) -> serde_json::Value {
        serde_json::json!({
            "username": self.username,
            "password": self.password.expose_secret(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// The security token pair issued by a successful login.
///
/// A session is bound to one logical operation; the client logs in again
/// for the next one.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    session_cookie: String,
    csrf_token: String,
}

impl Session {
    /// Creates a session, rejecting empty tokens.
    pub fn new(session_cookie: impl Into<String>, csrf_token: impl Into<String>) -> OsaResult<Self> {
        let session_cookie = session_cookie.into();
        let csrf_token = csrf_token.into();
        if session_cookie.is_empty() {
            return Err(crate::session::missing_token(crate::session::SESSION_COOKIE));
        }
        if csrf_token.is_empty() {
            return Err(crate::session::missing_token(crate::session::CSRF_COOKIE));
        }
        Ok(Self {
            session_cookie,
            csrf_token,
        })
    }

    /// Returns the session cookie value.
    pub fn session_cookie(&self) -> &str {
        &self.session_cookie
    }

    /// Returns the CSRF token value.
    pub fn csrf_token(&self) -> &str {
        &self.csrf_token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_cookie", &"[REDACTED]")
            .field("csrf_token", &"[REDACTED]")
            .finish()
    }
}

/// A request to scan one source archive for a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSubmission {
    /// Project the scan belongs to.
    pub project_id: String,
    /// Path of the zipped sources on local disk.
    pub archive_path: PathBuf,
    /// Origin tag override; the client's configured origin is used when `None`.
    pub origin: Option<i32>,
}

impl ScanSubmission {
    /// Creates a submission using the client's default origin tag.
    pub fn new(project_id: impl Into<String>, archive_path: impl Into<PathBuf>) -> Self {
        Self {
            project_id: project_id.into(),
            archive_path: archive_path.into(),
            origin: None,
        }
    }

    /// Sets the origin tag for this submission.
    pub fn with_origin(mut self, origin: i32) -> Self {
        self.origin = Some(origin);
        self
    }

    /// Returns the archive path.
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }
}

/// A link to a scan created on the service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanHandle(String);

impl ScanHandle {
    /// Wraps a link returned by the service.
    pub fn new(link: impl Into<String>) -> Self {
        Self(link.into())
    }

    /// Returns the raw link.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the link against the API root.
    ///
    /// Absolute links are used as-is; relative ones, with or without a
    /// leading slash, are taken relative to `api_root`.
    pub fn resolve(&self, api_root: &Url) -> OsaResult<Url> {
        if let Ok(absolute) = Url::parse(&self.0) {
            return Ok(absolute);
        }
        api_root
            .join(self.0.trim_start_matches('/'))
            .map_err(|e| OsaError::Service {
                status: 200,
                message: format!("invalid scan link '{}': {}", self.0, e),
                diagnostic: None,
            })
    }
}

impl fmt::Display for ScanHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status of a remote scan as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanStatus {
    /// The scan is still running.
    InProgress,
    /// The scan completed successfully.
    Finished,
    /// The scan failed.
    Failed,
    /// A status code this client does not recognise.
    Unknown(i64),
}

impl ScanStatus {
    /// Decodes a numeric status code.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::InProgress,
            2 => Self::Finished,
            3 => Self::Failed,
            other => Self::Unknown(other),
        }
    }

    /// Returns `true` for `Finished` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Failed)
    }
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "in_progress"),
            Self::Finished => write!(f, "finished"),
            Self::Failed => write!(f, "failed"),
            Self::Unknown(code) => write!(f, "unknown({})", code),
        }
    }
}

/// Terminal result of waiting on a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScanOutcome {
    /// The scan finished and results are available.
    Finished,
    /// The scan failed on the service side.
    Failed {
        /// Message reported by the service.
        message: String,
    },
}

impl ScanOutcome {
    /// Returns `true` if the scan finished successfully.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Finished)
    }

    /// Converts a failed outcome into [`OsaError::ScanFailed`].
    pub fn into_result(self) -> OsaResult<()> {
        match self {
            Self::Finished => Ok(()),
            Self::Failed { message } => Err(OsaError::ScanFailed { message }),
        }
    }
}

/// Structured diagnostic the service attaches to error responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDiagnostic {
    #[serde(deserialize_with = "string_or_number")]
    message_code: String,
    message_details: String,
}

impl ServiceDiagnostic {
    /// Creates a diagnostic.
    pub fn new(code: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            message_code: code.into(),
            message_details: details.into(),
        }
    }

    /// Returns the service message code.
    pub fn code(&self) -> &str {
        &self.message_code
    }

    /// Returns the service message details.
    pub fn details(&self) -> &str {
        &self.message_details
    }
}

impl fmt::Display for ServiceDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n{}", self.message_code, self.message_details)
    }
}

// Some service versions send numeric message codes.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Text(String),
        Number(i64),
    }

    Ok(match Code::deserialize(deserializer)? {
        Code::Text(text) => text,
        Code::Number(number) => number.to_string(),
    })
}

/// Open-source analysis summary for a project.
///
/// The payload is kept exactly as the service sent it, so serializing a
/// summary reproduces the service response. Well-known counters are read
/// through typed accessors that return `None` when a field is absent, `null`,
/// or of an unexpected type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OsaSummary {
    fields: serde_json::Map<String, serde_json::Value>,
}

impl OsaSummary {
    /// Wraps a raw summary payload.
    pub fn from_map(fields: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { fields }
    }

    /// Returns a raw field.
    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    /// Returns the payload as received.
    pub fn as_map(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.fields
    }

    /// Consumes the summary and returns the payload.
    pub fn into_map(self) -> serde_json::Map<String, serde_json::Value> {
        self.fields
    }

    fn count(&self, name: &str) -> Option<u64> {
        self.fields.get(name).and_then(serde_json::Value::as_u64)
    }

    /// Total number of libraries detected.
    pub fn total_libraries(&self) -> Option<u64> {
        self.count("totalLibraries")
    }

    /// Libraries with at least one high severity vulnerability.
    pub fn high_vulnerability_libraries(&self) -> Option<u64> {
        self.count("highVulnerabilityLibraries")
    }

    /// Libraries whose worst vulnerability is medium severity.
    pub fn medium_vulnerability_libraries(&self) -> Option<u64> {
        self.count("mediumVulnerabilityLibraries")
    }

    /// Libraries whose worst vulnerability is low severity.
    pub fn low_vulnerability_libraries(&self) -> Option<u64> {
        self.count("lowVulnerabilityLibraries")
    }

    /// Libraries with no known vulnerabilities.
    pub fn non_vulnerable_libraries(&self) -> Option<u64> {
        self.count("nonVulnerableLibraries")
    }

    /// Vulnerable libraries already on their latest version.
    pub fn vulnerable_and_updated(&self) -> Option<u64> {
        self.count("vulnerableAndUpdated")
    }

    /// Vulnerable libraries with a newer version available.
    pub fn vulnerable_and_outdated(&self) -> Option<u64> {
        self.count("vulnerableAndOutdated")
    }

    /// Total high severity vulnerabilities.
    pub fn total_high_vulnerabilities(&self) -> Option<u64> {
        self.count("totalHighVulnerabilities")
    }

    /// Total medium severity vulnerabilities.
    pub fn total_medium_vulnerabilities(&self) -> Option<u64> {
        self.count("totalMediumVulnerabilities")
    }

    /// Total low severity vulnerabilities.
    pub fn total_low_vulnerabilities(&self) -> Option<u64> {
        self.count("totalLowVulnerabilities")
    }

    /// Overall vulnerability score, rendered as text whether the service
    /// sends a string or a number.
    pub fn vulnerability_score(&self) -> Option<String> {
        match self.fields.get("vulnerabilityScore")? {
            serde_json::Value::String(score) => Some(score.clone()),
            serde_json::Value::Number(score) => Some(score.to_string()),
            _ => None,
        }
    }

    /// Sum of libraries with any vulnerability.
    pub fn vulnerable_libraries(&self) -> u64 {
        [
            self.high_vulnerability_libraries(),
            self.medium_vulnerability_libraries(),
            self.low_vulnerability_libraries(),
        ]
        .iter()
        .flatten()
        .sum()
    }

    /// Returns `true` if any high severity vulnerability was reported.
    pub fn has_high_severity(&self) -> bool {
        self.high_vulnerability_libraries().unwrap_or(0) > 0
            || self.total_high_vulnerabilities().unwrap_or(0) > 0
    }
}
