//! Audit event types and emission functions.

use crate::core::{ArchiveFingerprint, OsaSummary, ScanHandle, ScanOutcome};
use crate::poller::PollReport;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Audit event for an accepted scan submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanSubmittedEvent {
    /// Unique event ID.
    pub event_id: String,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Project the scan belongs to.
    pub project_id: String,

    /// Link to the created scan.
    pub scan_link: String,

    /// Origin tag sent with the scan.
    pub origin: i32,

    /// Uploaded archive file name.
    pub archive_name: String,

    /// BLAKE3 hash of the uploaded archive.
    pub archive_blake3: String,

    /// Size of the uploaded archive in bytes.
    pub archive_size: u64,
}

impl ScanSubmittedEvent {
    /// Creates an event for a scan that was just created.
    pub fn new(
        project_id: &str,
        handle: &ScanHandle,
        origin: i32,
        archive_name: &str,
        fingerprint: &ArchiveFingerprint,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            project_id: project_id.to_string(),
            scan_link: handle.to_string(),
            origin,
            archive_name: archive_name.to_string(),
            archive_blake3: fingerprint.blake3.clone(),
            archive_size: fingerprint.size,
        }
    }
}

impl AuditEvent for ScanSubmittedEvent {
    fn event_type(&self) -> &'static str {
        "scan_submitted"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Audit event for a scan reaching a terminal state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanCompletedEvent {
    /// Unique event ID.
    pub event_id: String,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Link to the scan.
    pub scan_link: String,

    /// `finished` or `failed`.
    pub outcome: String,

    /// Failure message, if the scan failed.
    pub message: Option<String>,

    /// Number of status checks performed.
    pub status_checks: u32,

    /// Time spent waiting in milliseconds.
    pub waited_ms: u64,
}

impl ScanCompletedEvent {
    /// Creates an event from a poll report.
    pub fn new(handle: &ScanHandle, report: &PollReport) -> Self {
        let (outcome, message) = match &report.outcome {
            ScanOutcome::Finished => ("finished", None),
            ScanOutcome::Failed { message } => ("failed", Some(message.clone())),
        };
        Self {
            event_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            scan_link: handle.to_string(),
            outcome: outcome.to_string(),
            message,
            status_checks: report.attempts,
            waited_ms: report.elapsed.as_millis() as u64,
        }
    }
}

impl AuditEvent for ScanCompletedEvent {
    fn event_type(&self) -> &'static str {
        "scan_completed"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Audit event for a retrieved open-source summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRetrievedEvent {
    /// Unique event ID.
    pub event_id: String,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Project the summary belongs to.
    pub project_id: String,

    /// Total libraries, if reported.
    pub total_libraries: Option<u64>,

    /// Libraries with any vulnerability.
    pub vulnerable_libraries: u64,

    /// Whether any high severity vulnerability was reported.
    pub high_severity: bool,
}

impl SummaryRetrievedEvent {
    /// Creates an event for a retrieved summary.
    pub fn new(project_id: &str, summary: &OsaSummary) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            project_id: project_id.to_string(),
            total_libraries: summary.total_libraries(),
            vulnerable_libraries: summary.vulnerable_libraries(),
            high_severity: summary.has_high_severity(),
        }
    }
}

impl AuditEvent for SummaryRetrievedEvent {
    fn event_type(&self) -> &'static str {
        "summary_retrieved"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for an accepted scan submission.
pub fn emit_scan_submitted(event: &ScanSubmittedEvent) {
    tracing::info!(
        target: "osabridge::audit",
        event_type = event.event_type(),
        event_id = %event.event_id,
        project_id = %event.project_id,
        scan_link = %event.scan_link,
        origin = event.origin,
        archive_name = %event.archive_name,
        archive_blake3 = %event.archive_blake3,
        archive_size = event.archive_size,
        "Scan submitted"
    );
}

/// Emits an audit event for a scan reaching a terminal state.
pub fn emit_scan_completed(event: &ScanCompletedEvent) {
    tracing::info!(
        target: "osabridge::audit",
        event_type = event.event_type(),
        event_id = %event.event_id,
        scan_link = %event.scan_link,
        outcome = %event.outcome,
        message = ?event.message,
        status_checks = event.status_checks,
        waited_ms = event.waited_ms,
        "Scan completed"
    );
}

/// Emits an audit event for a retrieved summary.
pub fn emit_summary_retrieved(event: &SummaryRetrievedEvent) {
    tracing::info!(
        target: "osabridge::audit",
        event_type = event.event_type(),
        event_id = %event.event_id,
        project_id = %event.project_id,
        total_libraries = ?event.total_libraries,
        vulnerable_libraries = event.vulnerable_libraries,
        high_severity = event.high_severity,
        "Summary retrieved"
    );
}
