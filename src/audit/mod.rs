//! Structured audit logging.
//!
//! This module provides functions for emitting structured audit events
//! using the `tracing` crate under the `osabridge::audit` target. Events
//! can be captured by any tracing subscriber (JSON file, OpenTelemetry,
//! etc.) to correlate client activity with service-side logs.

mod events;

pub use events::{
    emit_scan_completed, emit_scan_submitted, emit_summary_retrieved, AuditEvent,
    ScanCompletedEvent, ScanSubmittedEvent, SummaryRetrievedEvent,
};
