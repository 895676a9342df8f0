//! Core types for the osabridge library.
//!
//! - [`types`] - Credentials, session tokens, scan handles and statuses
//! - [`config`] - Client configuration
//! - [`error`] - Structured error types
//! - [`hasher`] - BLAKE3 archive fingerprinting

pub mod config;
pub mod error;
pub mod hasher;
pub mod types;

pub use config::{ClientConfig, API_ROOT_PATH, DEFAULT_ORIGIN};
pub use error::{OsaError, OsaResult, TransportError, CONNECTION_FAILED_MESSAGE};
pub use hasher::ArchiveFingerprint;
pub use types::{
    Credentials, OsaSummary, ScanHandle, ScanOutcome, ScanStatus, ScanSubmission,
    ServiceDiagnostic, Session,
};
