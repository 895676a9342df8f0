//! # Osabridge
//!
//! A client for submitting source archives to a remote open-source
//! analysis (OSA) service, waiting for the scan, and fetching the summary.
//!
//! ## Overview
//!
//! Osabridge handles the request/response orchestration of a scan:
//!
//! - Logging in and carrying the session cookie and CSRF token
//! - Uploading the zipped sources as a multipart form
//! - Polling the created scan until it finishes or fails
//! - Classifying every response into connection, service, or scan errors
//! - Retrieving the open-source summary for the project
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use osabridge::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("https://cx.example.com")?;
//!     let client = OsaClient::new(config, Credentials::new("admin", "secret"))?;
//!
//!     let submission = ScanSubmission::new("42", "target/sources.zip");
//!     let summary = client
//!         .scan_and_summarize(&submission, &CancellationToken::new())
//!         .await?;
//!
//!     println!("{} vulnerable libraries", summary.vulnerable_libraries());
//!     client.close();
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `default` - Includes the HTTP transport
//! - `http` - reqwest-backed [`HttpTransport`](transport::HttpTransport)
//!
//! ## Architecture
//!
//! - **Core**: Data model, configuration, and error types
//! - **Transport**: The `Transport` trait with HTTP and mock implementations
//! - **Validate**: Response validation and error classification
//! - **Session**: Login and CSRF token propagation
//! - **Submit**: Archive checks and multipart scan submission
//! - **Poller**: Status polling with cancellation
//! - **Client**: Orchestration of the above
//! - **Audit**: Structured audit events

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod audit;
pub mod client;
pub mod core;
pub mod poller;
pub mod session;
pub mod submit;
pub mod transport;
pub mod validate;

// Re-export commonly used types at the crate root
pub use crate::core::{
    ArchiveFingerprint, ClientConfig, Credentials, OsaError, OsaResult, OsaSummary, ScanHandle,
    ScanOutcome, ScanStatus, ScanSubmission, ServiceDiagnostic, Session, TransportError,
};

pub use crate::client::{OsaClient, OsaClientBuilder};
pub use crate::poller::{PollConfig, PollReport};
pub use crate::transport::{MockTransport, Transport};

/// Prelude module for convenient imports.
///
/// ```rust
/// use osabridge::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::{OsaClient, OsaClientBuilder};
    pub use crate::core::{
        ClientConfig, Credentials, OsaError, OsaResult, OsaSummary, ScanHandle, ScanOutcome,
        ScanStatus, ScanSubmission, ServiceDiagnostic,
    };
    pub use crate::poller::{PollConfig, PollReport};
    pub use crate::transport::Transport;
}
