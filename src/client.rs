//! The client orchestrating login, submission, polling and summary retrieval.

use crate::audit::{
    emit_scan_completed, emit_scan_submitted, emit_summary_retrieved, ScanCompletedEvent,
    ScanSubmittedEvent, SummaryRetrievedEvent,
};
use crate::core::{
    ClientConfig, Credentials, OsaError, OsaResult, OsaSummary, ScanHandle, ScanSubmission, Session,
};
use crate::poller::{poll_scan, PollReport};
use crate::session::authenticate;
use crate::submit::{prepare, scan_form, submit_scan};
use crate::transport::{ArcTransport, HttpRequest, Transport};
use crate::validate::send_validated;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Last path segment of the summary endpoint.
pub const SUMMARY_LEAF: &str = "summaryresults";

/// Builder for creating an `OsaClient`.
pub struct OsaClientBuilder {
    config: ClientConfig,
    credentials: Option<Credentials>,
    transport: Option<ArcTransport>,
}

impl OsaClientBuilder {
    /// Creates a builder for the given configuration.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            credentials: None,
            transport: None,
        }
    }

    /// Sets the login credentials.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Uses a custom transport instead of the default HTTP one.
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Uses a transport wrapped in an Arc.
    pub fn arc_transport(mut self, transport: ArcTransport) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the client.
    pub fn build(self) -> OsaResult<OsaClient> {
        let credentials = self
            .credentials
            .ok_or_else(|| OsaError::configuration("credentials are required"))?;

        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport(&self.config)?,
        };

        Ok(OsaClient {
            config: self.config,
            credentials,
            transport,
        })
    }
}

#[cfg(feature = "http")]
fn default_transport(config: &ClientConfig) -> OsaResult<ArcTransport> {
    Ok(Arc::new(crate::transport::HttpTransport::new(config)?))
}

#[cfg(not(feature = "http"))]
fn default_transport(_config: &ClientConfig) -> OsaResult<ArcTransport> {
    Err(OsaError::configuration(
        "no transport configured and the 'http' feature is disabled",
    ))
}

/// Client for the open-source analysis service.
///
/// Each public operation logs in afresh, so security tokens never outlive
/// the operation that obtained them. The client owns its transport; it is
/// released by [`close`](Self::close) or when the client is dropped.
///
/// A client runs one operation at a time; wrap it in your own
/// synchronization to share it between concurrent scans.
pub struct OsaClient {
    config: ClientConfig,
    credentials: Credentials,
    transport: ArcTransport,
}

impl OsaClient {
    /// Creates a builder.
    pub fn builder(config: ClientConfig) -> OsaClientBuilder {
        OsaClientBuilder::new(config)
    }

    /// Creates a client with the default HTTP transport.
    #[cfg(feature = "http")]
    pub fn new(config: ClientConfig, credentials: Credentials) -> OsaResult<Self> {
        Self::builder(config).credentials(credentials).build()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Logs in and returns a fresh session.
    pub async fn authenticate(&self) -> OsaResult<Session> {
        authenticate(self.transport.as_ref(), &self.config, &self.credentials).await
    }

    /// Uploads an archive and returns the link to the created scan.
    ///
    /// The archive is checked and read before logging in, so an unusable
    /// archive fails with `Validation` without any request being made.
    pub async fn create_scan(&self, submission: &ScanSubmission) -> OsaResult<ScanHandle> {
        let archive = prepare(submission).await?;
        let origin = submission.origin.unwrap_or(self.config.origin);
        let archive_name = archive.file_name.clone();
        let fingerprint = archive.fingerprint.clone();

        tracing::info!(
            project_id = %submission.project_id,
            archive = %submission.archive_path().display(),
            archive_size = fingerprint.size,
            "Submitting scan"
        );

        let session = self.authenticate().await?;
        let handle = submit_scan(
            self.transport.as_ref(),
            &self.config,
            &session,
            &submission.project_id,
            scan_form(archive, origin),
        )
        .await?;

        emit_scan_submitted(&ScanSubmittedEvent::new(
            &submission.project_id,
            &handle,
            origin,
            &archive_name,
            &fingerprint,
        ));
        Ok(handle)
    }

    /// Polls a scan until it finishes or fails.
    ///
    /// A failed scan is returned as [`ScanOutcome::Failed`](crate::core::ScanOutcome::Failed),
    /// not as an error. The call suspends between status checks; run it on
    /// its own task if other work must proceed meanwhile.
    pub async fn poll_scan(
        &self,
        handle: &ScanHandle,
        cancel: &CancellationToken,
    ) -> OsaResult<PollReport> {
        let url = handle.resolve(&self.config.api_root())?;
        let session = self.authenticate().await?;
        let request = session.authorize(HttpRequest::get(url));

        tracing::info!(scan_link = %handle, "Waiting for scan");
        let report = poll_scan(self.transport.as_ref(), &request, &self.config.poll, cancel).await?;

        emit_scan_completed(&ScanCompletedEvent::new(handle, &report));
        Ok(report)
    }

    /// Waits for a scan to finish, failing with `ScanFailed` if it fails.
    pub async fn wait_for_scan(
        &self,
        handle: &ScanHandle,
        cancel: &CancellationToken,
    ) -> OsaResult<()> {
        self.poll_scan(handle, cancel).await?.outcome.into_result()
    }

    /// Retrieves the open-source summary of a project.
    pub async fn get_summary(&self, project_id: &str) -> OsaResult<OsaSummary> {
        if project_id.trim().is_empty() {
            return Err(OsaError::validation("project id must not be empty"));
        }

        let url = self.config.project_endpoint(project_id, SUMMARY_LEAF)?;
        let session = self.authenticate().await?;
        let response =
            send_validated(self.transport.as_ref(), session.authorize(HttpRequest::get(url))).await?;

        let summary: OsaSummary = response.json().map_err(|e| {
            OsaError::service(response.status, format!("could not decode summary: {}", e))
        })?;

        emit_summary_retrieved(&SummaryRetrievedEvent::new(project_id, &summary));
        Ok(summary)
    }

    /// Submits a scan, waits for it, and returns the project summary.
    pub async fn scan_and_summarize(
        &self,
        submission: &ScanSubmission,
        cancel: &CancellationToken,
    ) -> OsaResult<OsaSummary> {
        let handle = self.create_scan(submission).await?;
        self.wait_for_scan(&handle, cancel).await?;
        self.get_summary(&submission.project_id).await
    }

    /// Releases the transport.
    pub fn close(self) {
        tracing::debug!(transport = self.transport.name(), "Closing client");
        drop(self);
    }
}

impl std::fmt::Debug for OsaClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OsaClient")
            .field("config", &self.config)
            .field("username", &self.credentials.username())
            .field("transport", &self.transport.name())
            .finish()
    }
}
