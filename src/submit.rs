//! Scan submission.
//!
//! A scan is created by posting a two-part multipart form to
//! `projects/{projectId}/scans`: an `origin` text field and the zipped
//! sources. The archive is read and checked before anything is sent.

use crate::core::{ArchiveFingerprint, ClientConfig, OsaError, OsaResult, ScanHandle, ScanSubmission, Session};
use crate::transport::{FilePart, HttpRequest, HttpResponse, MultipartForm, RequestBody, Transport};
use crate::validate::send_validated;

use serde::Deserialize;
use std::path::Path;

/// Last path segment of the scan creation endpoint.
pub const SCANS_LEAF: &str = "scans";

/// Form field carrying the origin tag.
pub const ORIGIN_FIELD: &str = "origin";

/// Form field carrying the archive.
pub const ARCHIVE_FIELD: &str = "OSAZippedSourceCode";

const ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// Archive content read from disk, ready to upload.
#[derive(Clone)]
pub struct PreparedArchive {
    /// File name sent with the upload.
    pub file_name: String,
    /// Archive bytes.
    pub data: Vec<u8>,
    /// Content fingerprint.
    pub fingerprint: ArchiveFingerprint,
}

impl std::fmt::Debug for PreparedArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedArchive")
            .field("file_name", &self.file_name)
            .field("fingerprint", &self.fingerprint)
            .finish()
    }
}

/// Checks a submission and reads its archive.
///
/// Fails with `Validation` if the project id is blank or the archive is
/// missing, not a regular file, or unreadable. No request is made.
pub async fn prepare(submission: &ScanSubmission) -> OsaResult<PreparedArchive> {
    if submission.project_id.trim().is_empty() {
        return Err(OsaError::validation("project id must not be empty"));
    }
    read_archive(submission.archive_path()).await
}

async fn read_archive(path: &Path) -> OsaResult<PreparedArchive> {
    let metadata = tokio::fs::metadata(path).await.map_err(|e| {
        OsaError::validation(format!("archive '{}' is not accessible: {}", path.display(), e))
    })?;
    if !metadata.is_file() {
        return Err(OsaError::validation(format!(
            "archive '{}' is not a regular file",
            path.display()
        )));
    }

    let data = tokio::fs::read(path).await.map_err(|e| {
        OsaError::validation(format!("archive '{}' could not be read: {}", path.display(), e))
    })?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sources.zip".to_string());

    Ok(PreparedArchive {
        file_name,
        fingerprint: ArchiveFingerprint::of_bytes(&data),
        data,
    })
}

/// Builds the scan creation form: the origin field, then the archive.
pub fn scan_form(archive: PreparedArchive, origin: i32) -> MultipartForm {
    MultipartForm::new()
        .text(ORIGIN_FIELD, origin.to_string())
        .file(FilePart {
            field_name: ARCHIVE_FIELD.to_string(),
            file_name: archive.file_name,
            content_type: ARCHIVE_CONTENT_TYPE.to_string(),
            data: archive.data,
        })
}

/// Uploads a prepared archive and returns the link to the created scan.
///
/// # Errors
///
/// - `Connection` / `Service` as classified by
///   [`validate_response`](crate::validate::validate_response).
/// - `Service` if the response has no scan link.
pub async fn submit_scan(
    transport: &dyn Transport,
    config: &ClientConfig,
    session: &Session,
    project_id: &str,
    form: MultipartForm,
) -> OsaResult<ScanHandle> {
    let url = config.project_endpoint(project_id, SCANS_LEAF)?;
    let request = session.authorize(HttpRequest::post(url).with_body(RequestBody::Multipart(form)));

    let response = send_validated(transport, request).await?;
    let handle = scan_link(&response)?;

    tracing::debug!(project_id = %project_id, scan_link = %handle, "Scan created");
    Ok(handle)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateScanResponse {
    #[serde(default)]
    link: Option<Link>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Link {
    Uri(String),
    Object { uri: String },
}

fn scan_link(response: &HttpResponse) -> OsaResult<ScanHandle> {
    let body: CreateScanResponse = response.json().map_err(|e| {
        OsaError::service(response.status, format!("could not decode scan creation response: {}", e))
    })?;

    let link = match body.link {
        Some(Link::Uri(uri)) | Some(Link::Object { uri }) => uri,
        None => String::new(),
    };
    if link.trim().is_empty() {
        return Err(OsaError::service(
            response.status,
            "scan creation response did not contain a scan link",
        ));
    }
    Ok(ScanHandle::new(link))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{is_authorized, CSRF_COOKIE, SESSION_COOKIE};
    use crate::core::TransportError;
    use crate::transport::{Method, MockTransport};
    use std::io::Write;

    fn config() -> ClientConfig {
        ClientConfig::new("https://cx.example.com").unwrap()
    }

    fn session() -> Session {
        Session::new("session-a", "csrf-b").unwrap()
    }

    fn archive_file(content: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".zip").tempfile().unwrap();
        file.write_all(content).unwrap();
        file
    }

    #[tokio::test]
    async fn test_prepare_reads_archive() {
        let file = archive_file(b"PK\x03\x04zipdata");
        let archive = prepare(&ScanSubmission::new("7", file.path())).await.unwrap();

        assert_eq!(archive.data, b"PK\x03\x04zipdata");
        assert_eq!(archive.fingerprint.size, 11);
        assert!(archive.file_name.ends_with(".zip"));
    }

    #[tokio::test]
    async fn test_prepare_rejects_missing_archive() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.zip");

        let err = prepare(&ScanSubmission::new("7", &missing)).await.unwrap_err();
        assert!(matches!(err, OsaError::Validation { .. }));
        assert!(err.to_string().contains("missing.zip"));
    }

    #[tokio::test]
    async fn test_prepare_rejects_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = prepare(&ScanSubmission::new("7", dir.path())).await.unwrap_err();
        assert!(err.to_string().contains("not a regular file"));
    }

    #[tokio::test]
    async fn test_prepare_rejects_blank_project() {
        let file = archive_file(b"PK");
        let err = prepare(&ScanSubmission::new("  ", file.path())).await.unwrap_err();
        assert!(matches!(err, OsaError::Validation { .. }));
    }

    #[test]
    fn test_scan_form_has_exactly_two_parts() {
        let archive = PreparedArchive {
            file_name: "src.zip".into(),
            data: b"PK".to_vec(),
            fingerprint: ArchiveFingerprint::of_bytes(b"PK"),
        };
        let form = scan_form(archive, 4);

        assert_eq!(form.part_count(), 2);
        assert_eq!(form.field(ORIGIN_FIELD), Some("4"));
        let file = form.file.unwrap();
        assert_eq!(file.field_name, ARCHIVE_FIELD);
        assert_eq!(file.file_name, "src.zip");
        assert_eq!(file.data, b"PK");
    }

    #[tokio::test]
    async fn test_submit_returns_link_and_double_submits_csrf() {
        let transport = MockTransport::new().on(
            Method::Post,
            "projects/7/scans",
            HttpResponse::new(201).with_json(serde_json::json!({
                "scanId": "9f2c",
                "link": "osa/scans/9f2c"
            })),
        );
        let form = MultipartForm::new().text(ORIGIN_FIELD, "1");

        let handle = submit_scan(&transport, &config(), &session(), "7", form).await.unwrap();
        assert_eq!(handle.as_str(), "osa/scans/9f2c");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert!(is_authorized(&requests[0], &session()));
        assert_eq!(requests[0].cookie(SESSION_COOKIE), Some("session-a"));
        assert_eq!(requests[0].header(CSRF_COOKIE), Some("csrf-b"));
        assert!(matches!(requests[0].body, RequestBody::Multipart(_)));
    }

    #[tokio::test]
    async fn test_submit_accepts_link_object() {
        let transport = MockTransport::new().on(
            Method::Post,
            "projects/7/scans",
            HttpResponse::new(201).with_json(serde_json::json!({
                "scanId": "9f2c",
                "link": { "rel": "scan", "uri": "/osa/scans/9f2c" }
            })),
        );

        let handle = submit_scan(&transport, &config(), &session(), "7", MultipartForm::new())
            .await
            .unwrap();
        assert_eq!(handle.as_str(), "/osa/scans/9f2c");
    }

    #[tokio::test]
    async fn test_submit_without_link_is_service_error() {
        let transport = MockTransport::new().on(
            Method::Post,
            "projects/7/scans",
            HttpResponse::new(201).with_json(serde_json::json!({ "scanId": "9f2c" })),
        );

        let err = submit_scan(&transport, &config(), &session(), "7", MultipartForm::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OsaError::Service { status: 201, .. }));
        assert!(err.to_string().contains("scan link"));
    }

    #[tokio::test]
    async fn test_submit_unparseable_response() {
        let transport = MockTransport::new().on(
            Method::Post,
            "projects/7/scans",
            HttpResponse::new(200).with_body("OK"),
        );

        let err = submit_scan(&transport, &config(), &session(), "7", MultipartForm::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OsaError::Service { .. }));
    }

    #[tokio::test]
    async fn test_submit_rejected_with_diagnostic() {
        let transport = MockTransport::new().on(
            Method::Post,
            "projects/7/scans",
            HttpResponse::new(400).with_json(serde_json::json!({
                "messageCode": "OSA_1",
                "messageDetails": "Archive exceeds size limit"
            })),
        );

        let err = submit_scan(&transport, &config(), &session(), "7", MultipartForm::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("OSA_1\nArchive exceeds size limit"));
    }

    #[tokio::test]
    async fn test_submit_unreachable_is_connection_error() {
        let transport = MockTransport::new().unreachable(Method::Post, "projects/7/scans");

        let err = submit_scan(&transport, &config(), &session(), "7", MultipartForm::new())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OsaError::Connection {
                source: Some(TransportError::Connect(_))
            }
        ));
        assert_eq!(transport.requests_to("projects/7/scans").len(), 1);
    }
}
