//! Client configuration.

use crate::core::error::{OsaError, OsaResult};
use crate::poller::PollConfig;

use std::time::Duration;
use url::Url;

/// Path of the REST API below the service base URL.
pub const API_ROOT_PATH: &str = "CxRestAPI/";

/// Origin tag identifying this integration to the service.
pub const DEFAULT_ORIGIN: i32 = 1;

/// Configuration for an [`OsaClient`](crate::client::OsaClient).
///
/// # Example
///
/// ```rust
/// use osabridge::core::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::new("https://cx.example.com")?
///     .with_timeout(Duration::from_secs(30))
///     .with_origin(4);
/// assert_eq!(config.api_root().as_str(), "https://cx.example.com/CxRestAPI/");
/// # Ok::<(), osabridge::OsaError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the service.
    pub base_url: Url,

    /// Timeout applied to each HTTP request.
    pub timeout: Duration,

    /// Origin tag sent with every scan submission.
    pub origin: i32,

    /// Status polling behavior.
    pub poll: PollConfig,

    /// User agent sent with every request.
    pub user_agent: String,
}

impl ClientConfig {
    /// Creates a configuration for the service at `base_url`.
    pub fn new(base_url: impl AsRef<str>) -> OsaResult<Self> {
        let base_url = Url::parse(base_url.as_ref()).map_err(|e| {
            OsaError::configuration(format!("invalid base URL '{}': {}", base_url.as_ref(), e))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(OsaError::configuration(format!(
                "base URL '{}' cannot be used as a base",
                base_url
            )));
        }

        Ok(Self {
            base_url,
            timeout: Duration::from_secs(60),
            origin: DEFAULT_ORIGIN,
            poll: PollConfig::default(),
            user_agent: format!("osabridge/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Sets the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the origin tag.
    pub fn with_origin(mut self, origin: i32) -> Self {
        self.origin = origin;
        self
    }

    /// Sets the polling configuration.
    pub fn with_poll(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Sets the user agent.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Returns the URL every endpoint path is resolved against.
    pub fn api_root(&self) -> Url {
        let mut root = self.base_url.clone();
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        // `cannot_be_a_base` was rejected in `new`, so join cannot fail here.
        root.join(API_ROOT_PATH).unwrap_or(root)
    }

    /// Resolves an endpoint path below the API root.
    pub fn endpoint(&self, path: &str) -> OsaResult<Url> {
        self.api_root()
            .join(path)
            .map_err(|e| OsaError::configuration(format!("invalid endpoint '{}': {}", path, e)))
    }

    /// Resolves `projects/{project_id}/{leaf}`, percent-encoding the id.
    pub fn project_endpoint(&self, project_id: &str, leaf: &str) -> OsaResult<Url> {
        let mut url = self.api_root();
        url.path_segments_mut()
            .map_err(|_| OsaError::configuration("API root cannot hold path segments"))?
            .pop_if_empty()
            .extend(["projects", project_id, leaf]);
        Ok(url)
    }
}
