//! reqwest-backed transport.
//!
//! # Requirements
//!
//! - Network access to the scanning service
//!
//! The cookie store is disabled: session cookies are read from each
//! response and attached explicitly, so one login never leaks into the
//! next operation.

use crate::core::{ClientConfig, OsaError, TransportError};
use crate::transport::{HttpRequest, HttpResponse, Method, RequestBody, Transport};

use async_trait::async_trait;
use reqwest::header::{HeaderName, HeaderValue, COOKIE};

/// HTTP transport built on `reqwest`.
///
/// # Example
///
/// ```rust,ignore
/// use osabridge::core::ClientConfig;
/// use osabridge::transport::HttpTransport;
///
/// let config = ClientConfig::new("https://cx.example.com")?;
/// let transport = HttpTransport::new(&config)?;
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport using the timeout and user agent from `config`.
    pub fn new(config: &ClientConfig) -> Result<Self, OsaError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| OsaError::configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Wraps an existing reqwest client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build(&self, request: HttpRequest) -> Result<reqwest::RequestBuilder, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        let mut builder = self.client.request(method, request.url.clone());

        for (name, value) in &request.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| TransportError::Request(format!("invalid header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| TransportError::Request(format!("invalid header value: {}", e)))?;
            builder = builder.header(name, value);
        }

        if let Some(cookies) = request.cookie_header() {
            let value = HeaderValue::from_str(&cookies)
                .map_err(|e| TransportError::Request(format!("invalid cookie value: {}", e)))?;
            builder = builder.header(COOKIE, value);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(form) => {
                let mut multipart = reqwest::multipart::Form::new();
                for (name, value) in form.fields {
                    multipart = multipart.text(name, value);
                }
                if let Some(file) = form.file {
                    let part = reqwest::multipart::Part::bytes(file.data)
                        .file_name(file.file_name)
                        .mime_str(&file.content_type)?;
                    multipart = multipart.part(file.field_name, part);
                }
                builder.multipart(multipart)
            }
        };

        Ok(builder)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "reqwest"
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = request.method;
        let url = request.url.clone();
        let response = self.build(request)?.send().await?;

        let status = response.status().as_u16();
        let cookies = response
            .cookies()
            .map(|cookie| (cookie.name().to_string(), cookie.value().to_string()))
            .collect();
        let body = response.bytes().await?.to_vec();

        tracing::debug!(
            method = %method,
            url = %url,
            status = status,
            body_len = body.len(),
            "HTTP exchange completed"
        );

        Ok(HttpResponse {
            status,
            cookies,
            body,
        })
    }
}
