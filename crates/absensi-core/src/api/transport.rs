//! Wire-level request/response types and the `Transport` seam.
//!
//! `ApiClient` decides *what* to send and how to react to the answer; a
//! `Transport` only moves one request over the wire. `HttpTransport` is the
//! reqwest-backed implementation with a cookie store, which is how the
//! refresh cookie issued at login travels back on `/auth/refresh`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::ApiError;

/// HTTP request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// A single file sent as a `multipart/form-data` body.
#[derive(Clone, PartialEq)]
pub struct FileUpload {
    /// Form field name.
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    /// An image upload; the content type comes from the file extension.
    pub fn image(field: &str, file_name: &str, bytes: Vec<u8>) -> Result<Self, ApiError> {
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        let content_type = match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            _ => {
                return Err(ApiError::InvalidInput(format!(
                    "Unsupported image type: {}",
                    file_name
                )))
            }
        };
        if bytes.is_empty() {
            return Err(ApiError::InvalidInput(format!("{} is empty", file_name)));
        }
        Ok(Self {
            field: field.to_string(),
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            bytes,
        })
    }
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("field", &self.field)
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// One outbound call. Lives for the duration of a single `send`.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub method: Method,
    /// Path relative to the API base, e.g. `/attendances/me/today`.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Sent instead of `body` when set.
    pub upload: Option<FileUpload>,
    /// Set once the request has been through a refresh; never retried again.
    pub retried: bool,
}

impl PendingRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
            upload: None,
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json<B: Serialize>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn multipart(mut self, upload: FileUpload) -> Self {
        self.body = None;
        self.upload = Some(upload);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Append query parameters, skipping `None` values.
    pub fn query(mut self, params: &[(&str, Option<String>)]) -> Self {
        let encoded: Vec<String> = params
            .iter()
            .filter_map(|(k, v)| {
                v.as_ref()
                    .map(|v| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            })
            .collect();
        if !encoded.is_empty() {
            let sep = if self.path.contains('?') { '&' } else { '?' };
            self.path = format!("{}{}{}", self.path, sep, encoded.join("&"));
        }
        self
    }

    /// Value of the `Authorization` header, if one is set.
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(header::AUTHORIZATION.as_str()))
            .map(|(_, v)| v.as_str())
    }

    /// Replace any existing `Authorization` header with a bearer token.
    pub fn with_bearer(mut self, token: &str) -> Self {
        self.headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case(header::AUTHORIZATION.as_str()));
        self.headers
            .push((header::AUTHORIZATION.as_str().to_string(), format!("Bearer {}", token)));
        self
    }

    pub fn targets(&self, endpoint: &str) -> bool {
        self.path.contains(endpoint)
    }
}

/// A received response of any status.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_str(&self.body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JSON response: {}", e)))
    }

    /// Turn a non-2xx response into `ApiError::Http`.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_status(self.status, self.body))
        }
    }
}

/// Moves one request over the wire.
///
/// Must return `Ok` for every response that was received, whatever its
/// status, and `Err(ApiError::Network)` only when no response arrived.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, request: &PendingRequest) -> Result<ApiResponse, ApiError>;
}

/// reqwest-backed transport. Clone is cheap - reqwest::Client uses Arc
/// internally for connection pooling and the cookie jar.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// `base_url` is the full API prefix, e.g. `https://host/api`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .cookie_store(true)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn dispatch(&self, request: &PendingRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url(&request.path);
        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(header::ACCEPT, "application/json");

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref upload) = request.upload {
            let part = Part::bytes(upload.bytes.clone())
                .file_name(upload.file_name.clone())
                .mime_str(&upload.content_type)?;
            builder = builder.multipart(Form::new().part(upload.field.clone(), part));
        } else if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(method = %request.method, url = %url, status = status, "Response received");

        Ok(ApiResponse { status, body })
    }
}
