//! ConnectClient - handles communication with the Prusa Connect camera API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use super::ConnectApi;
use crate::camera::{CameraConfig, CameraInfoRequest};
use crate::capture::Frame;

/// The environment variable name for the camera token.
pub const CONNECT_TOKEN_ENV: &str = "PRUSA_CONNECT_TOKEN";

/// Default base URL for the Prusa Connect API.
pub const CONNECT_API_BASE_URL: &str = "https://connect.prusa3d.com";

/// Fingerprint sent with every request.
///
/// Must stay the same across restarts so uploads line up with the
/// registered camera.
pub const DEFAULT_FINGERPRINT: &str = "pi-prusa-cam-device";

/// Snapshot upload path, relative to the base URL.
const SNAPSHOT_PATH: &str = "/c/snapshot";

/// Camera info path, relative to the base URL.
const INFO_PATH: &str = "/c/info";

/// Content type declared for snapshot uploads.
const SNAPSHOT_CONTENT_TYPE: &str = "image/jpg";

const TOKEN_HEADER: &str = "Token";
const FINGERPRINT_HEADER: &str = "Fingerprint";

/// Default timeout for HTTP requests (30 seconds).
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout (10 seconds).
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity sent with every request: the camera token and a stable fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
    fingerprint: String,
}

impl Credentials {
    /// Create credentials with the default fingerprint.
    ///
    /// # Errors
    ///
    /// Returns `ConnectError::MissingToken` if `token` is empty or blank.
    pub fn new(token: impl Into<String>) -> Result<Self, ConnectError> {
        Self::with_fingerprint(token, DEFAULT_FINGERPRINT)
    }

    pub fn with_fingerprint(
        token: impl Into<String>,
        fingerprint: impl Into<String>,
    ) -> Result<Self, ConnectError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ConnectError::MissingToken);
        }
        Ok(Self {
            token,
            fingerprint: fingerprint.into(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Client for the Prusa Connect camera endpoints.
pub struct ConnectClient {
    credentials: Credentials,
    base_url: String,
    http_client: reqwest::Client,
}

impl ConnectClient {
    /// Create a client against the public Prusa Connect service.
    pub fn new(credentials: Credentials) -> Result<Self, ConnectError> {
        Self::with_base_url(credentials, CONNECT_API_BASE_URL.to_string())
    }

    /// Create a client with a custom base URL.
    ///
    /// Useful for testing against a mock server.
    pub fn with_base_url(credentials: Credentials, base_url: String) -> Result<Self, ConnectError> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            credentials,
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Full URL for the snapshot endpoint.
    pub fn snapshot_url(&self) -> String {
        format!("{}{}", self.base_url, SNAPSHOT_PATH)
    }

    /// Full URL for the camera info endpoint.
    pub fn info_url(&self) -> String {
        format!("{}{}", self.base_url, INFO_PATH)
    }

    fn put(&self, url: &str) -> reqwest::RequestBuilder {
        self.http_client
            .put(url)
            .header(TOKEN_HEADER, self.credentials.token())
            .header(FINGERPRINT_HEADER, self.credentials.fingerprint())
    }

    /// Upload one JPEG snapshot.
    ///
    /// Sends a PUT to `/c/snapshot` with the raw image as the body.
    ///
    /// # Errors
    ///
    /// Returns `ConnectError::Api` if the service answers with a non-2xx
    /// status, or `ConnectError::Http` if the request could not be completed.
    pub async fn upload_snapshot(&self, frame: Frame) -> Result<(), ConnectError> {
        let size = frame.len();
        let response = self
            .put(&self.snapshot_url())
            .header(CONTENT_TYPE, SNAPSHOT_CONTENT_TYPE)
            .body(frame.into_bytes())
            .send()
            .await?;

        check_response(response).await?;
        log::debug!("Uploaded snapshot ({} bytes)", size);
        Ok(())
    }

    /// Register the camera's metadata.
    ///
    /// Sends a PUT to `/c/info` with `{"config": {...}}` as JSON.
    ///
    /// # Errors
    ///
    /// Same as [`ConnectClient::upload_snapshot`].
    pub async fn update_camera_info(&self, config: &CameraConfig) -> Result<(), ConnectError> {
        let response = self
            .put(&self.info_url())
            .json(&CameraInfoRequest { config })
            .send()
            .await?;

        check_response(response).await?;
        log::debug!("Updated camera info for {}", config.path);
        Ok(())
    }
}

#[async_trait]
impl ConnectApi for ConnectClient {
    async fn upload_snapshot(&self, frame: Frame) -> Result<(), ConnectError> {
        ConnectClient::upload_snapshot(self, frame).await
    }

    async fn update_camera_info(&self, config: &CameraConfig) -> Result<(), ConnectError> {
        ConnectClient::update_camera_info(self, config).await
    }
}

/// Turn a non-2xx response into `ConnectError::Api`, parsing the body if it is JSON.
async fn check_response(response: reqwest::Response) -> Result<(), ConnectError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let text = response.text().await.unwrap_or_default();
    Err(ConnectError::Api {
        status: status.as_u16(),
        body: parse_error_body(&text),
    })
}

/// Best-effort parse of an error response body.
fn parse_error_body(text: &str) -> Option<serde_json::Value> {
    serde_json::from_str(text).ok()
}

fn describe_body(body: &Option<serde_json::Value>) -> String {
    match body {
        Some(value) => format!(": {}", value),
        None => String::new(),
    }
}

/// Errors that can occur when talking to Prusa Connect.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Camera token not configured")]
    MissingToken,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API request failed with status {status}{}", describe_body(.body))]
    Api {
        /// HTTP status code returned by the service
        status: u16,
        /// Parsed JSON error object, if the body contained one
        body: Option<serde_json::Value>,
    },
}

impl ConnectError {
    /// HTTP status code, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ConnectError::Api { status, .. } => Some(*status),
            ConnectError::Http(e) => e.status().map(|s| s.as_u16()),
            ConnectError::MissingToken => None,
        }
    }
}
