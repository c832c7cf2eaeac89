//! Mathpix client implementation
//!
//! This module provides the HTTP transport shared by every Mathpix resource.
//! It handles authentication headers, endpoint construction, retries and
//! mapping of error responses.

use std::path::Path;
use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::multipart::{Form, Part};
use reqwest::{Client as HttpClient, ClientBuilder, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use super::{MpxConfig, MpxCredentials};
use crate::error::{Error, Result};
use crate::{TRACING_TARGET_CLIENT, TRACING_TARGET_HTTP};

/// Client for the Mathpix v3 API.
///
/// The client is cheap to clone; every resource handle ([`Image`], [`Pdf`],
/// [`Conversion`], [`FileBatch`]) keeps its own clone.
///
/// [`Image`]: crate::Image
/// [`Pdf`]: crate::Pdf
/// [`Conversion`]: crate::Conversion
/// [`FileBatch`]: crate::FileBatch
///
/// # Examples
///
/// ```rust,ignore
/// use mpx_client::{MpxClient, MpxConfig, MpxCredentials};
///
/// let config = MpxConfig::builder()
///     .with_api_url("https://api.mathpix.com")?
///     .build()?;
///
/// let credentials = MpxCredentials::new("my-app-id", "my-app-key")?;
/// let client = MpxClient::new(config, credentials)?;
/// ```
#[derive(Debug, Clone)]
pub struct MpxClient {
    http_client: HttpClient,
    config: MpxConfig,
    credentials: MpxCredentials,
}

impl MpxClient {
    /// Create a new client with the given configuration and credentials.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: MpxConfig, credentials: MpxCredentials) -> Result<Self> {
        tracing::debug!(
            target: TRACING_TARGET_CLIENT,
            api_url = %config.api_url,
            app_id = credentials.app_id(),
            "Creating Mathpix client"
        );

        let http_client = ClientBuilder::new()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(Error::Http)?;

        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            api_url = %config.api_url,
            "Mathpix client initialized"
        );

        Ok(Self {
            http_client,
            config,
            credentials,
        })
    }

    /// Create a client from `MATHPIX_APP_ID`, `MATHPIX_APP_KEY` and `MATHPIX_URL`.
    pub fn from_env() -> Result<Self> {
        let config = MpxConfig::from_env()?;
        let credentials = MpxCredentials::from_env()?;
        Self::new(config, credentials)
    }

    /// Get the client configuration.
    pub fn config(&self) -> &MpxConfig {
        &self.config
    }

    /// Get the application id used for requests.
    pub fn app_id(&self) -> &str {
        self.credentials.app_id()
    }

    /// Whether requests go to the production Mathpix API.
    pub fn is_production(&self) -> bool {
        self.config.is_production()
    }

    /// Build an endpoint URL by appending path segments to the API URL.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.config.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::invalid_config(format!("Invalid API URL: {}", self.config.api_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Start a request carrying the authentication headers.
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http_client
            .request(method, url)
            .header("app_id", self.credentials.app_id())
            .header("app_key", self.credentials.app_key())
    }

    /// GET `url` and return the raw response once its status is successful.
    pub(crate) async fn get(&self, url: Url) -> Result<Response> {
        self.execute(|| Ok(self.request(Method::GET, url.clone())))
            .await
    }

    /// GET `url` and decode the JSON body.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.get(url).await?;
        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// POST a JSON body to `url` and decode the JSON response.
    pub(crate) async fn post_json<B, T>(&self, url: Url, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .execute(|| Ok(self.request(Method::POST, url.clone()).json(body)))
            .await?;
        decode_body(response).await
    }

    /// POST without a body to `url` and decode the JSON response.
    pub(crate) async fn post_empty<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .execute(|| Ok(self.request(Method::POST, url.clone())))
            .await?;
        decode_body(response).await
    }

    /// Upload a local file as multipart form data alongside `options_json`.
    pub(crate) async fn post_file<T: DeserializeOwned>(
        &self,
        url: Url,
        path: &Path,
        options_json: String,
    ) -> Result<T> {
        let is_file = tokio::fs::metadata(path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false);
        if !is_file {
            tracing::error!(
                target: TRACING_TARGET_HTTP,
                path = %path.display(),
                "File not found"
            );
            return Err(Error::file_not_found(path));
        }

        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        let mime_type = mime_type(path);

        tracing::debug!(
            target: TRACING_TARGET_HTTP,
            url = %url,
            size = bytes.len(),
            mime_type,
            "Uploading file"
        );

        let response = self
            .execute(|| {
                let part = Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime_type)
                    .map_err(Error::Http)?;
                let form = Form::new()
                    .text("options_json", options_json.clone())
                    .part("file", part);
                Ok(self.request(Method::POST, url.clone()).multipart(form))
            })
            .await?;
        decode_body(response).await
    }

    /// Execute a request with automatic retry on retryable errors.
    async fn execute<F>(&self, build: F) -> Result<Response>
    where
        F: Fn() -> Result<RequestBuilder>,
    {
        let max_retries = self.config.max_retries;
        let mut attempt = 0;

        loop {
            let result = match build()?.send().await {
                Ok(response) => check_status(response).await,
                Err(err) => Err(Error::Http(err)),
            };

            match result {
                Ok(response) => {
                    if attempt > 0 {
                        tracing::info!(
                            target: TRACING_TARGET_HTTP,
                            attempt = attempt + 1,
                            "Request succeeded after retry"
                        );
                    }
                    return Ok(response);
                }
                Err(err) if err.is_retryable() && attempt < max_retries => {
                    attempt += 1;
                    let delay = err
                        .retry_delay()
                        .unwrap_or(self.config.retry_backoff * attempt);

                    tracing::warn!(
                        target: TRACING_TARGET_HTTP,
                        attempt,
                        max_retries,
                        backoff_ms = delay.as_millis() as u64,
                        error = %err,
                        "Request failed, retrying"
                    );

                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    tracing::error!(
                        target: TRACING_TARGET_HTTP,
                        attempt = attempt + 1,
                        error = %err,
                        "Request failed permanently"
                    );
                    return Err(err);
                }
            }
        }
    }
}

/// Map a non-success response to an [`Error`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();

    tracing::debug!(
        target: TRACING_TARGET_HTTP,
        url = %response.url(),
        status = status.as_u16(),
        "Received response"
    );

    if status.is_success() {
        return Ok(response);
    }

    let retry_after = parse_retry_after(response.headers());
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Unknown error")
            .to_string()
    });

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::authentication(message),
        StatusCode::TOO_MANY_REQUESTS => Error::rate_limited(retry_after),
        _ => Error::api(status.as_u16(), message),
    })
}

/// Decode a successful JSON body, surfacing an embedded `error` field.
///
/// Status endpoints report failures in the same field, so only submissions
/// are decoded through here.
async fn decode_body<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status().as_u16();
    let text = response.text().await?;
    let value: serde_json::Value = serde_json::from_str(&text)?;

    if let Some(message) = embedded_error(&value) {
        tracing::error!(
            target: TRACING_TARGET_HTTP,
            status,
            error = %message,
            "Response reported an error"
        );
        return Err(Error::api(status, message));
    }

    Ok(serde_json::from_value(value)?)
}

/// Extract the `error` field of a Mathpix response body, if any.
pub(crate) fn embedded_error(value: &serde_json::Value) -> Option<String> {
    match value.get("error")? {
        serde_json::Value::Null => None,
        serde_json::Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}

fn error_message(body: &str) -> Option<String> {
    if body.trim().is_empty() {
        return None;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => embedded_error(&value).or_else(|| Some(body.to_string())),
        Err(_) => Some(body.to_string()),
    }
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Determine MIME type from file path.
fn mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Json;
    use axum::Router;
    use axum::http::{HeaderMap as AxumHeaders, StatusCode as AxumStatus};
    use axum::response::IntoResponse;
    use axum::routing::{get, post};
    use serde_json::{Value, json};

    use super::*;
    use crate::testing::{spawn_server, test_client};

    #[test]
    fn test_mime_type_detection() {
        assert_eq!(mime_type(Path::new("paper.pdf")), "application/pdf");
        assert_eq!(mime_type(Path::new("scan.PNG")), "image/png");
        assert_eq!(mime_type(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(mime_type(Path::new("noextension")), "application/octet-stream");
    }

    #[test]
    fn test_embedded_error() {
        assert_eq!(
            embedded_error(&json!({ "error": "bad mmd" })),
            Some("bad mmd".to_string())
        );
        assert_eq!(embedded_error(&json!({ "error": null })), None);
        assert_eq!(embedded_error(&json!({ "pdf_id": "abc" })), None);
    }

    #[test]
    fn test_error_message() {
        assert_eq!(
            error_message(r#"{"error":"Invalid credentials"}"#),
            Some("Invalid credentials".to_string())
        );
        assert_eq!(error_message("plain text"), Some("plain text".to_string()));
        assert_eq!(error_message(""), None);
    }

    #[tokio::test]
    async fn test_endpoint_with_path_prefix() {
        let client = test_client("http://localhost:8070/api");
        let url = client.endpoint(&["v3", "pdf", "abc.docx"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8070/api/v3/pdf/abc.docx");

        let client = test_client("http://localhost:8070/");
        let url = client.endpoint(&["v3", "converter"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8070/v3/converter");
    }

    #[tokio::test]
    async fn test_sends_authentication_headers() {
        let router = Router::new().route(
            "/v3/echo",
            get(|headers: AxumHeaders| async move {
                let header = |name: &str| {
                    headers
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string()
                };
                Json(json!({ "app_id": header("app_id"), "app_key": header("app_key") }))
            }),
        );
        let client = test_client(&spawn_server(router).await);

        let url = client.endpoint(&["v3", "echo"]).unwrap();
        let body: Value = client.get_json(url).await.unwrap();
        assert_eq!(body["app_id"], "test-app");
        assert_eq!(body["app_key"], "test-key");
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/v3/flaky",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        AxumStatus::SERVICE_UNAVAILABLE.into_response()
                    } else {
                        Json(json!({ "ok": true })).into_response()
                    }
                }
            }),
        );
        let client = test_client(&spawn_server(router).await);

        let url = client.endpoint(&["v3", "flaky"]).unwrap();
        let body: Value = client.get_json(url).await.unwrap();
        assert_eq!(body["ok"], true);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_after_overrides_backoff() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/v3/limited",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        (AxumStatus::TOO_MANY_REQUESTS, [("retry-after", "1")]).into_response()
                    } else {
                        Json(json!({ "ok": true })).into_response()
                    }
                }
            }),
        );
        let client = test_client(&spawn_server(router).await);

        let started = std::time::Instant::now();
        let url = client.endpoint(&["v3", "limited"]).unwrap();
        let body: Value = client.get_json(url).await.unwrap();

        assert_eq!(body["ok"], true);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() >= Duration::from_millis(950));
    }

    #[tokio::test]
    async fn test_rate_limit_exhausts_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/v3/limited",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    AxumStatus::TOO_MANY_REQUESTS
                }
            }),
        );
        let client = test_client(&spawn_server(router).await);

        let url = client.endpoint(&["v3", "limited"]).unwrap();
        let err = client.get_json::<Value>(url).await.unwrap_err();

        assert!(matches!(err, Error::RateLimited { retry_after: None }));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_does_not_retry_client_errors() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/v3/missing",
            get(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    (AxumStatus::NOT_FOUND, Json(json!({ "error": "Not found" })))
                }
            }),
        );
        let client = test_client(&spawn_server(router).await);

        let url = client.endpoint(&["v3", "missing"]).unwrap();
        let err = client.get_json::<Value>(url).await.unwrap_err();
        assert!(matches!(err, Error::Api { status: 404, ref message } if message == "Not found"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_maps_authentication_failures() {
        let router = Router::new().route(
            "/v3/text",
            post(|| async { (AxumStatus::UNAUTHORIZED, "Invalid credentials") }),
        );
        let client = test_client(&spawn_server(router).await);

        let url = client.endpoint(&["v3", "text"]).unwrap();
        let err = client
            .post_json::<_, Value>(url, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Authentication { .. }));
    }

    #[tokio::test]
    async fn test_missing_upload_file() {
        let client = test_client("http://127.0.0.1:9");
        let url = client.endpoint(&["v3", "pdf"]).unwrap();
        let err = client
            .post_file::<Value>(url, Path::new("does/not/exist.pdf"), "{}".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
