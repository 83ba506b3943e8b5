//! The network seam. A [`Connector`] opens one [`Transport`] session per
//! research call; the session is dropped when the call ends, whichever way it
//! ends.

use crate::config::ThesisConfig;
use crate::{Error, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, Method};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the api root, starting with `/`.
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    pub fn post(path: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        }
    }
}

/// Status and raw body. Bodies are kept as text because the service does not
/// always answer with JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
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
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends one request. Errors only for failures below HTTP (connect,
    /// timeout, unreadable body); every status code is an `Ok`.
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse>;
}

pub trait Connector: Send + Sync {
    fn connect(&self) -> Result<Box<dyn Transport>>;
}

pub struct HttpConnector {
    config: ThesisConfig,
}

impl HttpConnector {
    pub fn new(config: ThesisConfig) -> Self {
        Self { config }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", self.config.auth_token))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert("x-device-id", HeaderValue::from_str(&self.config.device_id)?);
        Ok(headers)
    }
}

impl Connector for HttpConnector {
    fn connect(&self) -> Result<Box<dyn Transport>> {
        let root = self.config.api_root();
        if !(root.starts_with("http://") || root.starts_with("https://")) {
            return Err(Error::Config(format!(
                "base url must start with http:// or https://, got {:?}",
                self.config.base_url
            )));
        }

        let client = Client::builder()
            .default_headers(self.headers()?)
            .timeout(self.config.request_timeout)
            .build()?;

        Ok(Box::new(HttpTransport {
            client,
            root: root.to_string(),
        }))
    }
}

pub struct HttpTransport {
    client: Client,
    root: String,
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = format!("{}{}", self.root, request.path);
        debug!(method = %request.method, %url, "sending request");

        let mut builder = self.client.request(request.method, &url);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        debug!(status, bytes = body.len(), "response received");
        Ok(ApiResponse { status, body })
    }
}
