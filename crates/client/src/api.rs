use crate::error::{map_reqwest_error, ApiError, ApiResult};
use crate::types::{GenerateRequest, GenerateResponse};
use async_trait::async_trait;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Client, Method, Request};
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const GENERATE_PATH: &str = "/generate";
pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
const USER_AGENT: &str = "qr-form/0.1";

/// Anything that can turn a form submission into a [`GenerateResponse`].
#[async_trait]
pub trait GenerateBackend: Send + Sync {
    async fn generate(&self, request: &GenerateRequest) -> ApiResult<GenerateResponse>;
}

#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub user_agent: Option<String>,
    pub timeout: Option<Duration>,
    pub connect_timeout: Option<Duration>,
}

#[derive(Clone)]
pub struct GenerateApi {
    http: Client,
    base_url: Url,
}

impl GenerateApi {
    pub fn new(base_url: &str) -> ApiResult<Self> {
        Self::with_options(base_url, ClientOptions::default())
    }

    /// No timeout is set unless the options ask for one.
    pub fn with_options(base_url: &str, options: ClientOptions) -> ApiResult<Self> {
        let base_url =
            Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidBaseUrl(base_url.to_string()));
        }

        let mut builder = Client::builder()
            .user_agent(options.user_agent.as_deref().unwrap_or(USER_AGENT));
        if let Some(timeout) = options.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(connect_timeout) = options.connect_timeout {
            builder = builder.connect_timeout(connect_timeout);
        }
        let http = builder.build()?;

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn generate_url(&self) -> ApiResult<Url> {
        self.base_url
            .join(GENERATE_PATH)
            .map_err(|e| ApiError::InvalidBaseUrl(format!("{}: {e}", self.base_url)))
    }

    pub fn build_request(&self, request: &GenerateRequest) -> ApiResult<Request> {
        let body = serde_json::to_vec(request)?;
        let mut http_request = Request::new(Method::POST, self.generate_url()?);
        http_request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        *http_request.body_mut() = Some(body.into());
        Ok(http_request)
    }
}

#[async_trait]
impl GenerateBackend for GenerateApi {
    async fn generate(&self, request: &GenerateRequest) -> ApiResult<GenerateResponse> {
        let http_request = self.build_request(request)?;
        debug!(url = %http_request.url(), "Submitting QR code request");

        let response = self
            .http
            .execute(http_request)
            .await
            .map_err(map_reqwest_error)?;

        // The status is not consulted: the backend reports rejections as a
        // JSON `error` body on a 4xx.
        let status = response.status();
        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        debug!(%status, len = bytes.len(), "Received QR code response");

        GenerateResponse::from_slice(&bytes)
    }
}
