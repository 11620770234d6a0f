use anyhow::{anyhow, Context};
use bytes::Bytes;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::auth::{ApiSurface, AuthManager};
use crate::config::{Config, HttpSettings};
use crate::error::{ApiError, Result};
use crate::pagination::Paginator;

pub const GRAPH_JSON: &str = "application/json";
pub const SP_ODATA_VERBOSE: &str = "application/json;odata=verbose;charset=utf-8";

/// Body of an outbound request
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Bytes(Bytes),
}

/// Description of one logical call; rebuilt into a fresh request on every attempt
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub surface: ApiSurface,
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
    pub timeout: Option<Duration>,
    /// Human-readable description used in logs and errors
    pub context: String,
}

impl ApiRequest {
    pub fn new(surface: ApiSurface, method: Method, url: impl Into<String>) -> Self {
        Self {
            surface,
            method,
            url: url.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: RequestBody::Empty,
            timeout: None,
            context: "API request".to_string(),
        }
    }

    pub fn get(surface: ApiSurface, url: impl Into<String>) -> Self {
        Self::new(surface, Method::GET, url)
    }

    pub fn post(surface: ApiSurface, url: impl Into<String>) -> Self {
        Self::new(surface, Method::POST, url)
    }

    pub fn patch(surface: ApiSurface, url: impl Into<String>) -> Self {
        Self::new(surface, Method::PATCH, url)
    }

    pub fn delete(surface: ApiSurface, url: impl Into<String>) -> Self {
        Self::new(surface, Method::DELETE, url)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Add a header; overrides the surface default of the same name
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = RequestBody::Bytes(body.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    /// Same request against a continuation URL, which already carries the query
    pub(crate) fn follow(&self, next_url: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.url = next_url.into();
        next.query.clear();
        next
    }
}

/// Accept / Content-Type defaults per surface
pub fn default_headers(surface: ApiSurface) -> [(HeaderName, &'static str); 2] {
    let content = match surface {
        ApiSurface::Graph => GRAPH_JSON,
        ApiSurface::SharePoint => SP_ODATA_VERBOSE,
    };
    [(ACCEPT, content), (CONTENT_TYPE, content)]
}

/// True for conflict responses that only report the target already exists
pub fn is_already_exists(status: StatusCode, body: &str) -> bool {
    matches!(status.as_u16(), 409 | 500) && body.to_lowercase().contains("already exist")
}

/// Exponential backoff for transient network failures
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_settings(settings: &HttpSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts.max(1),
            initial_delay: settings.retry_initial_delay,
            max_delay: settings.retry_max_delay,
        }
    }

    /// Delay before retry number `retry` (0-based): initial * 2^retry, capped, plus up to 10% jitter
    pub fn backoff_delay(&self, retry: u32) -> Duration {
        let base = self
            .initial_delay
            .saturating_mul(2_u32.saturating_pow(retry))
            .min(self.max_delay);
        let jitter = base.mul_f64(rand::thread_rng().gen_range(0.0..0.1));
        base + jitter
    }
}

/// Build the shared reqwest client
pub fn build_client(settings: &HttpSettings) -> Result<Client> {
    let client = Client::builder()
        .connect_timeout(settings.connect_timeout)
        .timeout(settings.request_timeout.max(settings.file_timeout))
        .user_agent(concat!("grafap/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to create HTTP client")?;
    Ok(client)
}

/// HTTP executor for Graph and SharePoint with token injection and retry
pub struct GraphHttpClient {
    /// Shared HTTP client with connection pooling
    client: Client,

    /// Authentication manager
    auth_manager: Arc<AuthManager>,

    retry: RetryPolicy,

    request_timeout: Duration,
    file_timeout: Duration,
}

impl GraphHttpClient {
    pub fn new(config: &Config, auth_manager: Arc<AuthManager>, client: Client) -> Self {
        Self {
            client,
            auth_manager,
            retry: RetryPolicy::from_settings(&config.http),
            request_timeout: config.http.request_timeout,
            file_timeout: config.http.file_timeout,
        }
    }

    /// Timeout for upload/download endpoints
    pub fn file_timeout(&self) -> Duration {
        self.file_timeout
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn auth_manager(&self) -> &Arc<AuthManager> {
        &self.auth_manager
    }

    /// Send with retry on transient network failure; any HTTP status is returned as-is
    pub async fn send(&self, request: &ApiRequest) -> Result<Response> {
        let max_attempts = self.retry.max_attempts;
        let mut attempt = 0;

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            surface = %request.surface,
            "Sending HTTP request: {}",
            request.context
        );

        loop {
            attempt += 1;

            // Token failures abort the call; they are never retried here
            let token = self.auth_manager.ensure_valid_token(request.surface).await?;
            let builder = self.build(request, &token)?;

            match builder.send().await {
                Ok(response) => {
                    tracing::debug!(
                        status = %response.status(),
                        attempt = attempt,
                        "Received HTTP response"
                    );
                    return Ok(response);
                }
                Err(e) if is_transient(&e) => {
                    let error_kind = error_kind(&e);

                    if attempt < max_attempts {
                        let delay = self.retry.backoff_delay(attempt - 1);
                        tracing::warn!(
                            error_kind = error_kind,
                            error = %e,
                            url = %request.url,
                            "Request failed, retrying after {}ms (attempt {}/{})",
                            delay.as_millis(),
                            attempt,
                            max_attempts
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    tracing::error!(
                        error_kind = error_kind,
                        error = %e,
                        url = %request.url,
                        total_attempts = attempt,
                        "HTTP request failed after all retries"
                    );
                    return Err(ApiError::Network {
                        attempts: attempt,
                        message: format!("{}: {} (kind: {})", request.context, e, error_kind),
                    });
                }
                Err(e) if e.is_builder() => {
                    return Err(ApiError::ValidationError(format!(
                        "{}: invalid request: {}",
                        request.context, e
                    )));
                }
                Err(e) => {
                    return Err(ApiError::Internal(
                        anyhow!(e).context(format!("{} failed", request.context)),
                    ));
                }
            }
        }
    }

    /// Send and require a 2xx status
    pub async fn execute(&self, request: &ApiRequest) -> Result<Response> {
        let response = self.send(request).await?;
        ensure_success(response, request).await
    }

    /// Send, require 2xx, and decode the JSON body
    pub async fn execute_json<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        let response = self.execute(request).await?;
        let value = response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response for {}", request.context))?;
        Ok(value)
    }

    /// Send, require 2xx, and return the raw body
    pub async fn execute_bytes(&self, request: &ApiRequest) -> Result<Bytes> {
        let response = self.execute(request).await?;
        let bytes = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read response body for {}", request.context))?;
        Ok(bytes)
    }

    /// Follow continuation links from `request` and return every record in order
    pub async fn fetch_all(&self, request: ApiRequest) -> Result<Vec<Value>> {
        Paginator::new(self, request).collect_all().await
    }

    fn build(&self, request: &ApiRequest, token: &str) -> Result<RequestBuilder> {
        let headers = build_headers(request, token)?;

        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(headers)
            .timeout(request.timeout.unwrap_or(self.request_timeout));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Bytes(bytes) => builder.body(bytes.clone()),
        };

        Ok(builder)
    }
}

fn build_headers(request: &ApiRequest, token: &str) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    for (name, value) in default_headers(request.surface) {
        headers.insert(name, HeaderValue::from_static(value));
    }

    let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| ApiError::AuthError("Access token is not a valid header value".to_string()))?;
    headers.insert(AUTHORIZATION, bearer);

    for (name, value) in &request.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| ApiError::ValidationError(format!("Invalid header name {}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| ApiError::ValidationError(format!("Invalid header value: {}", e)))?;
        headers.insert(name, value);
    }

    Ok(headers)
}

/// Turn a non-2xx response into a service error carrying status and body
pub(crate) async fn ensure_success(response: Response, request: &ApiRequest) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_text = response.text().await.unwrap_or_default();
    tracing::error!(
        status = status.as_u16(),
        url = %request.url,
        response_body = %error_text,
        "{} failed with error response",
        request.context
    );

    Err(ApiError::ServiceError {
        status: status.as_u16(),
        message: error_text,
    })
}

/// Connection failures, resets, and timeouts are presumed transient
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_request()
}

fn error_kind(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}
