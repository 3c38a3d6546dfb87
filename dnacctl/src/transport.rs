//! HTTP transport for the controller API.
//!
//! [`Transport`] is the seam between the session and the network. The
//! production implementation wraps a `reqwest::Client`; tests substitute a
//! scripted double.

use async_trait::async_trait;
use dnac_core::{ClientOptions, DnacError, HttpMethod, HttpRequest, HttpResponse, Result};
use std::time::Duration;
use tracing::debug;

/// Trait for HTTP transport abstraction
///
/// Implementations map every network-level failure (DNS, connect, TLS,
/// timeout, body read) to [`DnacError::Connection`]. Status codes are not
/// interpreted here.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one request and capture the response
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;

    /// Release pooled connections. Called at most once per session.
    fn shutdown(&self) {}
}

/// reqwest-backed transport
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Create a transport honoring the TLS and timeout options.
    ///
    /// Redirects are never followed, so a response can't hand the session
    /// off to another origin.
    pub fn new(options: &ClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .danger_accept_invalid_certs(!options.verify_ssl)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("dnacctl/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DnacError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: options.timeout,
        })
    }

    fn connection_error(&self, request: &HttpRequest, err: reqwest::Error) -> DnacError {
        let endpoint = request.url.path();
        let reason = if err.is_timeout() {
            format!("request timed out after {:?}", self.timeout)
        } else if err.is_connect() {
            "failed to connect".to_string()
        } else {
            "request failed".to_string()
        };
        DnacError::Connection(format!(
            "{} {} {}: {}",
            request.method, endpoint, reason, err
        ))
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), request.url.clone());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(credentials) = &request.credentials {
            builder = builder.basic_auth(&credentials.username, Some(&credentials.password));
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.connection_error(&request, e))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| self.connection_error(&request, e))?;

        debug!(
            "{} {} -> {} ({} bytes)",
            request.method,
            request.url.path(),
            status,
            body.len()
        );

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn shutdown(&self) {
        debug!("Releasing HTTP connection pool");
    }
}
