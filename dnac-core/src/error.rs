//! Error types for the Catalyst Centre client

use crate::envelope::JsonResponse;
use crate::http::HttpResponse;
use std::time::Duration;
use thiserror::Error;

/// Every failure the client can surface to its caller.
#[derive(Error, Debug)]
pub enum DnacError {
    /// Bad host, URL, or option value. Detected before any network call.
    #[error("Configuration error: {0}")]
    Config(String),

    /// DNS, connect, TLS, or timeout failure, or use of a closed session
    #[error("Connection error: {0}")]
    Connection(String),

    /// Login rejected, or an authenticated call returned 401/403
    #[error("Authentication failed: {message}")]
    Auth {
        message: String,
        response: Option<Box<HttpResponse>>,
    },

    /// 4xx other than 401/403
    #[error("Request failed (HTTP {status}): {message}")]
    Request {
        status: u16,
        message: String,
        response: Box<HttpResponse>,
    },

    /// 5xx
    #[error("Server error (HTTP {status}): {message}")]
    Server {
        status: u16,
        message: String,
        response: Box<HttpResponse>,
    },

    /// 2xx whose body is not valid JSON, or JSON of an unexpected shape
    #[error("Failed to decode response: {message}")]
    Decode { message: String, body: String },

    /// The task reached a failed terminal state
    #[error("Task {task_id} failed: {reason}")]
    Task {
        task_id: String,
        reason: String,
        response: Box<JsonResponse>,
    },

    /// Polling exceeded its deadline without a terminal task state
    #[error(
        "Task {task_id} did not complete within the time-out ({} seconds, waited {:.1}s)",
        timeout.as_secs_f64(),
        elapsed.as_secs_f64()
    )]
    Timeout {
        task_id: String,
        elapsed: Duration,
        timeout: Duration,
    },
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, DnacError>;

impl DnacError {
    /// HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            DnacError::Request { status, .. } | DnacError::Server { status, .. } => Some(*status),
            DnacError::Auth { response, .. } => response.as_ref().map(|r| r.status),
            DnacError::Task { response, .. } => Some(response.status()),
            _ => None,
        }
    }

    /// Raw HTTP response that triggered the error, if any.
    pub fn http_response(&self) -> Option<&HttpResponse> {
        match self {
            DnacError::Request { response, .. } | DnacError::Server { response, .. } => {
                Some(response.as_ref())
            }
            DnacError::Auth { response, .. } => response.as_deref(),
            _ => None,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, DnacError::Auth { .. })
    }

    /// Auth error with no response attached.
    pub fn auth(message: impl Into<String>) -> Self {
        DnacError::Auth {
            message: message.into(),
            response: None,
        }
    }
}
