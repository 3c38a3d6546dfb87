//! Classification of HTTP responses into envelopes or errors.

use crate::envelope::{flatten, JsonResponse};
use crate::error::{DnacError, Result};
use crate::http::{HttpMethod, HttpResponse};
use serde_json::Value;

/// Keys joined into the error message when an error body carries a
/// `response` object.
const ERROR_DETAIL_KEYS: [&str; 3] = ["errorCode", "message", "detail"];

/// Longest plain-text error body quoted verbatim in an error message.
const MAX_QUOTED_BODY: usize = 200;

/// Turn a completed exchange into a [`JsonResponse`] or a classified error.
///
/// - 2xx: decode the body (empty decodes to `{}`), or [`DnacError::Decode`]
/// - 401/403: [`DnacError::Auth`]
/// - 5xx: [`DnacError::Server`]
/// - everything else: [`DnacError::Request`]
pub fn classify(method: HttpMethod, endpoint: &str, response: HttpResponse) -> Result<JsonResponse> {
    let status = response.status;

    if response.is_success() {
        let body = if response.body.trim().is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(&response.body).map_err(|e| DnacError::Decode {
                message: format!("Failed to parse JSON response from {}: {}", endpoint, e),
                body: response.body.clone(),
            })?
        };
        return Ok(JsonResponse::new(body, status, method, endpoint));
    }

    let message = error_message(endpoint, &response);
    let response = Box::new(response);

    Err(match status {
        401 | 403 => DnacError::Auth {
            message,
            response: Some(response),
        },
        500..=599 => DnacError::Server {
            status,
            message,
            response,
        },
        _ => DnacError::Request {
            status,
            message,
            response,
        },
    })
}

/// Build an operator-facing message for a non-2xx response.
fn error_message(endpoint: &str, response: &HttpResponse) -> String {
    let summary = match response.status {
        401 => format!("Unauthorized access to {}", endpoint),
        403 => format!("Access forbidden to {}", endpoint),
        404 => format!("Endpoint {} not found", endpoint),
        400 => format!("Bad request to {}", endpoint),
        300..=399 => format!("Unexpected redirect from {}", endpoint),
        503 => format!("Service unavailable at {}", endpoint),
        500..=599 => format!("Server error at {}", endpoint),
        status => format!("HTTP {} error at {}", status, endpoint),
    };

    match error_detail(&response.body) {
        Some(detail) => format!("{}: {}", summary, detail),
        None => summary,
    }
}

/// Pull a reason out of an error body: the flattened `response` object if the
/// body is controller JSON, otherwise a short plain-text body.
fn error_detail(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }

    if let Ok(json) = serde_json::from_str::<Value>(body) {
        let detail = match json.get("response") {
            Some(inner @ Value::Object(_)) => flatten(": ", inner, &ERROR_DETAIL_KEYS),
            _ => flatten(": ", &json, &ERROR_DETAIL_KEYS),
        };
        return (!detail.is_empty()).then_some(detail);
    }

    (body.len() <= MAX_QUOTED_BODY && !body.starts_with('<')).then(|| body.to_string())
}
