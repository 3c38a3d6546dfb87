//! Base URL normalization and endpoint resolution.
//!
//! Every URL the client sends to must share scheme, host, and port with the
//! session's base URL and stay under its path. Anything else is rejected with
//! [`DnacError::Config`] before a request is built.

use crate::error::{DnacError, Result};
use url::Url;

/// Token endpoint, relative to the `system` version segment
pub const AUTH_TOKEN_PATH: &str = "auth/token";

/// Paths starting with this prefix are already fully versioned.
const VERSIONED_PREFIX: &str = "dna/";

/// Parse `host` into a base URL with an `http` or `https` scheme and a
/// trailing slash on its path.
pub fn normalize_host(host: &str, port: Option<u16>) -> Result<Url> {
    let host = host.trim();
    if host.is_empty() {
        return Err(DnacError::Config("Host cannot be empty".to_string()));
    }
    if !host.contains("://") {
        return Err(DnacError::Config(format!(
            "Host '{}' has no scheme. Must start with http:// or https://",
            host
        )));
    }

    let mut url = Url::parse(host)
        .map_err(|e| DnacError::Config(format!("Invalid host '{}': {}", host, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(DnacError::Config(format!(
                "Unsupported scheme '{}' in host '{}'. Must be http or https",
                other, host
            )))
        }
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(DnacError::Config(format!(
            "Invalid host '{}': no host supplied",
            host
        )));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(DnacError::Config(
            "Credentials must not be embedded in the host URL".to_string(),
        ));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(DnacError::Config(format!(
            "Host '{}' must not carry a query or fragment",
            host
        )));
    }

    if let Some(port) = port {
        url.set_port(Some(port))
            .map_err(|_| DnacError::Config(format!("Cannot set port {} on '{}'", port, host)))?;
    }

    let path = format!("{}/", url.path().trim_end_matches('/'));
    url.set_path(&path);

    Ok(url)
}

/// Resolve `path` against `base`, prefixing `version_segment` unless the path
/// is already versioned (`dna/...`).
pub fn resolve_endpoint(base: &Url, version_segment: &str, path: &str) -> Result<Url> {
    let trimmed = path.trim().trim_start_matches('/').trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(DnacError::Config(
            "Endpoint path cannot be empty".to_string(),
        ));
    }

    let relative = if is_absolute(trimmed) || trimmed.starts_with(VERSIONED_PREFIX) {
        trimmed.to_string()
    } else {
        format!("{}/{}", version_segment.trim_matches('/'), trimmed)
    };

    let url = base
        .join(&relative)
        .map_err(|e| DnacError::Config(format!("Invalid endpoint path '{}': {}", path, e)))?;

    ensure_same_origin(base, &url)?;
    Ok(url)
}

/// A full URL, judged on the part before any query or fragment.
fn is_absolute(path: &str) -> bool {
    let head = path.split(['?', '#']).next().unwrap_or_default();
    head.contains("://") && Url::parse(head).is_ok()
}

/// Reject `url` unless it shares scheme, host, and port with `base` and
/// stays under its path.
pub fn ensure_same_origin(base: &Url, url: &Url) -> Result<()> {
    let same_origin = url.scheme() == base.scheme()
        && url.host_str() == base.host_str()
        && url.port_or_known_default() == base.port_or_known_default();

    if !same_origin || !url.path().starts_with(base.path()) {
        return Err(DnacError::Config(format!(
            "Resolved URL '{}' is outside the controller base URL '{}'",
            url, base
        )));
    }
    Ok(())
}

/// Append query parameters to an already validated URL.
pub fn with_query(mut url: Url, params: &[(String, String)]) -> Url {
    if !params.is_empty() {
        url.query_pairs_mut()
            .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }
    url
}
