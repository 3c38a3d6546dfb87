//! Client options and the API version map

use crate::error::{DnacError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Logical version used when a call does not name one
pub const DEFAULT_API_VERSION: &str = "v1";

/// Logical version of the token endpoint
pub const SYSTEM_API_VERSION: &str = "system";

/// Maps logical version names (`v1`, `v2`, `system`) to URL path segments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionMap {
    versions: BTreeMap<String, String>,
    default_version: String,
}

impl Default for VersionMap {
    fn default() -> Self {
        let mut versions = BTreeMap::new();
        versions.insert("v1".to_string(), "dna/intent/api/v1".to_string());
        versions.insert("v2".to_string(), "dna/intent/api/v2".to_string());
        versions.insert(
            SYSTEM_API_VERSION.to_string(),
            "dna/system/api/v1".to_string(),
        );

        Self {
            versions,
            default_version: DEFAULT_API_VERSION.to_string(),
        }
    }
}

impl VersionMap {
    /// Add or replace a mapping. Returns the previous segment, if any.
    pub fn insert(&mut self, name: impl Into<String>, segment: impl Into<String>) -> Option<String> {
        let segment = segment.into().trim_matches('/').to_string();
        self.versions.insert(name.into(), segment)
    }

    /// Change the version used when a call does not name one.
    pub fn with_default(mut self, name: &str) -> Result<Self> {
        if !self.versions.contains_key(name) {
            return Err(DnacError::Config(format!(
                "Default API version '{}' is not in the version map",
                name
            )));
        }
        self.default_version = name.to_string();
        Ok(self)
    }

    pub fn default_version(&self) -> &str {
        &self.default_version
    }

    /// Path segment for `version`, or for the default version when `None`.
    pub fn segment(&self, version: Option<&str>) -> Result<&str> {
        let name = version.unwrap_or(&self.default_version);
        self.versions
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| DnacError::Config(format!("Unknown API version '{}'", name)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.versions.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Options accepted when constructing a session.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientOptions {
    /// Verify the controller's TLS certificate
    pub verify_ssl: bool,
    /// Per-request timeout
    pub timeout: Duration,
    /// Port override applied to the host URL
    pub port: Option<u16>,
    pub version_map: VersionMap,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            verify_ssl: true,
            timeout: DEFAULT_TIMEOUT,
            port: None,
            version_map: VersionMap::default(),
        }
    }
}

impl ClientOptions {
    pub fn with_verify_ssl(mut self, verify_ssl: bool) -> Self {
        self.verify_ssl = verify_ssl;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_version_map(mut self, version_map: VersionMap) -> Self {
        self.version_map = version_map;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(DnacError::Config(
                "Timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
