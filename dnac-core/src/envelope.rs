//! Response envelope over decoded JSON bodies.
//!
//! [`JsonResponse`] owns the decoded body together with the status code and
//! the request that produced it. Nested lookups go through [`Attr`], which
//! keeps "key is missing" ([`Attr::Absent`]) apart from "key is present and
//! null" (`Attr::Present(&Value::Null)`).

use crate::http::HttpMethod;
use serde_json::{Map, Value};
use std::fmt;

/// Decoded JSON body of a completed request. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonResponse {
    body: Value,
    status: u16,
    method: HttpMethod,
    endpoint: String,
}

impl JsonResponse {
    pub fn new(body: Value, status: u16, method: HttpMethod, endpoint: impl Into<String>) -> Self {
        Self {
            body,
            status,
            method,
            endpoint: endpoint.into(),
        }
    }

    /// The untouched decoded body.
    pub fn raw(&self) -> &Value {
        &self.body
    }

    pub fn into_raw(self) -> Value {
        self.body
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// Endpoint path as passed by the caller (before version resolution).
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Accessor positioned at the root of the body.
    pub fn root(&self) -> Attr<'_> {
        Attr::Present(&self.body)
    }

    /// Top-level attribute access: `response.get("response").get("taskId")`.
    pub fn get(&self, key: &str) -> Attr<'_> {
        self.root().get(key)
    }

    /// Dotted-path access: `response.lookup("response.0.id")`.
    pub fn lookup(&self, path: &str) -> Attr<'_> {
        self.root().lookup(path)
    }

    /// First object anywhere in the body whose `key` equals `needle`.
    pub fn find(&self, needle: &Value, key: &str) -> Option<&Value> {
        find(&self.body, needle, key)
    }

    /// Deserialize the whole body into a typed value.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> crate::Result<T> {
        serde_json::from_value(self.body.clone()).map_err(|e| crate::DnacError::Decode {
            message: format!("Unexpected response shape from {}: {}", self.endpoint, e),
            body: self.body.to_string(),
        })
    }
}

impl fmt::Display for JsonResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(&self.body) {
            Ok(text) => f.write_str(&text),
            Err(_) => write!(f, "{}", self.body),
        }
    }
}

/// Result of an attribute lookup into a JSON tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attr<'a> {
    Present(&'a Value),
    Absent,
}

impl<'a> Attr<'a> {
    /// Look up a key. Missing keys and non-object parents yield `Absent`.
    pub fn get(self, key: &str) -> Attr<'a> {
        match self {
            Attr::Present(Value::Object(map)) => map.get(key).map_or(Attr::Absent, Attr::Present),
            _ => Attr::Absent,
        }
    }

    /// Index into an array. Out of range and non-array parents yield `Absent`.
    pub fn index(self, index: usize) -> Attr<'a> {
        match self {
            Attr::Present(Value::Array(items)) => {
                items.get(index).map_or(Attr::Absent, Attr::Present)
            }
            _ => Attr::Absent,
        }
    }

    /// Follow a dotted path; numeric segments index into arrays.
    pub fn lookup(self, path: &str) -> Attr<'a> {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .fold(self, |current, segment| match current {
                Attr::Present(Value::Array(_)) => match segment.parse::<usize>() {
                    Ok(index) => current.index(index),
                    Err(_) => Attr::Absent,
                },
                _ => current.get(segment),
            })
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Attr::Absent)
    }

    pub fn is_present(&self) -> bool {
        !self.is_absent()
    }

    /// True only for a key that exists and holds `null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Attr::Present(Value::Null))
    }

    pub fn value(self) -> Option<&'a Value> {
        match self {
            Attr::Present(value) => Some(value),
            Attr::Absent => None,
        }
    }

    pub fn as_str(self) -> Option<&'a str> {
        self.value().and_then(Value::as_str)
    }

    pub fn as_i64(self) -> Option<i64> {
        self.value().and_then(Value::as_i64)
    }

    pub fn as_u64(self) -> Option<u64> {
        self.value().and_then(Value::as_u64)
    }

    pub fn as_f64(self) -> Option<f64> {
        self.value().and_then(Value::as_f64)
    }

    pub fn as_bool(self) -> Option<bool> {
        self.value().and_then(Value::as_bool)
    }

    pub fn as_array(self) -> Option<&'a Vec<Value>> {
        self.value().and_then(Value::as_array)
    }

    pub fn as_object(self) -> Option<&'a Map<String, Value>> {
        self.value().and_then(Value::as_object)
    }
}

/// Recursively search objects and arrays for the first object whose `key`
/// equals `needle`.
pub fn find<'a>(value: &'a Value, needle: &Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Array(items) => items.iter().find_map(|item| find(item, needle, key)),
        Value::Object(map) => {
            if map.get(key) == Some(needle) {
                return Some(value);
            }
            map.values()
                .filter(|child| child.is_array() || child.is_object())
                .find_map(|child| find(child, needle, key))
        }
        _ => None,
    }
}

/// Join the values of `keys` present in `object` with `separator`, in the
/// order the keys are given. Strings are rendered without quotes.
pub fn flatten(separator: &str, object: &Value, keys: &[&str]) -> String {
    keys.iter()
        .filter_map(|key| object.get(key))
        .filter(|value| !value.is_null())
        .map(scalar_to_string)
        .collect::<Vec<_>>()
        .join(separator)
}

/// Render a JSON scalar the way an operator expects to read it.
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
