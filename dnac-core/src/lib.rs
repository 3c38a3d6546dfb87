//! dnac-core
//!
//! Transport-free building blocks for the Catalyst Centre (DNA Center) API
//! client: the error taxonomy, the JSON response envelope, endpoint
//! resolution, response classification, and the task polling schedule.
//! This crate performs no network or file I/O.

pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod http;
pub mod options;
pub mod response;
pub mod task;

// Re-export commonly used types
pub use envelope::{Attr, JsonResponse};
pub use error::*;
pub use http::{Credentials, HttpMethod, HttpRequest, HttpResponse};
pub use options::{ClientOptions, VersionMap, DEFAULT_API_VERSION, DEFAULT_TIMEOUT};
pub use response::classify;
pub use task::{PollPolicy, TaskRecord, TaskState};
