//! Test utilities for client testing
//!
//! Provides a scripted transport that replays queued responses and records
//! every request it receives.

use crate::transport::Transport;
use async_trait::async_trait;
use dnac_core::{DnacError, HttpRequest, HttpResponse, Result};
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Transport double. Clones share the same script and recordings.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTransport {
    /// Queued outcomes, consumed front to back
    responses: Arc<Mutex<VecDeque<Result<HttpResponse>>>>,
    /// Record of requests sent
    requests: Arc<Mutex<Vec<HttpRequest>>>,
    /// Number of times `shutdown` ran
    releases: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(&self, response: HttpResponse) -> &Self {
        self.responses.lock().unwrap().push_back(Ok(response));
        self
    }

    pub fn queue_json(&self, status: u16, body: Value) -> &Self {
        self.queue(HttpResponse::new(status, body.to_string()))
    }

    pub fn queue_error(&self, error: DnacError) -> &Self {
        self.responses.lock().unwrap().push_back(Err(error));
        self
    }

    /// Queue a successful login answer carrying `token`.
    pub fn queue_login(&self, token: &str) -> &Self {
        self.queue_json(200, serde_json::json!({ "Token": token }))
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request);

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(DnacError::Connection("No response queued".to_string())))
    }

    fn shutdown(&self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Task body in the controller's schema for a given state.
pub fn task_body(state: dnac_core::TaskState) -> Value {
    use dnac_core::TaskState;
    use serde_json::json;

    match state {
        TaskState::Pending => json!({"response": {"taskId": "t1"}, "version": "1.0"}),
        TaskState::Running => json!({"response": {
            "taskId": "t1",
            "startTime": 1_700_000_000_000u64,
            "progress": "In progress"
        }, "version": "1.0"}),
        TaskState::Succeeded => json!({"response": {
            "taskId": "t1",
            "startTime": 1_700_000_000_000u64,
            "endTime": 1_700_000_007_000u64,
            "progress": "Site created",
            "data": "site-42"
        }, "version": "1.0"}),
        TaskState::Failed => json!({"response": {
            "taskId": "t1",
            "isError": true,
            "errorCode": "NCSP10250",
            "failureReason": "Site already exists",
            "startTime": 1_700_000_000_000u64,
            "endTime": 1_700_000_001_000u64
        }, "version": "1.0"}),
    }
}

/// Log sink shared with a `tracing_subscriber::fmt` writer.
#[derive(Debug, Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a thread-local subscriber and return what it logged.
pub fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .finish();

    let result = tracing::subscriber::with_default(subscriber, f);
    (result, logs.contents())
}
