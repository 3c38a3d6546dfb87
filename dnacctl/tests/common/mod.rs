//! Mock Catalyst Centre controller for integration testing.

#![allow(dead_code)]

use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "secret";
pub const TOKEN: &str = "mock-token";

/// `Basic` credentials for admin:secret
const BASIC_AUTH: &str = "Basic YWRtaW46c2VjcmV0";

/// Mock controller state
#[derive(Debug, Clone, Default)]
pub struct MockControllerState {
    /// Polls served per task id
    pub task_polls: Arc<Mutex<HashMap<String, u32>>>,
    /// Bodies received by `POST site`
    pub created_sites: Arc<Mutex<Vec<Value>>>,
    /// Number of login attempts
    pub logins: Arc<Mutex<u32>>,
}

impl MockControllerState {
    pub fn polls(&self, task_id: &str) -> u32 {
        self.task_polls
            .lock()
            .unwrap()
            .get(task_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn logins(&self) -> u32 {
        *self.logins.lock().unwrap()
    }
}

/// Mock controller
#[derive(Debug, Default)]
pub struct MockController {
    state: MockControllerState,
    port: u16,
}

impl MockController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the controller and return its base URL
    pub async fn start(mut self) -> Result<(Self, String)> {
        let app = create_router(self.state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        self.port = listener.local_addr()?.port();
        let base_url = format!("http://127.0.0.1:{}", self.port);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Mock controller error: {}", e);
            }
        });

        for _ in 0..20 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        Ok((self, base_url))
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn state(&self) -> &MockControllerState {
        &self.state
    }
}

fn create_router(state: MockControllerState) -> Router {
    Router::new()
        .route("/", get(|| async { "Catalyst Centre" }))
        .route("/dna/system/api/v1/auth/token", post(auth_token_handler))
        .route("/dna/intent/api/v1/network-device", get(devices_handler))
        .route("/dna/intent/api/v1/network-device/count", get(device_count_handler))
        .route("/dna/intent/api/v1/site", post(create_site_handler))
        .route("/dna/intent/api/v2/site", get(sites_v2_handler))
        .route("/dna/intent/api/v1/task/:id", get(task_handler))
        .route("/dna/intent/api/v1/broken", get(broken_handler))
        .route("/dna/intent/api/v1/login-page", get(login_page_handler))
        .route("/dna/intent/api/v1/forbidden", get(forbidden_handler))
        .with_state(state)
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("x-auth-token")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|token| token == TOKEN)
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"response": {"errorCode": "UNAUTHORIZED", "message": "Invalid token"}})),
    )
        .into_response()
}

async fn auth_token_handler(
    State(state): State<MockControllerState>,
    headers: HeaderMap,
) -> Response {
    *state.logins.lock().unwrap() += 1;

    let credentials = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if credentials == Some(BASIC_AUTH) {
        Json(json!({ "Token": TOKEN })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Authentication has failed. Please provide valid credentials."})),
        )
            .into_response()
    }
}

async fn devices_handler(
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let devices = vec![
        json!({"id": "d1", "hostname": "edge-1", "managementIpAddress": "10.0.0.1", "role": "ACCESS"}),
        json!({"id": "d2", "hostname": "core-1", "managementIpAddress": "10.0.0.2", "role": "CORE"}),
        json!({"id": "d3", "hostname": "edge-2", "managementIpAddress": "10.0.0.3", "role": "ACCESS"}),
    ];
    let limit = params
        .get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(devices.len());
    let devices: Vec<Value> = devices
        .into_iter()
        .filter(|d| params.get("role").map_or(true, |role| d["role"] == role.as_str()))
        .take(limit)
        .collect();

    Json(json!({"response": devices, "version": "1.0"})).into_response()
}

async fn device_count_handler(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"response": 3, "version": "1.0"})).into_response()
}

async fn sites_v2_handler(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({"response": [{"id": "s1", "name": "Global", "nameHierarchy": "Global"}], "version": "2.0"}))
        .into_response()
}

async fn create_site_handler(
    State(state): State<MockControllerState>,
    headers: HeaderMap,
    body: Option<Json<Value>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let Some(Json(body)) = body else {
        return (StatusCode::BAD_REQUEST, "missing body").into_response();
    };
    if body.get("type").is_none() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"response": {
                "errorCode": "NCND00001",
                "message": "Invalid input",
                "detail": "type is missing"
            }})),
        )
            .into_response();
    }

    let task_id = match body.pointer("/site/area/name").and_then(Value::as_str) {
        Some("Duplicate") => "task-fail",
        Some("Stuck") => "task-stuck",
        _ => "task-1",
    };
    state.created_sites.lock().unwrap().push(body);

    (
        StatusCode::ACCEPTED,
        Json(json!({
            "response": {"taskId": task_id, "url": format!("/api/v1/task/{}", task_id)},
            "version": "1.0"
        })),
    )
        .into_response()
}

/// `task-1` succeeds on its third poll, `task-fail` fails on its second,
/// `task-stuck` never finishes.
async fn task_handler(
    State(state): State<MockControllerState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let poll = {
        let mut polls = state.task_polls.lock().unwrap();
        let count = polls.entry(id.clone()).or_insert(0);
        *count += 1;
        *count
    };

    let task = match (id.as_str(), poll) {
        ("task-1", 1) => json!({"taskId": id}),
        ("task-1", 2) => json!({"taskId": id, "startTime": 1_700_000_000_000u64, "progress": "Creating site"}),
        ("task-1", _) => json!({
            "taskId": id,
            "startTime": 1_700_000_000_000u64,
            "endTime": 1_700_000_002_500u64,
            "progress": "Site created",
            "data": "site-42"
        }),
        ("task-fail", 1) => json!({"taskId": id, "startTime": 1_700_000_000_000u64}),
        ("task-fail", _) => json!({
            "taskId": id,
            "isError": true,
            "errorCode": "NCSP10250",
            "failureReason": "Site already exists",
            "startTime": 1_700_000_000_000u64,
            "endTime": 1_700_000_000_500u64
        }),
        ("task-stuck", _) => json!({"taskId": id, "startTime": 1_700_000_000_000u64, "progress": "Waiting"}),
        _ => {
            return (
                StatusCode::NOT_FOUND,
                Json(json!({"response": {"errorCode": "NCTS00001", "message": "Task not found"}})),
            )
                .into_response()
        }
    };

    Json(json!({"response": task, "version": "1.0"})).into_response()
}

async fn broken_handler() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
}

async fn login_page_handler(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    (
        [(header::CONTENT_TYPE, "text/html")],
        "<html><body>Please log in</body></html>",
    )
        .into_response()
}

async fn forbidden_handler() -> Response {
    (StatusCode::FORBIDDEN, "").into_response()
}
