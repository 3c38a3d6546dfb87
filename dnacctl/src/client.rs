//! Session manager and request dispatcher for the Catalyst Centre API.

use crate::transport::{HttpTransport, Transport};
use dnac_core::endpoint::{self, AUTH_TOKEN_PATH};
use dnac_core::options::SYSTEM_API_VERSION;
use dnac_core::{
    classify, ClientOptions, DnacError, HttpMethod, HttpRequest, JsonResponse, Result,
};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use tracing::{debug, info, warn};
use url::Url;

const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const APPLICATION_JSON: &str = "application/json";

/// Authenticated session with a Catalyst Centre controller.
///
/// The session owns its transport and its authentication token:
/// - every endpoint is resolved against the base URL and must stay on the
///   same origin
/// - authenticated calls refuse to run before [`Dnac::login`]
/// - the transport is released exactly once, by [`Dnac::close`] or on drop
///
/// Login and logout take `&mut self`; calls take `&self`. Several sessions
/// may run side by side, each with its own transport and token.
///
/// # Examples
///
/// ```no_run
/// use dnacctl::client::Dnac;
/// use dnac_core::{ClientOptions, PollPolicy};
///
/// # async fn example() -> dnac_core::Result<()> {
/// let mut dnac = Dnac::new("https://10.0.0.1", ClientOptions::default())?;
/// dnac.login("admin", "password").await?;
///
/// let count = dnac.get("network-device/count").await?;
/// println!("{} devices", count.get("response").as_u64().unwrap_or(0));
///
/// let created = dnac
///     .post("site")
///     .json(&serde_json::json!({"type": "area", "site": {"area": {"name": "UK", "parentName": "Global"}}}))
///     .await?;
/// if let Some(task_id) = created.lookup("response.taskId").as_str() {
///     let done = dnac.wait_on_task(task_id, PollPolicy::default()).await?;
///     println!("{}", done.record.summary());
/// }
///
/// dnac.close();
/// # Ok(())
/// # }
/// ```
pub struct Dnac<T: Transport = HttpTransport> {
    base_url: Url,
    options: ClientOptions,
    transport: Option<T>,
    token: Option<String>,
}

impl Dnac<HttpTransport> {
    /// Create a session backed by a reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns [`DnacError::Config`] if:
    /// - The host has no `http://` or `https://` scheme, or can't be parsed
    /// - The options are invalid (zero timeout)
    /// - The HTTP client cannot be created
    pub fn new(host: &str, options: ClientOptions) -> Result<Self> {
        options.validate()?;
        let base_url = endpoint::normalize_host(host, options.port)?;
        let transport = HttpTransport::new(&options)?;
        Ok(Self::assemble(base_url, options, transport))
    }
}

impl<T: Transport> Dnac<T> {
    /// Create a session over a caller-supplied transport.
    pub fn with_transport(host: &str, options: ClientOptions, transport: T) -> Result<Self> {
        options.validate()?;
        let base_url = endpoint::normalize_host(host, options.port)?;
        Ok(Self::assemble(base_url, options, transport))
    }

    fn assemble(base_url: Url, options: ClientOptions, transport: T) -> Self {
        if !options.verify_ssl {
            warn!(
                "TLS certificate verification is disabled for {}",
                base_url
            );
        }
        debug!("Session created for {}", base_url);
        Self {
            base_url,
            options,
            transport: Some(transport),
            token: None,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Current token, for callers that share a read-only snapshot.
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_none()
    }

    fn transport(&self) -> Result<&T> {
        self.transport
            .as_ref()
            .ok_or_else(|| DnacError::Connection("session closed".to_string()))
    }

    /// Resolve `path` through the version map and validate it against the
    /// base URL.
    pub fn endpoint_url(&self, path: &str, version: Option<&str>) -> Result<Url> {
        let segment = self.options.version_map.segment(version)?;
        endpoint::resolve_endpoint(&self.base_url, segment, path)
    }

    /// Authenticate and store the returned token.
    ///
    /// Any previously stored token is discarded first, so a failed login
    /// leaves the session unauthenticated.
    ///
    /// # Errors
    ///
    /// - [`DnacError::Auth`] if the controller answers non-2xx, or with a
    ///   body that carries no token
    /// - [`DnacError::Connection`] on DNS, connect, TLS, or timeout failure
    pub async fn login(&mut self, username: &str, password: &str) -> Result<()> {
        if username.trim().is_empty() {
            return Err(DnacError::Config("Username cannot be empty".to_string()));
        }

        self.token = None;
        let url = self.endpoint_url(AUTH_TOKEN_PATH, Some(SYSTEM_API_VERSION))?;
        let request = HttpRequest::new(HttpMethod::Post, url)
            .header("Accept", APPLICATION_JSON)
            .header("Content-Type", APPLICATION_JSON)
            .basic_auth(username, password);

        let response = self.transport()?.send(request).await?;

        if !response.is_success() {
            return Err(DnacError::Auth {
                message: format!(
                    "Login as '{}' rejected with HTTP {}",
                    username, response.status
                ),
                response: Some(Box::new(response)),
            });
        }

        let token = serde_json::from_str::<Value>(&response.body)
            .ok()
            .and_then(|body| body.get("Token")?.as_str().map(str::to_string))
            .filter(|token| !token.is_empty());

        match token {
            Some(token) => {
                self.token = Some(token);
                info!("Authenticated to {} as {}", self.base_url, username);
                Ok(())
            }
            None => Err(DnacError::Auth {
                message: "No token received in authentication response. \
                          Check the credentials and the controller URL"
                    .to_string(),
                response: Some(Box::new(response)),
            }),
        }
    }

    /// Forget the token. The transport stays open for a later login.
    pub fn logout(&mut self) {
        if self.token.take().is_some() {
            info!("Logged out of {}", self.base_url);
        }
    }

    /// Forget the token and release the transport. Calling it again is a
    /// no-op.
    pub fn close(&mut self) {
        self.token = None;
        if let Some(transport) = self.transport.take() {
            transport.shutdown();
            debug!("Session to {} closed", self.base_url);
        }
    }

    /// Send one authenticated call and classify the response.
    ///
    /// # Errors
    ///
    /// - [`DnacError::Config`]: unknown version, or a path that resolves off
    ///   the controller's origin (nothing is sent)
    /// - [`DnacError::Auth`]: not logged in (nothing is sent), or 401/403
    /// - [`DnacError::Request`] / [`DnacError::Server`]: other 4xx / 5xx
    /// - [`DnacError::Decode`]: 2xx with a body that isn't JSON
    /// - [`DnacError::Connection`]: transport failure or closed session
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        version: Option<&str>,
        params: &[(String, String)],
        data: Option<&Value>,
    ) -> Result<JsonResponse> {
        let transport = self.transport()?;
        let url = endpoint::with_query(self.endpoint_url(path, version)?, params);
        let token = self.token.as_deref().ok_or_else(|| {
            DnacError::auth(format!("Not logged in, refusing to call {}", path))
        })?;

        let mut request = HttpRequest::new(method, url)
            .header("Accept", APPLICATION_JSON)
            .header(AUTH_TOKEN_HEADER, token);
        if let Some(data) = data {
            let body = serde_json::to_string(data).map_err(|e| {
                DnacError::Config(format!("Failed to serialize request body for {}: {}", path, e))
            })?;
            request = request.header("Content-Type", APPLICATION_JSON).body(body);
        }

        debug!("{} {}", method, request.url);
        let response = transport.send(request).await?;
        classify(method, path.trim_matches('/'), response)
    }

    /// Start building a call with an explicit method.
    pub fn call(&self, method: HttpMethod, path: &str) -> ApiCall<'_, T> {
        ApiCall {
            session: self,
            method,
            path: path.to_string(),
            version: None,
            params: Vec::new(),
            data: None,
        }
    }

    pub fn get(&self, path: &str) -> ApiCall<'_, T> {
        self.call(HttpMethod::Get, path)
    }

    pub fn post(&self, path: &str) -> ApiCall<'_, T> {
        self.call(HttpMethod::Post, path)
    }

    pub fn put(&self, path: &str) -> ApiCall<'_, T> {
        self.call(HttpMethod::Put, path)
    }

    pub fn delete(&self, path: &str) -> ApiCall<'_, T> {
        self.call(HttpMethod::Delete, path)
    }

    /// Test basic reachability of the controller.
    ///
    /// Any answer below 500 counts as reachable. Does not require a login and
    /// does not return an error on connection failure.
    pub async fn ping(&self) -> Result<bool> {
        let transport = self.transport()?;
        let request = HttpRequest::new(HttpMethod::Get, self.base_url.clone());

        match transport.send(request).await {
            Ok(response) => Ok(response.status < 500),
            Err(e) => {
                debug!("Ping to {} failed: {}", self.base_url, e);
                Ok(false)
            }
        }
    }
}

impl<T: Transport> Drop for Dnac<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T: Transport> fmt::Debug for Dnac<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dnac")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.is_authenticated())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// A pending call. Await it directly, or call [`ApiCall::send`].
#[must_use = "an ApiCall does nothing until it is awaited"]
pub struct ApiCall<'a, T: Transport> {
    session: &'a Dnac<T>,
    method: HttpMethod,
    path: String,
    version: Option<String>,
    params: Vec<(String, String)>,
    data: Option<Result<Value>>,
}

impl<'a, T: Transport> ApiCall<'a, T> {
    /// Logical API version (`v1`, `v2`, ...). Defaults to the version map's
    /// default.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Append a query parameter.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Send `body` as the JSON request body.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Self {
        self.data = Some(serde_json::to_value(body).map_err(|e| {
            DnacError::Config(format!("Failed to serialize request body: {}", e))
        }));
        self
    }

    pub async fn send(self) -> Result<JsonResponse> {
        let data = self.data.transpose()?;
        self.session
            .request(
                self.method,
                &self.path,
                self.version.as_deref(),
                &self.params,
                data.as_ref(),
            )
            .await
    }
}

impl<'a, T: Transport + 'a> IntoFuture for ApiCall<'a, T> {
    type Output = Result<JsonResponse>;
    type IntoFuture = Pin<Box<dyn Future<Output = Result<JsonResponse>> + Send + 'a>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(self.send())
    }
}
