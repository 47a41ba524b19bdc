use crate::config::ClientConfig;
use crate::ewhs_api::auth::{Clock, Credentials, SystemClock, TokenManager};
use crate::ewhs_api::resources::{Orders, Shipments, Stock};
use crate::ewhs_api::types::{ApiError, EwhsError};
use crate::ewhs_api::user_agent::UserAgent;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use sysinfo::System;

/// Version reported in the `Ewarehousing` user-agent component
pub const CLIENT_VERSION: &str = env!("CARGO_PKG_VERSION");

const RUST_VERSION: &str = match option_env!("CARGO_PKG_RUST_VERSION") {
    Some(version) if !version.is_empty() => version,
    _ => "unknown",
};

static CLIENT_INFO_HEADER: HeaderName = HeaderName::from_static("x-ewhs-client-info");
static CUSTOMER_CODE_HEADER: HeaderName = HeaderName::from_static("x-customer-code");
static WMS_CODE_HEADER: HeaderName = HeaderName::from_static("x-wms-code");

/// One call against a resource endpoint
///
/// Targets `{base}/api/{resource}` or `{base}/api/{resource}/{id}`.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    method: Method,
    resource: String,
    id: Option<String>,
    body: Option<Value>,
    params: Vec<(String, String)>,
}

impl ResourceRequest {
    pub fn new(method: Method, resource: impl Into<String>) -> Self {
        Self {
            method,
            resource: resource.into(),
            id: None,
            body: None,
            params: Vec::new(),
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Query parameters, passed through verbatim
    pub fn params<K, V>(mut self, params: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.params
            .extend(params.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Full endpoint URL for this request
    pub fn url(&self, base_url: &str) -> String {
        let url = format!("{}/api/{}", base_url, self.resource);
        match &self.id {
            Some(id) => format!("{}/{}", url, id),
            None => url,
        }
    }
}

/// HTTP client for the eWarehousing API
///
/// Clones share the connection pool and the token state, so a login made
/// through one clone is reused by all of them. User-agent components are
/// per clone.
#[derive(Debug, Clone)]
pub struct EwhsClient {
    /// API base URL without trailing slash
    base_url: String,
    /// HTTP client for making requests
    http: reqwest::Client,
    tokens: Arc<TokenManager>,
    user_agent: UserAgent,
    /// Value of the `X-Ewhs-Client-Info` header
    client_info: String,
}

impl EwhsClient {
    /// Create a new client
    ///
    /// No network call is made until the first request.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ewhs_sdk::{ClientConfig, EwhsClient};
    ///
    /// # fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let config = ClientConfig::new("api-user", "secret").with_customer_code("CUST01");
    /// let client = EwhsClient::new(config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: ClientConfig) -> Result<Self, EwhsError> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a client that reads the time from `clock`
    pub fn with_clock(config: ClientConfig, clock: Arc<dyn Clock>) -> Result<Self, EwhsError> {
        config.validate()?;

        let base_url = config.api_url().to_string();
        tracing::debug!("Creating EwhsClient with base URL: {}", base_url);

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(|e| {
            tracing::error!("Failed to build HTTP client: {}", e);
            EwhsError::Config(format!("Failed to build HTTP client: {}", e))
        })?;

        let credentials = Credentials::new(config.username, config.password)
            .with_customer_code(config.customer_code)
            .with_wms_code(config.wms_code);
        let tokens = TokenManager::new(base_url.clone(), credentials, http.clone(), clock);

        let mut user_agent = UserAgent::new();
        user_agent.set("Ewarehousing", CLIENT_VERSION, true);
        user_agent.set("Rust", RUST_VERSION, true);

        Ok(Self {
            base_url,
            http,
            tokens: Arc::new(tokens),
            user_agent,
            client_info: client_info(),
        })
    }

    /// Get the base URL for this client
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Token lifecycle shared by this client and its clones
    pub fn token_manager(&self) -> &TokenManager {
        &self.tokens
    }

    /// Add or replace a user-agent component
    ///
    /// See [`UserAgent::set`] for the sanitizing rules.
    pub fn set_user_agent_component(&mut self, key: &str, value: &str, sanitize: bool) {
        self.user_agent.set(key, value, sanitize);
    }

    /// The formatted `User-Agent` header value
    pub fn user_agent(&self) -> String {
        self.user_agent.to_string()
    }

    /// Headers sent on every call, the auth endpoints included
    fn headers(&self) -> Result<HeaderMap, EwhsError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, header_value("User-Agent", &self.user_agent())?);
        headers.insert(CLIENT_INFO_HEADER.clone(), header_value("X-Ewhs-Client-Info", &self.client_info)?);

        let credentials = self.tokens.credentials();
        if let Some(code) = credentials.customer_code() {
            headers.insert(CUSTOMER_CODE_HEADER.clone(), header_value("X-Customer-Code", code)?);
        }
        if let Some(code) = credentials.wms_code() {
            headers.insert(WMS_CODE_HEADER.clone(), header_value("X-Wms-Code", code)?);
        }

        Ok(headers)
    }

    /// Return a valid access token, logging in or refreshing first if needed
    pub async fn ensure_authenticated(&self) -> Result<String, EwhsError> {
        let headers = self.headers()?;
        self.tokens.ensure_authenticated(&headers).await
    }

    /// Force a token exchange: refresh when a refresh token is held,
    /// otherwise log in
    ///
    /// The exchange carries the same default and scoping headers as every
    /// other call. A failed refresh is returned as is; call
    /// [`TokenManager::clear_refresh_token`] first to force a login.
    pub async fn obtain_access_token(&self) -> Result<String, EwhsError> {
        let headers = self.headers()?;
        self.tokens.obtain_access_token(&headers).await
    }

    /// Send one authenticated request
    ///
    /// Logs in or refreshes first when the access token is missing or
    /// expired. Returns `Ok(None)` for `204 No Content`.
    ///
    /// # Errors
    ///
    /// * `Authentication` - the token exchange failed, or the API answered 401
    /// * `BadRequest` - the API answered 400; carries the response body
    /// * `Server` - the API answered with a 5xx status
    /// * `Protocol` - a success response whose body is not JSON
    /// * `Api` - transport failure or any other unexpected status
    pub async fn send(&self, request: ResourceRequest) -> Result<Option<Value>, EwhsError> {
        let url = request.url(&self.base_url);
        let headers = self.headers()?;

        let token = self.tokens.ensure_authenticated(&headers).await?;

        tracing::debug!("Sending {} request to: {}", request.method, url);

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(headers)
            .bearer_auth(token);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!("Failed to send {} request to {}: {}", request.method, url, e);
            ApiError::from(e)
        })?;

        let status = response.status();
        tracing::debug!("Received response with status: {}", status);

        let text = response.text().await.map_err(|e| {
            tracing::error!("Failed to read response body: {}", e);
            ApiError::from(e)
        })?;

        map_response(status.as_u16(), &text).map_err(|e| {
            tracing::error!("{} {} failed: {}", request.method, url, e);
            e
        })
    }

    /// List a resource collection
    pub async fn filter(
        &self,
        resource: &str,
        params: &[(&str, &str)],
    ) -> Result<Option<Value>, EwhsError> {
        self.send(ResourceRequest::new(Method::GET, resource).params(params.iter().copied()))
            .await
    }

    /// Fetch a single resource by id
    pub async fn get(&self, resource: &str, id: &str) -> Result<Option<Value>, EwhsError> {
        self.send(ResourceRequest::new(Method::GET, resource).id(id))
            .await
    }

    /// Create a resource
    pub async fn create<B: Serialize + ?Sized>(
        &self,
        resource: &str,
        body: &B,
    ) -> Result<Option<Value>, EwhsError> {
        let body = to_json(body)?;
        self.send(ResourceRequest::new(Method::POST, resource).body(body))
            .await
    }

    /// Partially update a resource
    pub async fn update<B: Serialize + ?Sized>(
        &self,
        resource: &str,
        id: &str,
        body: &B,
    ) -> Result<Option<Value>, EwhsError> {
        let body = to_json(body)?;
        self.send(ResourceRequest::new(Method::PATCH, resource).id(id).body(body))
            .await
    }

    /// Delete a resource
    pub async fn delete(&self, resource: &str, id: &str) -> Result<Option<Value>, EwhsError> {
        self.send(ResourceRequest::new(Method::DELETE, resource).id(id))
            .await
    }

    pub fn orders(&self) -> Orders<'_> {
        Orders::new(self)
    }

    pub fn shipments(&self) -> Shipments<'_> {
        Shipments::new(self)
    }

    pub fn stock(&self) -> Stock<'_> {
        Stock::new(self)
    }
}

/// Translate a resource response into a result
fn map_response(status: u16, text: &str) -> Result<Option<Value>, EwhsError> {
    match status {
        401 => {
            let body = lenient_body(text);
            let message = body
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| "Unauthorized".to_string());
            Err(EwhsError::Authentication {
                message,
                body: Some(body),
            })
        }
        400 => Err(EwhsError::BadRequest {
            errors: lenient_body(text),
        }),
        500..=599 => Err(EwhsError::Server { status }),
        204 => Ok(None),
        200..=299 => {
            if text.trim().is_empty() {
                return Ok(None);
            }
            serde_json::from_str(text).map(Some).map_err(|e| {
                EwhsError::Protocol(format!("Response body is not valid JSON: {}", e))
            })
        }
        _ => Err(EwhsError::Api(ApiError::Http {
            status,
            message: text.to_string(),
        })),
    }
}

/// Parse an error body, keeping non-JSON text as a string value
fn lenient_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn to_json<B: Serialize + ?Sized>(body: &B) -> Result<Value, EwhsError> {
    serde_json::to_value(body)
        .map_err(|e| EwhsError::Api(ApiError::Request(format!("Failed to serialize body: {}", e))))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue, EwhsError> {
    HeaderValue::from_str(value).map_err(|e| {
        EwhsError::Api(ApiError::Request(format!("Invalid {} header value: {}", name, e)))
    })
}

/// Host description sent as `X-Ewhs-Client-Info`
///
/// Space-separated system name, host name, kernel release, OS version and
/// machine architecture. Parts the platform cannot report are left out.
fn client_info() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok());

    [
        System::name(),
        host,
        System::kernel_version(),
        System::os_version(),
        Some(std::env::consts::ARCH.to_string()),
    ]
    .into_iter()
    .flatten()
    .map(|part| part.split_whitespace().collect::<Vec<_>>().join(" "))
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}
