use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// eWarehousing API error type
///
/// Represents all possible errors that can occur when interacting with
/// the eWarehousing API. Every variant is terminal for the call that
/// produced it; the client never retries on its own.
#[derive(Debug)]
pub enum EwhsError {
    /// Login or refresh exchange failed, or a resource call returned 401
    Authentication {
        /// Server-provided message, or the raw body when none was given
        message: String,
        /// Parsed response body, when it was JSON
        body: Option<Value>,
    },
    /// The API rejected the request (HTTP 400)
    BadRequest {
        /// Response body verbatim, usually `{"errors": {...}}`
        errors: Value,
    },
    /// The API failed while handling the request (HTTP 5xx)
    Server { status: u16 },
    /// The response body was not the JSON the API promises
    Protocol(String),
    /// Transport failure or unexpected HTTP status
    Api(ApiError),
    /// Configuration error
    Config(String),
}

impl EwhsError {
    /// HTTP status associated with this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            EwhsError::BadRequest { .. } => Some(400),
            EwhsError::Server { status } => Some(*status),
            EwhsError::Api(ApiError::Http { status, .. }) => Some(*status),
            _ => None,
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, EwhsError::Authentication { .. })
    }
}

impl fmt::Display for EwhsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EwhsError::Authentication { message, .. } => {
                write!(f, "Authentication failed: {}", message)
            }
            EwhsError::BadRequest { errors } => write!(f, "Bad request: {}", errors),
            EwhsError::Server { status } => write!(f, "Server error: HTTP {}", status),
            EwhsError::Protocol(msg) => write!(f, "Protocol error: {}", msg),
            EwhsError::Api(err) => write!(f, "API error: {}", err),
            EwhsError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for EwhsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EwhsError::Api(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ApiError> for EwhsError {
    fn from(err: ApiError) -> Self {
        EwhsError::Api(err)
    }
}

impl From<reqwest::Error> for EwhsError {
    fn from(err: reqwest::Error) -> Self {
        EwhsError::Api(ApiError::from(err))
    }
}

/// Transport-level errors
#[derive(Debug)]
pub enum ApiError {
    /// Network error (connection, timeout, etc.)
    Network(String),
    /// HTTP error with a status the client has no dedicated mapping for
    Http { status: u16, message: String },
    /// Request building failed
    Request(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Network(msg) => write!(f, "Network error: {}", msg),
            ApiError::Http { status, message } => {
                write!(f, "HTTP {} error: {}", status, message)
            }
            ApiError::Request(msg) => write!(f, "Request error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timeout".to_string())
        } else if err.is_connect() {
            ApiError::Network(format!("Connection failed: {}", err))
        } else if err.is_builder() {
            ApiError::Request(err.to_string())
        } else if let Some(status) = err.status() {
            ApiError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Request body for the login endpoint
#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

/// Request body for the refresh endpoint
#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Successful response from the login and refresh endpoints
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenResponse {
    pub refresh_token: String,
    pub token: String,
    pub expires_at: i64,
}
