//! Error types for the rentkit data layer
//!
//! Every error type is `Clone`: a single in-flight request is shared by all
//! callers waiting on the same cache key, and each of them receives the same
//! failure.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for rentkit operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Operation failed: {0}")]
    Other(String),
}

impl Error {
    /// True when the operation needs a signed-in user and none was present.
    ///
    /// Front ends use this to redirect to sign-in instead of showing a
    /// generic failure.
    pub fn is_auth_required(&self) -> bool {
        matches!(self, Error::Api(ApiError::AuthenticationRequired))
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}

/// GraphQL backend and transport errors
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("Authentication required. Sign in to perform this operation.")]
    AuthenticationRequired,

    #[error("Request was rejected as unauthorized. Check the API key or session token.")]
    Unauthorized,

    #[error("Access denied. You don't have permission to access this resource.")]
    Forbidden,

    #[error("Rate limit exceeded. Retry after {0:?}")]
    RateLimit(Duration),

    #[error("GraphQL error: {}", join_messages(.0))]
    GraphQl(Vec<GraphQlError>),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("Session token expired or invalid")]
    InvalidToken,
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to API".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// A single entry of a GraphQL `errors` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlError {
    pub message: String,

    /// Backend error type (AppSync reports e.g. `Unauthorized`, `DynamoDB:ConditionalCheckFailedException`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<serde_json::Value>,
}

impl fmt::Display for GraphQlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.error_type {
            Some(kind) => write!(f, "{} ({})", self.message, kind),
            None => f.write_str(&self.message),
        }
    }
}

fn join_messages(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// CDN snapshot resolver errors.
///
/// Only identifier problems escape the resolver; parse and validation
/// failures are turned into a cache miss before they reach callers.
#[derive(Debug, Clone, Error)]
pub enum SnapshotError {
    #[error("Missing required identifier: {0}")]
    MissingIdentifier(&'static str),

    #[error("Identifier is not URL safe: {0}")]
    InvalidIdentifier(String),

    #[error("Snapshot pages start at 1")]
    InvalidPage,

    #[error("Malformed snapshot document: {0}")]
    Parse(String),

    #[error("Snapshot failed validation: {0}")]
    Invalid(String),
}

/// Local cache errors
#[derive(Debug, Clone, Error)]
pub enum CacheError {
    #[error("Could not determine the cache directory")]
    NoHome,

    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Cache database error: {0}")]
    Sqlite(String),
}

impl From<rusqlite::Error> for CacheError {
    fn from(err: rusqlite::Error) -> Self {
        CacheError::Sqlite(err.to_string())
    }
}

/// Configuration-related errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("GraphQL endpoint not configured. Set `graphql_url` or RENTKIT_GRAPHQL_URL.")]
    MissingEndpoint,

    #[error("Public API key not configured. Set `api_key` or RENTKIT_API_KEY.")]
    MissingApiKey,
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}
