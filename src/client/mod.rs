//! GraphQL client wrapper
//!
//! Selects an authentication mode per operation and exposes three call
//! shapes through [`GraphQlApi`]:
//! - [`GraphQlApi::execute_authenticated`] - requires a signed-in session
//! - [`GraphQlApi::execute_public`] - always uses the public API key
//! - [`GraphQlApi::execute`] - session when available, public otherwise
//!
//! The wire is behind [`Transport`] so the wrapper can be tested without HTTP.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ApiError, Result};

pub mod graphql;
pub mod http;
#[cfg(test)]
pub mod mock;
pub mod models;
pub mod operations;
pub mod session;

pub use graphql::GraphQlClient;
pub use http::HttpTransport;
#[cfg(test)]
pub use mock::MockTransport;
pub use session::{ConfigSession, Session, SessionProvider, SessionState, StaticSession};

/// A named GraphQL operation document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operation {
    /// Operation name, also the cache-key namespace
    pub name: &'static str,
    /// Full query/mutation document
    pub document: &'static str,
}

impl Operation {
    pub const fn new(name: &'static str, document: &'static str) -> Self {
        Self { name, document }
    }
}

/// Request body posted to the GraphQL endpoint
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphQlRequest<'a> {
    pub query: &'a str,
    pub variables: &'a Value,
    pub operation_name: &'a str,
}

impl<'a> GraphQlRequest<'a> {
    pub fn new(operation: &'a Operation, variables: &'a Value) -> Self {
        Self {
            query: operation.document,
            variables,
            operation_name: operation.name,
        }
    }
}

/// Which auth transport a request went out with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// Signed-in user's session token
    Session,
    /// Static public API key
    ApiKey,
}

/// Credential attached to a single request
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Session(String),
    ApiKey(String),
}

impl Credential {
    pub fn mode(&self) -> AuthMode {
        match self {
            Credential::Session(_) => AuthMode::Session,
            Credential::ApiKey(_) => AuthMode::ApiKey,
        }
    }
}

// Tokens stay out of debug logs
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credential::Session(_) => f.write_str("Credential::Session(..)"),
            Credential::ApiKey(_) => f.write_str("Credential::ApiKey(..)"),
        }
    }
}

/// Sends one GraphQL request and returns its `data` object.
///
/// Implementations must report a non-empty `errors` array as
/// [`ApiError::GraphQl`], never as a partial success.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &GraphQlRequest<'_>, credential: &Credential) -> Result<Value>;
}

/// Auth-mode aware GraphQL operations
#[async_trait]
pub trait GraphQlApi: Send + Sync {
    /// Run with the signed-in session; fails with
    /// [`ApiError::AuthenticationRequired`] when nobody is signed in.
    async fn execute_authenticated(&self, operation: &Operation, variables: &Value)
    -> Result<Value>;

    /// Run with the public API key regardless of session state.
    async fn execute_public(&self, operation: &Operation, variables: &Value) -> Result<Value>;

    /// Run with the session if there is one, otherwise with the API key.
    async fn execute(&self, operation: &Operation, variables: &Value) -> Result<Value>;
}

/// Deserialize `data.<field>` from an operation result.
///
/// A `null` field is `Ok(None)` (no such record); a missing field means the
/// response doesn't match the operation and is an error.
pub fn extract_field<T: DeserializeOwned>(data: &Value, field: &str) -> Result<Option<T>> {
    match data.get(field) {
        None => Err(ApiError::InvalidResponse(format!("Response is missing `{}`", field)).into()),
        Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|e| ApiError::InvalidResponse(format!("Unexpected `{}` shape: {}", field, e)).into()),
    }
}
