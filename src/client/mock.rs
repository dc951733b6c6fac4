//! Mock GraphQL transport for testing
//!
//! Responds per operation name, optionally with a delay, and records every
//! request so tests can count network calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{AuthMode, Credential, GraphQlRequest, Transport};
use crate::error::{ApiError, Result};

type Responder = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;
type Delay = Arc<dyn Fn(&Value) -> Duration + Send + Sync>;

/// A captured request for test assertions.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    /// Operation name
    pub operation: String,
    /// Variables as sent
    pub variables: Value,
    /// Auth transport used
    pub auth: AuthMode,
}

/// Mock transport for testing.
///
/// # Example
/// ```ignore
/// let transport = MockTransport::new()
///     .respond("listRegions", json!({"listRegions": []}))
///     .delay("listRegions", Duration::from_millis(50));
/// ```
#[derive(Default)]
pub struct MockTransport {
    responders: HashMap<String, Responder>,
    delays: HashMap<String, Delay>,
    /// Error to return on the next call - consumed on first use
    error: Mutex<Option<ApiError>>,
    captured: Mutex<Vec<CapturedRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the same `data` for every call to `operation`.
    pub fn respond(self, operation: &str, data: Value) -> Self {
        self.respond_with(operation, move |_| Ok(data.clone()))
    }

    /// Compute the response from the request variables.
    pub fn respond_with<F>(mut self, operation: &str, f: F) -> Self
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.responders.insert(operation.to_string(), Arc::new(f));
        self
    }

    /// Delay responses to `operation`, computed from the variables.
    pub fn delay_with<F>(mut self, operation: &str, f: F) -> Self
    where
        F: Fn(&Value) -> Duration + Send + Sync + 'static,
    {
        self.delays.insert(operation.to_string(), Arc::new(f));
        self
    }

    /// Fixed delay for every call to `operation`.
    pub fn delay(self, operation: &str, delay: Duration) -> Self {
        self.delay_with(operation, move |_| delay)
    }

    /// Fail the next call with `error`.
    pub fn fail_next(self, error: ApiError) -> Self {
        self.set_next_error(error);
        self
    }

    /// Fail the next call with `error` (for an already shared mock).
    pub fn set_next_error(&self, error: ApiError) {
        if let Ok(mut slot) = self.error.lock() {
            *slot = Some(error);
        }
    }

    /// All requests seen so far.
    pub fn calls(&self) -> Vec<CapturedRequest> {
        self.captured.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of requests for one operation.
    pub fn calls_for(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.operation == operation)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls().len()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: &GraphQlRequest<'_>, credential: &Credential) -> Result<Value> {
        if let Ok(mut captured) = self.captured.lock() {
            captured.push(CapturedRequest {
                operation: request.operation_name.to_string(),
                variables: request.variables.clone(),
                auth: credential.mode(),
            });
        }

        if let Some(delay) = self.delays.get(request.operation_name) {
            tokio::time::sleep(delay(request.variables)).await;
        }

        let pending = self.error.lock().ok().and_then(|mut e| e.take());
        if let Some(error) = pending {
            return Err(error.into());
        }

        match self.responders.get(request.operation_name) {
            Some(respond) => respond(request.variables),
            None => Err(ApiError::InvalidResponse(format!(
                "No mock response for {}",
                request.operation_name
            ))
            .into()),
        }
    }
}
