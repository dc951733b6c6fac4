//! Auth-mode selecting GraphQL client

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{Credential, GraphQlApi, GraphQlRequest, Operation, SessionProvider, SessionState, Transport};
use crate::error::{ApiError, Result};

/// [`GraphQlApi`] implementation over any [`Transport`].
///
/// Holds the public API key and asks the [`SessionProvider`] for a session
/// on every call, so a sign-in or sign-out takes effect immediately.
pub struct GraphQlClient {
    transport: Arc<dyn Transport>,
    sessions: Arc<dyn SessionProvider>,
    api_key: String,
}

impl GraphQlClient {
    pub fn new(
        transport: Arc<dyn Transport>,
        sessions: Arc<dyn SessionProvider>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            sessions,
            api_key: api_key.into(),
        }
    }

    async fn send(&self, operation: &Operation, variables: &Value, credential: Credential) -> Result<Value> {
        let request = GraphQlRequest::new(operation, variables);
        self.transport.send(&request, &credential).await
    }
}

#[async_trait]
impl GraphQlApi for GraphQlClient {
    async fn execute_authenticated(&self, operation: &Operation, variables: &Value) -> Result<Value> {
        match self.sessions.current_session().await {
            SessionState::Authenticated(session) => {
                self.send(operation, variables, Credential::Session(session.token))
                    .await
            }
            SessionState::Anonymous => {
                log::debug!("{} requires a session; none active", operation.name);
                Err(ApiError::AuthenticationRequired.into())
            }
        }
    }

    async fn execute_public(&self, operation: &Operation, variables: &Value) -> Result<Value> {
        self.send(operation, variables, Credential::ApiKey(self.api_key.clone()))
            .await
    }

    async fn execute(&self, operation: &Operation, variables: &Value) -> Result<Value> {
        let credential = match self.sessions.current_session().await {
            SessionState::Authenticated(session) => Credential::Session(session.token),
            SessionState::Anonymous => Credential::ApiKey(self.api_key.clone()),
        };
        self.send(operation, variables, credential).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::session::Session;
    use crate::client::{AuthMode, MockTransport, StaticSession, operations};
    use serde_json::json;

    fn signed_in() -> Arc<StaticSession> {
        Arc::new(StaticSession::signed_in(Session::new(
            "user-token",
            chrono::Utc::now() + chrono::Duration::hours(1),
        )))
    }

    #[tokio::test]
    async fn test_authenticated_requires_session() {
        let transport = Arc::new(MockTransport::new());
        let client = GraphQlClient::new(transport.clone(), Arc::new(StaticSession::anonymous()), "key");

        let err = client
            .execute_authenticated(&operations::GET_PROPERTY, &json!({"propertyId": "p1"}))
            .await
            .unwrap_err();

        assert!(err.is_auth_required());
        // Nothing hit the wire
        assert_eq!(transport.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_authenticated_sends_session_token() {
        let transport = Arc::new(MockTransport::new().respond("getProperty", json!({"getProperty": null})));
        let client = GraphQlClient::new(transport.clone(), signed_in(), "key");

        client
            .execute_authenticated(&operations::GET_PROPERTY, &json!({"propertyId": "p1"}))
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].auth, AuthMode::Session);
    }

    #[tokio::test]
    async fn test_public_ignores_session() {
        let transport = Arc::new(MockTransport::new().respond("listRegions", json!({"listRegions": []})));
        let client = GraphQlClient::new(transport.clone(), signed_in(), "key");

        client
            .execute_public(&operations::LIST_REGIONS, &json!({}))
            .await
            .unwrap();

        assert_eq!(transport.calls()[0].auth, AuthMode::ApiKey);
    }

    #[tokio::test]
    async fn test_execute_falls_back_to_public_when_anonymous() {
        let transport = Arc::new(MockTransport::new().respond("listRegions", json!({"listRegions": []})));
        let anonymous = GraphQlClient::new(transport.clone(), Arc::new(StaticSession::anonymous()), "key");
        anonymous
            .execute(&operations::LIST_REGIONS, &json!({}))
            .await
            .unwrap();

        let authed = GraphQlClient::new(transport.clone(), signed_in(), "key");
        authed
            .execute(&operations::LIST_REGIONS, &json!({}))
            .await
            .unwrap();

        let calls = transport.calls();
        assert_eq!(calls[0].auth, AuthMode::ApiKey);
        assert_eq!(calls[1].auth, AuthMode::Session);
    }

    #[tokio::test]
    async fn test_backend_errors_pass_through() {
        let transport = Arc::new(
            MockTransport::new().fail_next(ApiError::ServerError("down".to_string())),
        );
        let client = GraphQlClient::new(transport, signed_in(), "key");

        let err = client
            .execute(&operations::LIST_REGIONS, &json!({}))
            .await
            .unwrap_err();
        assert!(!err.is_auth_required());
        assert!(err.to_string().contains("down"));
    }
}
