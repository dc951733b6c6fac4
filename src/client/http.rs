//! HTTP transport for the GraphQL endpoint

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::{Credential, GraphQlRequest, Transport};
use crate::error::{ApiError, GraphQlError, Result};

/// Client-side request budget against the GraphQL endpoint
const RATE_LIMIT_PER_SECOND: u32 = 20;

/// Request timeout
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// GraphQL response envelope
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

/// reqwest-backed [`Transport`]
pub struct HttpTransport {
    http: HttpClient,
    endpoint: String,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl HttpTransport {
    /// Create a transport for a GraphQL endpoint URL
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let quota = Quota::per_second(NonZeroU32::new(RATE_LIMIT_PER_SECOND).unwrap_or(NonZeroU32::MIN));

        Ok(Self {
            http,
            endpoint: endpoint.into(),
            rate_limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &GraphQlRequest<'_>, credential: &Credential) -> Result<Value> {
        self.rate_limiter.until_ready().await;

        let builder = self.http.post(&self.endpoint).json(request);
        let builder = match credential {
            Credential::Session(token) => builder.header("Authorization", token),
            Credential::ApiKey(key) => builder.header("x-api-key", key),
        };

        log::debug!(
            "POST {} operation={} auth={:?}",
            self.endpoint,
            request.operation_name,
            credential.mode()
        );

        let response = builder.send().await.map_err(ApiError::from)?;
        let status = response.status();

        match status {
            status if status.is_success() => {
                let body = response
                    .text()
                    .await
                    .map_err(|e| ApiError::InvalidResponse(format!("Failed to read response: {}", e)))?;
                parse_envelope(&body)
            }
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized.into()),
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden.into()),
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                Err(ApiError::RateLimit(Duration::from_secs(retry_after)).into())
            }
            status if status.is_client_error() => {
                let error_msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Bad request".to_string());
                Err(ApiError::BadRequest(error_msg).into())
            }
            status if status.is_server_error() => {
                let error_msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| format!("Server error: {}", status));
                Err(ApiError::ServerError(error_msg).into())
            }
            _ => Err(ApiError::InvalidResponse(format!("Unexpected status code: {}", status)).into()),
        }
    }
}

/// Split a GraphQL envelope into data or errors.
///
/// Partial data alongside errors is still an error: callers must never see
/// a half-filled result as a success.
fn parse_envelope(body: &str) -> Result<Value> {
    let envelope: Envelope = serde_json::from_str(body).map_err(|e| {
        ApiError::InvalidResponse(format!(
            "Failed to parse GraphQL response: {}. Body was: {}",
            e,
            body.chars().take(200).collect::<String>()
        ))
    })?;

    if let Some(errors) = envelope.errors
        && !errors.is_empty()
    {
        log::debug!("GraphQL errors in response: {:?}", errors);
        return Err(ApiError::GraphQl(errors).into());
    }

    match envelope.data {
        Some(Value::Null) | None => {
            Err(ApiError::InvalidResponse("Response has neither data nor errors".to_string()).into())
        }
        Some(data) => Ok(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Operation;
    use crate::error::Error;
    use serde_json::json;

    const OP: Operation = Operation::new("listRegions", "query listRegions { listRegions { id name } }");

    #[test]
    fn test_parse_envelope_data() {
        let data = parse_envelope(r#"{"data":{"listRegions":[]}}"#).unwrap();
        assert_eq!(data, json!({"listRegions": []}));
    }

    #[test]
    fn test_parse_envelope_errors_win_over_partial_data() {
        let err = parse_envelope(
            r#"{"data":{"getProperty":null},"errors":[{"message":"boom","errorType":"Lambda:Unhandled"}]}"#,
        )
        .unwrap_err();
        match err {
            Error::Api(ApiError::GraphQl(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].error_type.as_deref(), Some("Lambda:Unhandled"));
            }
            other => panic!("Expected GraphQl error, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_envelope_garbage() {
        assert!(matches!(
            parse_envelope("<html>").unwrap_err(),
            Error::Api(ApiError::InvalidResponse(_))
        ));
        assert!(matches!(
            parse_envelope(r#"{"data":null}"#).unwrap_err(),
            Error::Api(ApiError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_send_uses_api_key_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .match_header("x-api-key", "da2-public")
            .match_body(mockito::Matcher::PartialJson(
                json!({"operationName": "listRegions"}),
            ))
            .with_status(200)
            .with_body(r#"{"data":{"listRegions":[{"id":"r1","name":"Arusha"}]}}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(format!("{}/graphql", server.url())).unwrap();
        let vars = json!({});
        let data = transport
            .send(
                &GraphQlRequest::new(&OP, &vars),
                &Credential::ApiKey("da2-public".to_string()),
            )
            .await
            .unwrap();

        assert_eq!(data["listRegions"][0]["name"], "Arusha");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_uses_session_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/graphql")
            .match_header("authorization", "jwt-token")
            .with_status(200)
            .with_body(r#"{"data":{"listRegions":[]}}"#)
            .create_async()
            .await;

        let transport = HttpTransport::new(format!("{}/graphql", server.url())).unwrap();
        let vars = json!({});
        transport
            .send(
                &GraphQlRequest::new(&OP, &vars),
                &Credential::Session("jwt-token".to_string()),
            )
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_send_maps_statuses() {
        let mut server = mockito::Server::new_async().await;
        let transport = HttpTransport::new(format!("{}/graphql", server.url())).unwrap();
        let vars = json!({});
        let cred = Credential::ApiKey("k".to_string());

        let _m = server
            .mock("POST", "/graphql")
            .with_status(429)
            .with_header("retry-after", "7")
            .create_async()
            .await;
        let err = transport
            .send(&GraphQlRequest::new(&OP, &vars), &cred)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Api(ApiError::RateLimit(d)) if d == Duration::from_secs(7)
        ));

        server.reset_async().await;
        let _m = server
            .mock("POST", "/graphql")
            .with_status(401)
            .create_async()
            .await;
        let err = transport
            .send(&GraphQlRequest::new(&OP, &vars), &cred)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::Unauthorized)));

        server.reset_async().await;
        let _m = server
            .mock("POST", "/graphql")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;
        let err = transport
            .send(&GraphQlRequest::new(&OP, &vars), &cred)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::ServerError(msg)) if msg == "bad gateway"));
    }
}
