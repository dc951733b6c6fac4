//! Session capability check
//!
//! The one place that answers "is somebody signed in?". Sign-in itself
//! happens in the identity provider; this layer only consumes its token.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::config::Config;
use crate::error::{ApiError, Result};

/// Seconds before expiry at which a token is no longer used
const EXPIRY_BUFFER_SECS: i64 = 60;

/// Signed-in session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            token: token.into(),
            expires_at,
        }
    }

    /// Build a session from a JWT, reading the expiry from its `exp` claim
    pub fn from_jwt(token: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct Claims {
            exp: i64,
        }

        // JWT format: header.payload.signature
        let parts: Vec<&str> = token.split('.').collect();
        let [_, payload, _] = parts.as_slice() else {
            return Err(ApiError::InvalidToken.into());
        };

        let bytes = base64_decode_url(payload)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to decode JWT payload: {}", e)))?;
        let claims: Claims = serde_json::from_slice(&bytes)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse JWT payload: {}", e)))?;

        let expires_at = DateTime::from_timestamp(claims.exp, 0).ok_or(ApiError::InvalidToken)?;
        Ok(Self::new(token, expires_at))
    }

    /// Expired, or expiring too soon to send
    pub fn is_expired(&self) -> bool {
        self.expires_at - chrono::Duration::seconds(EXPIRY_BUFFER_SECS) < Utc::now()
    }
}

/// Decode base64url (URL-safe base64, padding optional)
fn base64_decode_url(input: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    use base64::{Engine as _, engine::general_purpose};

    general_purpose::URL_SAFE_NO_PAD.decode(input.trim_end_matches('='))
}

/// Outcome of the capability check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Authenticated(Session),
    Anonymous,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// Source of the current session
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn current_session(&self) -> SessionState;
}

/// Session stored in the config file (or `RENTKIT_SESSION_TOKEN`)
pub struct ConfigSession {
    session: Option<Session>,
}

impl ConfigSession {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session: config
                .session
                .as_ref()
                .map(|s| Session::new(s.token.clone(), s.expires_at)),
        }
    }
}

#[async_trait]
impl SessionProvider for ConfigSession {
    async fn current_session(&self) -> SessionState {
        match &self.session {
            Some(session) if !session.is_expired() => SessionState::Authenticated(session.clone()),
            Some(_) => {
                log::debug!("Stored session has expired, continuing anonymously");
                SessionState::Anonymous
            }
            None => SessionState::Anonymous,
        }
    }
}

/// Fixed session state, for embedding callers that manage tokens themselves
#[derive(Debug, Clone)]
pub struct StaticSession(SessionState);

impl StaticSession {
    pub fn anonymous() -> Self {
        Self(SessionState::Anonymous)
    }

    pub fn signed_in(session: Session) -> Self {
        Self(SessionState::Authenticated(session))
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current_session(&self) -> SessionState {
        match &self.0 {
            SessionState::Authenticated(session) if session.is_expired() => {
                SessionState::Anonymous
            }
            state => state.clone(),
        }
    }
}

#[cfg(test)]
pub(crate) fn test_jwt(expires_at: DateTime<Utc>) -> String {
    use base64::{Engine as _, engine::general_purpose};

    let header = general_purpose::URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let payload = general_purpose::URL_SAFE_NO_PAD
        .encode(format!(r#"{{"sub":"user-1","exp":{}}}"#, expires_at.timestamp()));
    format!("{}.{}.sig", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionToken;

    #[test]
    fn test_session_from_jwt_reads_exp() {
        let exp = DateTime::from_timestamp(Utc::now().timestamp() + 3600, 0).unwrap();
        let session = Session::from_jwt(&test_jwt(exp)).unwrap();
        assert_eq!(session.expires_at, exp);
        assert!(!session.is_expired());
    }

    #[test]
    fn test_session_from_jwt_rejects_garbage() {
        assert!(Session::from_jwt("not-a-jwt").is_err());
        assert!(Session::from_jwt("a.!!!.c").is_err());
    }

    #[tokio::test]
    async fn test_config_session_expired_is_anonymous() {
        let mut config = Config::default();
        config.session = Some(SessionToken {
            token: "t".to_string(),
            expires_at: Utc::now() - chrono::Duration::minutes(5),
        });
        let provider = ConfigSession::from_config(&config);
        assert_eq!(provider.current_session().await, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_config_session_valid() {
        let mut config = Config::default();
        config.session = Some(SessionToken {
            token: "t".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        });
        let provider = ConfigSession::from_config(&config);
        assert!(provider.current_session().await.is_authenticated());
    }

    #[tokio::test]
    async fn test_static_session() {
        assert!(
            !StaticSession::anonymous()
                .current_session()
                .await
                .is_authenticated()
        );

        let session = Session::new("t", Utc::now() + chrono::Duration::hours(1));
        assert!(
            StaticSession::signed_in(session)
                .current_session()
                .await
                .is_authenticated()
        );
    }
}
