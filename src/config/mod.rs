//! Configuration management for rentkit
//!
//! Endpoints, the public API key and cache tuning are read from a YAML file
//! (`~/.rentkit/config.yaml` by default) and can be overridden from the
//! environment. A missing file is not an error: defaults plus environment
//! overrides are enough to run anonymous reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheTtl;
use crate::error::{ConfigError, Result};

/// Environment variable overriding the config file location
pub const ENV_CONFIG: &str = "RENTKIT_CONFIG";
pub const ENV_GRAPHQL_URL: &str = "RENTKIT_GRAPHQL_URL";
pub const ENV_API_KEY: &str = "RENTKIT_API_KEY";
pub const ENV_CDN_URL: &str = "RENTKIT_CDN_URL";
pub const ENV_SESSION_TOKEN: &str = "RENTKIT_SESSION_TOKEN";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// GraphQL endpoint (AppSync-style `.../graphql`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graphql_url: Option<String>,

    /// Static public API key used for anonymous reads
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the CDN snapshot bucket; CDN reads are skipped when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdn_url: Option<String>,

    /// Signed-in session issued by the identity provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionToken>,

    /// Cache tuning
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Session token with expiry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionToken {
    /// The identity provider's ID/access token
    pub token: String,

    /// Token expiration time
    pub expires_at: DateTime<Utc>,
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Master switch for the query cache
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Keep query results on disk between runs
    #[serde(default = "default_true")]
    pub persist: bool,

    /// In-memory entry limit before least-recently-used eviction
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// TTL for queries that don't specify one
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,

    /// Validity window of the whole location hierarchy
    #[serde(default = "default_location_ttl_secs")]
    pub location_ttl_secs: u64,

    /// How long to skip CDN reads after a transport failure
    #[serde(default = "default_cdn_cooldown_secs")]
    pub cdn_cooldown_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_max_entries() -> usize {
    500
}

fn default_ttl_secs() -> u64 {
    CacheTtl::DEFAULT.as_secs()
}

fn default_location_ttl_secs() -> u64 {
    CacheTtl::LOCATIONS.as_secs()
}

fn default_cdn_cooldown_secs() -> u64 {
    30
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            persist: true,
            max_entries: default_max_entries(),
            default_ttl_secs: default_ttl_secs(),
            location_ttl_secs: default_location_ttl_secs(),
            cdn_cooldown_secs: default_cdn_cooldown_secs(),
        }
    }
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_secs)
    }

    pub fn location_ttl(&self) -> Duration {
        Duration::from_secs(self.location_ttl_secs)
    }

    pub fn cdn_cooldown(&self) -> Duration {
        Duration::from_secs(self.cdn_cooldown_secs)
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".rentkit").join("config.yaml"))
    }

    /// Resolve the config path: explicit path, then `RENTKIT_CONFIG`, then default
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => match std::env::var(ENV_CONFIG) {
                Ok(p) if !p.is_empty() => Ok(PathBuf::from(p)),
                _ => Self::default_path(),
            },
        }
    }

    /// Load configuration (file if present, then environment overrides)
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        let path = Self::resolve_path(path)?;
        let mut config = if path.exists() {
            Self::load_from(path)?
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific path, without environment overrides
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Save configuration to the resolved path
    pub fn save_at(&self, path: Option<&str>) -> Result<()> {
        self.save_to(Self::resolve_path(path)?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(&path, contents)?;

        // The file holds an API key and possibly a session token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Apply `RENTKIT_*` environment overrides on top of file values
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_GRAPHQL_URL) {
            self.graphql_url = Some(url);
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(url) = get(ENV_CDN_URL) {
            self.cdn_url = Some(url);
        }
        if let Some(token) = get(ENV_SESSION_TOKEN) {
            match crate::client::session::Session::from_jwt(&token) {
                Ok(session) => {
                    self.session = Some(SessionToken {
                        token: session.token,
                        expires_at: session.expires_at,
                    });
                }
                Err(e) => log::warn!("Ignoring {}: {}", ENV_SESSION_TOKEN, e),
            }
        }
    }

    /// Validate that the backend can be reached
    pub fn validate_endpoints(&self) -> Result<()> {
        if self.graphql_url.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::MissingEndpoint.into());
        }
        if self.api_key.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::MissingApiKey.into());
        }
        Ok(())
    }

    /// Check if the session token is missing, expired, or expires within a minute
    pub fn is_session_expired(&self) -> bool {
        match &self.session {
            None => true,
            Some(session) => session.expires_at - chrono::Duration::seconds(60) < Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.graphql_url.is_none());
        assert!(config.api_key.is_none());
        assert!(config.session.is_none());
        assert!(config.cache.enabled);
        assert_eq!(config.cache.max_entries, 500);
        assert_eq!(config.cache.location_ttl(), CacheTtl::LOCATIONS);
    }

    #[test]
    fn test_partial_cache_section_uses_defaults() {
        let config: Config = serde_yaml::from_str(
            "graphql_url: https://api.example.com/graphql\ncache:\n  max_entries: 10\n",
        )
        .unwrap();
        assert_eq!(config.cache.max_entries, 10);
        assert!(config.cache.persist);
        assert_eq!(config.cache.cdn_cooldown_secs, 30);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = Config {
            graphql_url: Some("https://api.example.com/graphql".to_string()),
            api_key: Some("da2-public".to_string()),
            ..Config::default()
        };
        config.save_to(path.clone()).unwrap();

        let loaded = Config::load_from(path).unwrap();
        assert_eq!(loaded.graphql_url, config.graphql_url);
        assert_eq!(loaded.api_key.as_deref(), Some("da2-public"));
    }

    #[test]
    fn test_load_from_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = Config::load_from(dir.path().join("absent.yaml")).unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            (ENV_GRAPHQL_URL, "http://localhost:4000/graphql"),
            (ENV_CDN_URL, "http://localhost:4001"),
            (ENV_API_KEY, "  "),
        ]
        .into_iter()
        .collect();

        let mut config = Config {
            api_key: Some("from-file".to_string()),
            ..Config::default()
        };
        config.apply_overrides(|name| env.get(name).map(|v| v.to_string()));

        assert_eq!(
            config.graphql_url.as_deref(),
            Some("http://localhost:4000/graphql")
        );
        assert_eq!(config.cdn_url.as_deref(), Some("http://localhost:4001"));
        // Blank values don't clobber the file
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_validate_endpoints() {
        let mut config = Config::default();
        assert!(config.validate_endpoints().is_err());

        config.graphql_url = Some("https://api.example.com/graphql".to_string());
        let err = config.validate_endpoints().unwrap_err();
        assert!(matches!(err, crate::error::Error::Config(ConfigError::MissingApiKey)));

        config.api_key = Some("da2-public".to_string());
        assert!(config.validate_endpoints().is_ok());
    }

    #[test]
    fn test_session_expiry() {
        let mut config = Config::default();
        assert!(config.is_session_expired());

        config.session = Some(SessionToken {
            token: "t".to_string(),
            expires_at: Utc::now() - chrono::Duration::hours(1),
        });
        assert!(config.is_session_expired());

        config.session = Some(SessionToken {
            token: "t".to_string(),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        });
        assert!(!config.is_session_expired());

        config.session = Some(SessionToken {
            token: "t".to_string(),
            expires_at: Utc::now() + chrono::Duration::seconds(20),
        });
        assert!(config.is_session_expired());
    }
}
