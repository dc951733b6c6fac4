//! CDN-first snapshot resolver
//!
//! Read-heavy views try a static JSON snapshot on the CDN before touching
//! the GraphQL backend. Every way a snapshot can be unavailable is a
//! [`SnapshotOutcome::Miss`]; only malformed identifiers are errors.

mod snapshot;

pub use snapshot::{ParsedSnapshot, SnapshotFeedPage, Validate, parse_snapshot};

use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::Instant;

use crate::cache::lock;
use crate::error::{ApiError, Result, SnapshotError};

/// Snapshot requests are expected to be fast; a slow CDN is a miss
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Default pause after a transport failure
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(30);

/// Kinds of snapshot published to the CDN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Property,
    DistrictSearchFeed,
    RegionSearchFeed,
}

impl ResourceKind {
    /// Path segment under the CDN base URL
    pub fn path(self) -> &'static str {
        match self {
            ResourceKind::Property => "property",
            ResourceKind::DistrictSearchFeed => "district-search-feed",
            ResourceKind::RegionSearchFeed => "region-search-feed",
        }
    }

    fn id_name(self) -> &'static str {
        match self {
            ResourceKind::Property => "property id",
            ResourceKind::DistrictSearchFeed => "district id",
            ResourceKind::RegionSearchFeed => "region id",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Why a snapshot could not be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// No CDN configured
    Disabled,
    /// The snapshot was never published (404)
    NotFound,
    /// Any other non-success status
    Status(u16),
    /// Connection failure or timeout
    Network(String),
    /// Body wasn't a valid snapshot document
    Malformed(String),
    /// A recent transport failure paused CDN lookups
    CoolingDown,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::Disabled => f.write_str("CDN disabled"),
            MissReason::NotFound => f.write_str("not published"),
            MissReason::Status(code) => write!(f, "HTTP {}", code),
            MissReason::Network(e) => write!(f, "network error: {}", e),
            MissReason::Malformed(e) => write!(f, "malformed snapshot: {}", e),
            MissReason::CoolingDown => f.write_str("cooling down after a network error"),
        }
    }
}

/// Result of one snapshot lookup
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome<T> {
    Hit(T),
    /// The resource was soft-deleted; callers must not fall back to live data
    Gone,
    /// Fall back to the live backend
    Miss(MissReason),
}

/// Fetches and validates CDN snapshots
pub struct CdnResolver {
    http: HttpClient,
    base_url: Option<String>,
    cooldown: Duration,
    cooling_until: Mutex<Option<Instant>>,
}

impl CdnResolver {
    /// Resolver for `base_url`; `None` turns every lookup into a miss
    pub fn new(base_url: Option<String>, cooldown: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url
                .map(|url| url.trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            cooldown,
            cooling_until: Mutex::new(None),
        })
    }

    /// Resolver with no CDN configured
    pub fn disabled() -> Result<Self> {
        Self::new(None, DEFAULT_COOLDOWN)
    }

    pub fn is_enabled(&self) -> bool {
        self.base_url.is_some()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// Snapshot URL for a resource, or a feed page when `page` is set
    pub fn snapshot_url(&self, kind: ResourceKind, id: &str, page: Option<u32>) -> Result<Option<String>> {
        validate_identifier(kind, id)?;
        if page == Some(0) {
            return Err(SnapshotError::InvalidPage.into());
        }

        let Some(base) = &self.base_url else {
            return Ok(None);
        };
        Ok(Some(match page {
            Some(page) => format!("{}/{}/{}/page-{}.json", base, kind.path(), id, page),
            None => format!("{}/{}/{}.json", base, kind.path(), id),
        }))
    }

    /// Look up a snapshot.
    ///
    /// Returns `Err` only for an empty or non-URL-safe `id` or a zero page.
    pub async fn fetch_snapshot<T>(
        &self,
        kind: ResourceKind,
        id: &str,
        page: Option<u32>,
    ) -> Result<SnapshotOutcome<T>>
    where
        T: DeserializeOwned + Validate,
    {
        let Some(url) = self.snapshot_url(kind, id, page)? else {
            return Ok(SnapshotOutcome::Miss(MissReason::Disabled));
        };

        if self.is_cooling_down() {
            log::debug!("Skipping CDN lookup for {} during cooldown", url);
            return Ok(SnapshotOutcome::Miss(MissReason::CoolingDown));
        }

        log::debug!("GET {}", url);
        let response = match self
            .http
            .get(&url)
            .header("Cache-Control", "no-store")
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.start_cooldown();
                return Ok(SnapshotOutcome::Miss(MissReason::Network(e.to_string())));
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            log::debug!("No snapshot at {}", url);
            return Ok(SnapshotOutcome::Miss(MissReason::NotFound));
        }
        if !status.is_success() {
            log::debug!("Snapshot {} returned {}", url, status);
            return Ok(SnapshotOutcome::Miss(MissReason::Status(status.as_u16())));
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => return Ok(SnapshotOutcome::Miss(MissReason::Network(e.to_string()))),
        };

        Ok(match parse_snapshot::<T>(&body) {
            Ok(ParsedSnapshot::Document(document)) => SnapshotOutcome::Hit(document),
            Ok(ParsedSnapshot::Deleted) => {
                log::debug!("Snapshot {} is a tombstone", url);
                SnapshotOutcome::Gone
            }
            Err(e) => {
                log::warn!("Ignoring unusable snapshot {}: {}", url, e);
                SnapshotOutcome::Miss(MissReason::Malformed(e.to_string()))
            }
        })
    }

    fn is_cooling_down(&self) -> bool {
        let mut until = lock(&self.cooling_until);
        match *until {
            Some(deadline) if Instant::now() < deadline => true,
            Some(_) => {
                *until = None;
                false
            }
            None => false,
        }
    }

    fn start_cooldown(&self) {
        if self.cooldown.is_zero() {
            return;
        }
        log::info!("CDN unreachable, pausing snapshot lookups for {:?}", self.cooldown);
        *lock(&self.cooling_until) = Some(Instant::now() + self.cooldown);
    }
}

fn validate_identifier(kind: ResourceKind, id: &str) -> std::result::Result<(), SnapshotError> {
    if id.is_empty() {
        return Err(SnapshotError::MissingIdentifier(kind.id_name()));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(SnapshotError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}
