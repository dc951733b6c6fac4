//! Property detail and search flows
//!
//! Both try the CDN snapshot first and fall back to the live GraphQL
//! backend. A soft-deleted snapshot is final: it is never "revived" from
//! live data.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::cache::{Access, CacheTtl, QueryCache, QueryOptions, derive_key};
use crate::cdn::{CdnResolver, MissReason, ResourceKind, SnapshotFeedPage, SnapshotOutcome};
use crate::client::models::{Property, PropertyCard};
use crate::client::{GraphQlApi, Operation, extract_field, operations};
use crate::error::{Result, SnapshotError};

/// Live search page size when the caller doesn't choose one
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Where a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertySource {
    Cdn,
    Live,
}

impl fmt::Display for PropertySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertySource::Cdn => f.write_str("cdn"),
            PropertySource::Live => f.write_str("live"),
        }
    }
}

/// Outcome of a property detail lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PropertyLookup {
    Found {
        property: Property,
        source: PropertySource,
    },
    /// Deleted, or unknown to the backend
    NotFound,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyFetchOptions {
    /// Skip the CDN snapshot
    pub live_only: bool,
    pub force_refresh: bool,
}

/// Which feed to page through
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "id", rename_all = "lowercase")]
pub enum FeedScope {
    District(String),
    Region(String),
}

impl FeedScope {
    fn id(&self) -> &str {
        match self {
            FeedScope::District(id) | FeedScope::Region(id) => id,
        }
    }

    fn resource_kind(&self) -> ResourceKind {
        match self {
            FeedScope::District(_) => ResourceKind::DistrictSearchFeed,
            FeedScope::Region(_) => ResourceKind::RegionSearchFeed,
        }
    }

    fn live_operation(&self) -> &'static Operation {
        match self {
            FeedScope::District(_) => &operations::LIST_PROPERTIES_BY_DISTRICT,
            FeedScope::Region(_) => &operations::LIST_PROPERTIES_BY_REGION,
        }
    }

    fn live_variable(&self) -> &'static str {
        match self {
            FeedScope::District(_) => "districtId",
            FeedScope::Region(_) => "regionId",
        }
    }
}

/// Position in a feed.
///
/// Snapshot and live feeds paginate differently, so a cursor from one can't
/// be used with the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum FeedCursor {
    Snapshot { page: u32 },
    Live { next_token: Option<String> },
}

impl FeedCursor {
    /// First page, snapshot first
    pub fn start() -> Self {
        FeedCursor::Snapshot { page: 1 }
    }
}

impl Default for FeedCursor {
    fn default() -> Self {
        Self::start()
    }
}

/// One page of search results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub items: Vec<PropertyCard>,
    /// Cursor for the following page; `None` at the end of the feed
    pub next: Option<FeedCursor>,
    pub source: PropertySource,
    /// Size of the whole snapshot feed (snapshot pages only)
    pub total_in_cache: Option<u64>,
    /// The snapshot feed disappeared mid-way and the live feed was started
    /// from its first page instead
    pub restarted: bool,
    /// The snapshot feed was deleted; the page is empty and final
    pub gone: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiveFeed {
    #[serde(default)]
    items: Vec<PropertyCard>,
    next_token: Option<String>,
}

/// CDN-first property reads
pub struct PropertyService {
    cache: Arc<QueryCache>,
    cdn: Arc<CdnResolver>,
}

impl PropertyService {
    pub fn new(cache: Arc<QueryCache>, cdn: Arc<CdnResolver>) -> Self {
        Self { cache, cdn }
    }

    /// Resolve one property.
    ///
    /// The combined CDN-then-live resolution is cached as one entry, so a
    /// repeat lookup makes no network calls at all.
    pub async fn get_property(&self, id: &str, options: PropertyFetchOptions) -> Result<PropertyLookup> {
        if id.is_empty() {
            return Err(SnapshotError::MissingIdentifier("property id").into());
        }

        let key = derive_key(
            operations::GET_PROPERTY.name,
            &json!({"propertyId": id, "liveOnly": options.live_only}),
        );
        let cdn = Arc::clone(&self.cdn);
        let api = Arc::clone(self.cache.api());
        let id = id.to_string();
        let live_only = options.live_only;

        let value = self
            .cache
            .fetch_with(key, Some(CacheTtl::PROPERTY_DETAIL), options.force_refresh, move || {
                resolve_property(cdn, api, id, live_only)
            })
            .await?;

        Ok(serde_json::from_value(value)?)
    }

    /// Fetch one page of a district or region feed.
    ///
    /// `limit` only applies to live pages; snapshot pages have a fixed size.
    pub async fn search(&self, scope: &FeedScope, cursor: &FeedCursor, limit: Option<u32>) -> Result<FeedPage> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);

        match cursor {
            FeedCursor::Snapshot { page } => {
                let outcome = self
                    .cdn
                    .fetch_snapshot::<SnapshotFeedPage<PropertyCard>>(scope.resource_kind(), scope.id(), Some(*page))
                    .await?;
                let outcome = match outcome {
                    SnapshotOutcome::Hit(feed) if feed.page != *page => {
                        log::warn!(
                            "Snapshot feed {} {} served page {} for page {}",
                            scope.resource_kind(),
                            scope.id(),
                            feed.page,
                            page
                        );
                        SnapshotOutcome::Miss(MissReason::Malformed(format!("unexpected page {}", feed.page)))
                    }
                    other => other,
                };

                match outcome {
                    SnapshotOutcome::Hit(feed) => Ok(FeedPage {
                        next: feed
                            .has_next_page
                            .then(|| FeedCursor::Snapshot { page: page + 1 }),
                        items: feed.items,
                        source: PropertySource::Cdn,
                        total_in_cache: Some(feed.total_in_cache),
                        restarted: false,
                        gone: false,
                    }),
                    SnapshotOutcome::Gone => {
                        log::debug!("Snapshot feed {} {} is deleted", scope.resource_kind(), scope.id());
                        Ok(FeedPage {
                            items: Vec::new(),
                            next: None,
                            source: PropertySource::Cdn,
                            total_in_cache: None,
                            restarted: false,
                            gone: true,
                        })
                    }
                    SnapshotOutcome::Miss(_) => {
                        // Snapshot pages can't be mapped onto live tokens
                        let restarted = *page > 1;
                        if restarted {
                            log::info!(
                                "Snapshot feed {} {} ended at page {}, restarting on live data",
                                scope.resource_kind(),
                                scope.id(),
                                page
                            );
                        }
                        let mut live = self.live_page(scope, None, limit).await?;
                        live.restarted = restarted;
                        Ok(live)
                    }
                }
            }
            FeedCursor::Live { next_token } => self.live_page(scope, next_token.clone(), limit).await,
        }
    }

    async fn live_page(&self, scope: &FeedScope, next_token: Option<String>, limit: u32) -> Result<FeedPage> {
        if scope.id().is_empty() {
            return Err(SnapshotError::MissingIdentifier("feed id").into());
        }

        let operation = scope.live_operation();
        let mut variables = json!({ "limit": limit, "nextToken": next_token });
        variables[scope.live_variable()] = json!(scope.id());

        let data = self
            .cache
            .query(
                operation,
                variables,
                QueryOptions::new()
                    .ttl(CacheTtl::SEARCH_FEED)
                    .access(Access::Public),
            )
            .await?;

        let feed = extract_field::<LiveFeed>(&data, operation.name)?;
        let (items, next_token) = match feed {
            Some(feed) => (feed.items, feed.next_token),
            None => (Vec::new(), None),
        };

        Ok(FeedPage {
            items,
            next: next_token.map(|token| FeedCursor::Live {
                next_token: Some(token),
            }),
            source: PropertySource::Live,
            total_in_cache: None,
            restarted: false,
            gone: false,
        })
    }
}

/// Snapshot first, then the live backend; the lookup as a cacheable value
async fn resolve_property(
    cdn: Arc<CdnResolver>,
    api: Arc<dyn GraphQlApi>,
    id: String,
    live_only: bool,
) -> Result<Value> {
    if !live_only {
        match cdn.fetch_snapshot::<Property>(ResourceKind::Property, &id, None).await? {
            SnapshotOutcome::Hit(property) => {
                return Ok(serde_json::to_value(PropertyLookup::Found {
                    property,
                    source: PropertySource::Cdn,
                })?);
            }
            SnapshotOutcome::Gone => return Ok(serde_json::to_value(PropertyLookup::NotFound)?),
            SnapshotOutcome::Miss(reason) => {
                log::debug!("Property {} snapshot miss ({}), querying live", id, reason);
            }
        }
    }

    let data = api
        .execute_public(&operations::GET_PROPERTY, &json!({"propertyId": id}))
        .await?;
    let lookup = match extract_field::<Property>(&data, "getProperty")? {
        Some(property) => PropertyLookup::Found {
            property,
            source: PropertySource::Live,
        },
        None => PropertyLookup::NotFound,
    };
    Ok(serde_json::to_value(lookup)?)
}
