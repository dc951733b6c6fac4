//! Hierarchical location lookups
//!
//! Regions, districts, wards and streets are fetched lazily per parent and
//! cached together. All levels share one load timestamp: once it is older
//! than the TTL the whole hierarchy is dropped on the next fetch.

mod picker;

pub use picker::{LevelOptions, LocationPicker, PickerSnapshot, Selection};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde_json::{Map, Value};
use tokio::time::Instant;

use crate::cache::{CacheTtl, lock};
use crate::client::models::{LocationLevel, LocationNode};
use crate::client::{GraphQlApi, extract_field};
use crate::error::{Error, Result};

type SharedLoad = Shared<BoxFuture<'static, Result<Vec<LocationNode>>>>;

/// (level, parent id); the parent is empty for regions
type LevelKey = (LocationLevel, String);

/// Load progress of one (level, parent) list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    NotRequested,
    Loading,
    Loaded,
    Failed(String),
}

struct InFlight {
    id: u64,
    future: SharedLoad,
}

#[derive(Default)]
struct ResolverState {
    lists: HashMap<LevelKey, Vec<LocationNode>>,
    states: HashMap<LevelKey, LoadState>,
    in_flight: HashMap<LevelKey, InFlight>,
    /// Set by the first successful load after a reset
    loaded_at: Option<Instant>,
    generation: u64,
}

impl ResolverState {
    fn expire_if_stale(&mut self, ttl: Duration, now: Instant) {
        if let Some(loaded_at) = self.loaded_at
            && now.duration_since(loaded_at) > ttl
        {
            log::debug!("Location cache expired, dropping all levels");
            self.lists.clear();
            self.states.retain(|_, s| *s == LoadState::Loading);
            self.loaded_at = None;
        }
    }
}

/// Lazily loaded, cached location hierarchy
pub struct LocationResolver {
    api: Arc<dyn GraphQlApi>,
    ttl: Duration,
    state: Arc<Mutex<ResolverState>>,
    next_request_id: AtomicU64,
}

impl LocationResolver {
    pub fn new(api: Arc<dyn GraphQlApi>) -> Self {
        Self::with_ttl(api, CacheTtl::LOCATIONS)
    }

    pub fn with_ttl(api: Arc<dyn GraphQlApi>, ttl: Duration) -> Self {
        Self {
            api,
            ttl,
            state: Arc::new(Mutex::new(ResolverState::default())),
            next_request_id: AtomicU64::new(0),
        }
    }

    pub async fn fetch_regions(&self) -> Result<Vec<LocationNode>> {
        self.fetch(LocationLevel::Region, None).await
    }

    pub async fn fetch_districts(&self, region_id: &str) -> Result<Vec<LocationNode>> {
        self.fetch(LocationLevel::District, Some(region_id)).await
    }

    pub async fn fetch_wards(&self, district_id: &str) -> Result<Vec<LocationNode>> {
        self.fetch(LocationLevel::Ward, Some(district_id)).await
    }

    pub async fn fetch_streets(&self, ward_id: &str) -> Result<Vec<LocationNode>> {
        self.fetch(LocationLevel::Street, Some(ward_id)).await
    }

    /// Children of `parent` at `level`, sorted by name.
    ///
    /// `parent` must be `None` for regions and a non-empty id otherwise.
    pub async fn fetch(&self, level: LocationLevel, parent: Option<&str>) -> Result<Vec<LocationNode>> {
        let key = level_key(level, parent)?;

        let shared = {
            let mut state = lock(&self.state);
            state.expire_if_stale(self.ttl, Instant::now());

            if let Some(nodes) = state.lists.get(&key) {
                log::debug!("Location cache hit: {} {}", level, key.1);
                return Ok(nodes.clone());
            }

            match state.in_flight.get(&key) {
                Some(in_flight) => in_flight.future.clone(),
                None => {
                    let id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
                    let future = self.shared_load(id, key.clone(), state.generation);
                    state.states.insert(key.clone(), LoadState::Loading);
                    state.in_flight.insert(
                        key,
                        InFlight {
                            id,
                            future: future.clone(),
                        },
                    );
                    future
                }
            }
        };

        shared.await
    }

    fn shared_load(&self, id: u64, key: LevelKey, generation: u64) -> SharedLoad {
        let api = Arc::clone(&self.api);
        let state = Arc::clone(&self.state);

        async move {
            let (level, parent) = &key;
            let result = load_level(api.as_ref(), *level, parent).await;

            let mut state = lock(&state);
            if state.in_flight.get(&key).is_some_and(|f| f.id == id) {
                state.in_flight.remove(&key);
            }
            if state.generation != generation {
                log::debug!("Discarding {} list loaded before reset", level);
                return result;
            }

            match &result {
                Ok(nodes) => {
                    state.lists.insert(key.clone(), nodes.clone());
                    state.states.insert(key, LoadState::Loaded);
                    if state.loaded_at.is_none() {
                        state.loaded_at = Some(Instant::now());
                    }
                }
                Err(e) => {
                    state.states.insert(key, LoadState::Failed(e.to_string()));
                }
            }
            result
        }
        .boxed()
        .shared()
    }

    /// Load progress for one list
    pub fn load_state(&self, level: LocationLevel, parent: Option<&str>) -> LoadState {
        let Ok(key) = level_key(level, parent) else {
            return LoadState::NotRequested;
        };
        let mut state = lock(&self.state);
        state.expire_if_stale(self.ttl, Instant::now());
        state
            .states
            .get(&key)
            .cloned()
            .unwrap_or(LoadState::NotRequested)
    }

    /// Drop every cached level; loads in flight are not stored
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.generation += 1;
        state.lists.clear();
        state.states.clear();
        state.in_flight.clear();
        state.loaded_at = None;
    }

    /// When the cached hierarchy was first loaded
    pub fn loaded_at(&self) -> Option<Instant> {
        lock(&self.state).loaded_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

fn level_key(level: LocationLevel, parent: Option<&str>) -> Result<LevelKey> {
    match (level.parent_variable(), parent) {
        (None, None) => Ok((level, String::new())),
        (None, Some(_)) => Err(Error::Other(format!("{} lists take no parent id", level))),
        (Some(_), Some(parent)) if !parent.is_empty() => Ok((level, parent.to_string())),
        (Some(variable), _) => Err(Error::Other(format!("{} list requires `{}`", level, variable))),
    }
}

async fn load_level(api: &dyn GraphQlApi, level: LocationLevel, parent: &str) -> Result<Vec<LocationNode>> {
    let operation = level.operation();
    let mut variables = Map::new();
    if let Some(variable) = level.parent_variable() {
        variables.insert(variable.to_string(), Value::String(parent.to_string()));
    }

    let data = api.execute_public(operation, &Value::Object(variables)).await?;
    let mut nodes: Vec<LocationNode> = extract_field(&data, operation.name)?.unwrap_or_default();
    sort_nodes(&mut nodes);
    Ok(nodes)
}

/// Case-insensitive by name, ties broken by id
pub fn sort_nodes(nodes: &mut [LocationNode]) {
    nodes.sort_by_cached_key(|node| (node.name.to_lowercase(), node.id.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{GraphQlClient, MockTransport, StaticSession};
    use crate::error::ApiError;
    use serde_json::json;

    pub(super) fn location_transport() -> MockTransport {
        MockTransport::new()
            .respond(
                "listRegions",
                json!({"listRegions": [
                    {"id": "r2", "name": "mwanza"},
                    {"id": "r1", "name": "Arusha"},
                    {"id": "r3", "name": "Dar es Salaam"}
                ]}),
            )
            .respond_with("listDistricts", |vars| {
                let region = vars["regionId"].as_str().unwrap_or_default().to_string();
                Ok(json!({"listDistricts": [
                    {"id": format!("{}-d2", region), "parentId": region, "name": "Zeta"},
                    {"id": format!("{}-d1", region), "parentId": region, "name": "Alpha"}
                ]}))
            })
            .respond_with("listWards", |vars| {
                let district = vars["districtId"].as_str().unwrap_or_default().to_string();
                Ok(json!({"listWards": [
                    {"id": format!("{}-w1", district), "parentId": district, "name": "Ward One"}
                ]}))
            })
            .respond_with("listStreets", |vars| {
                let ward = vars["wardId"].as_str().unwrap_or_default().to_string();
                Ok(json!({"listStreets": [
                    {"id": format!("{}-s1", ward), "parentId": ward, "name": "Main Street"}
                ]}))
            })
    }

    pub(super) fn resolver_over(transport: Arc<MockTransport>) -> LocationResolver {
        let client = GraphQlClient::new(transport, Arc::new(StaticSession::anonymous()), "public-key");
        LocationResolver::new(Arc::new(client))
    }

    fn names(nodes: &[LocationNode]) -> Vec<&str> {
        nodes.iter().map(|n| n.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_regions_sorted_case_insensitively() {
        let resolver = resolver_over(Arc::new(location_transport()));
        let regions = resolver.fetch_regions().await.unwrap();
        assert_eq!(names(&regions), ["Arusha", "Dar es Salaam", "mwanza"]);
    }

    #[test]
    fn test_sort_ties_by_id() {
        let mut nodes = vec![
            LocationNode::new("b", "Mbezi"),
            LocationNode::new("a", "mbezi"),
            LocationNode::new("c", "Kawe"),
        ];
        sort_nodes(&mut nodes);
        let ids: Vec<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_regions_alone_load_no_children() {
        let transport = Arc::new(location_transport());
        let resolver = resolver_over(transport.clone());

        resolver.fetch_regions().await.unwrap();

        assert_eq!(transport.calls_for("listRegions"), 1);
        assert_eq!(transport.calls_for("listDistricts"), 0);
        assert_eq!(transport.calls_for("listWards"), 0);
        assert_eq!(transport.calls_for("listStreets"), 0);
        assert_eq!(
            resolver.load_state(LocationLevel::District, Some("r1")),
            LoadState::NotRequested
        );
    }

    #[tokio::test]
    async fn test_children_fetched_per_parent_with_public_access() {
        let transport = Arc::new(location_transport());
        let resolver = resolver_over(transport.clone());

        let districts = resolver.fetch_districts("r1").await.unwrap();
        assert_eq!(names(&districts), ["Alpha", "Zeta"]);
        assert_eq!(districts[0].parent_id.as_deref(), Some("r1"));

        resolver.fetch_districts("r1").await.unwrap();
        resolver.fetch_districts("r2").await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|c| c.auth == crate::client::AuthMode::ApiKey));
        assert_eq!(calls[1].variables, json!({"regionId": "r2"}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_fetches_share_request() {
        let transport = Arc::new(location_transport().delay("listWards", Duration::from_millis(50)));
        let resolver = resolver_over(transport.clone());

        let (a, b) = tokio::join!(resolver.fetch_wards("d1"), resolver.fetch_wards("d1"));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(transport.calls_for("listWards"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_states() {
        let transport = Arc::new(location_transport().delay("listStreets", Duration::from_millis(50)));
        let resolver = Arc::new(resolver_over(transport));

        assert_eq!(
            resolver.load_state(LocationLevel::Street, Some("w1")),
            LoadState::NotRequested
        );

        let pending = {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.fetch_streets("w1").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(resolver.load_state(LocationLevel::Street, Some("w1")), LoadState::Loading);

        pending.await.unwrap().unwrap();
        assert_eq!(resolver.load_state(LocationLevel::Street, Some("w1")), LoadState::Loaded);
    }

    #[tokio::test]
    async fn test_failed_ward_fetch_leaves_nothing_cached() {
        let transport = Arc::new(
            location_transport().fail_next(ApiError::ServerError("wards unavailable".to_string())),
        );
        let resolver = resolver_over(transport.clone());

        let err = resolver.fetch_wards("d7").await.unwrap_err();
        assert!(matches!(err, Error::Api(ApiError::ServerError(_))));
        assert!(matches!(
            resolver.load_state(LocationLevel::Ward, Some("d7")),
            LoadState::Failed(_)
        ));

        // Failed re-enters loading on the next request
        let wards = resolver.fetch_wards("d7").await.unwrap();
        assert_eq!(wards.len(), 1);
        assert_eq!(transport.calls_for("listWards"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_global_ttl_drops_every_level() {
        let transport = Arc::new(location_transport());
        let resolver = resolver_over(transport.clone());

        resolver.fetch_regions().await.unwrap();
        tokio::time::advance(Duration::from_secs(30 * 60)).await;
        resolver.fetch_districts("r1").await.unwrap();

        // Regions expire an hour after the first load, taking districts along
        tokio::time::advance(Duration::from_secs(31 * 60)).await;
        resolver.fetch_districts("r1").await.unwrap();
        resolver.fetch_regions().await.unwrap();

        assert_eq!(transport.calls_for("listRegions"), 2);
        assert_eq!(transport.calls_for("listDistricts"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_within_ttl_served_from_cache() {
        let transport = Arc::new(location_transport());
        let resolver = resolver_over(transport.clone());

        resolver.fetch_regions().await.unwrap();
        tokio::time::advance(CacheTtl::LOCATIONS).await;
        resolver.fetch_regions().await.unwrap();

        assert_eq!(transport.calls_for("listRegions"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_in_flight_load() {
        let transport = Arc::new(location_transport().delay("listRegions", Duration::from_millis(50)));
        let resolver = Arc::new(resolver_over(transport.clone()));

        let pending = {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.fetch_regions().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        resolver.reset();

        assert!(pending.await.unwrap().is_ok());
        assert_eq!(
            resolver.load_state(LocationLevel::Region, None),
            LoadState::NotRequested
        );
        assert!(resolver.loaded_at().is_none());

        resolver.fetch_regions().await.unwrap();
        assert_eq!(transport.calls_for("listRegions"), 2);
    }

    #[tokio::test]
    async fn test_parent_id_is_required() {
        let resolver = resolver_over(Arc::new(location_transport()));
        assert!(resolver.fetch_districts("").await.is_err());
        assert!(resolver.fetch(LocationLevel::Region, Some("r1")).await.is_err());
    }
}
