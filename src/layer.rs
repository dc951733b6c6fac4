//! Wiring of the data layer components

use std::sync::Arc;

use crate::cache::{CacheStorage, QueryCache, QueryCacheSettings};
use crate::cdn::CdnResolver;
use crate::client::{ConfigSession, GraphQlApi, GraphQlClient, HttpTransport};
use crate::config::{CacheSettings, Config};
use crate::error::{ConfigError, Result};
use crate::location::{LocationPicker, LocationResolver};
use crate::properties::PropertyService;

/// One set of shared components: a single cache, CDN resolver and location
/// hierarchy per backend.
pub struct DataLayer {
    cache: Arc<QueryCache>,
    cdn: Arc<CdnResolver>,
    properties: PropertyService,
    locations: Arc<LocationResolver>,
}

impl DataLayer {
    /// Build the HTTP-backed layer described by `config`.
    ///
    /// A persisted cache that can't be opened is logged and skipped.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate_endpoints()?;
        let (Some(endpoint), Some(api_key)) = (&config.graphql_url, &config.api_key) else {
            return Err(ConfigError::MissingEndpoint.into());
        };

        let transport = HttpTransport::new(endpoint.clone())?;
        let client = GraphQlClient::new(
            Arc::new(transport),
            Arc::new(ConfigSession::from_config(config)),
            api_key.clone(),
        );
        let cdn = CdnResolver::new(config.cdn_url.clone(), config.cache.cdn_cooldown())?;

        let storage = if config.cache.enabled && config.cache.persist {
            match CacheStorage::open() {
                Ok(storage) => Some(storage),
                Err(e) => {
                    log::warn!("Persisted cache unavailable, using memory only: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Ok(Self::from_parts(Arc::new(client), cdn, &config.cache, storage))
    }

    /// Assemble the layer from already-built parts
    pub fn from_parts(
        api: Arc<dyn GraphQlApi>,
        cdn: CdnResolver,
        settings: &CacheSettings,
        storage: Option<CacheStorage>,
    ) -> Self {
        let cache = QueryCache::new(
            Arc::clone(&api),
            QueryCacheSettings {
                enabled: settings.enabled,
                max_entries: settings.max_entries,
                default_ttl: settings.default_ttl(),
            },
        );
        let cache = Arc::new(match storage {
            Some(storage) => cache.with_storage(storage),
            None => cache,
        });
        let cdn = Arc::new(cdn);

        Self {
            properties: PropertyService::new(Arc::clone(&cache), Arc::clone(&cdn)),
            locations: Arc::new(LocationResolver::with_ttl(api, settings.location_ttl())),
            cache,
            cdn,
        }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub fn cdn(&self) -> &Arc<CdnResolver> {
        &self.cdn
    }

    pub fn api(&self) -> &Arc<dyn GraphQlApi> {
        self.cache.api()
    }

    pub fn properties(&self) -> &PropertyService {
        &self.properties
    }

    pub fn locations(&self) -> &Arc<LocationResolver> {
        &self.locations
    }

    /// A fresh picker over the shared location cache
    pub fn location_picker(&self) -> LocationPicker {
        LocationPicker::new(Arc::clone(&self.locations))
    }

    pub fn clear_location_cache(&self) {
        self.locations.reset();
    }

    /// Drop every cached query, snapshot resolution and location list
    pub fn clear_all(&self) -> usize {
        self.locations.reset();
        self.cache.clear_all()
    }
}
