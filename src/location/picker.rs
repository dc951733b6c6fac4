//! Cascading region → district → ward → street selection
//!
//! Selecting a level clears everything below it and loads only the next
//! level's options. Responses for a selection that has since changed are
//! dropped, so a slow reply can never overwrite a newer one.

use std::sync::{Arc, Mutex};

use serde::Serialize;

use super::LocationResolver;
use crate::cache::lock;
use crate::client::models::{LocationLevel, LocationNode};
use crate::error::Result;

/// Options shown for one level
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum LevelOptions {
    #[default]
    Idle,
    Loading,
    Loaded(Vec<LocationNode>),
    Failed(String),
}

/// Currently selected ids
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub region: Option<String>,
    pub district: Option<String>,
    pub ward: Option<String>,
    pub street: Option<String>,
}

impl Selection {
    fn slot(&mut self, level: LocationLevel) -> &mut Option<String> {
        match level {
            LocationLevel::Region => &mut self.region,
            LocationLevel::District => &mut self.district,
            LocationLevel::Ward => &mut self.ward,
            LocationLevel::Street => &mut self.street,
        }
    }
}

/// Point-in-time view of the picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickerSnapshot {
    pub selection: Selection,
    pub regions: LevelOptions,
    pub districts: LevelOptions,
    pub wards: LevelOptions,
    pub streets: LevelOptions,
}

impl PickerSnapshot {
    pub fn options(&self, level: LocationLevel) -> &LevelOptions {
        match level {
            LocationLevel::Region => &self.regions,
            LocationLevel::District => &self.districts,
            LocationLevel::Ward => &self.wards,
            LocationLevel::Street => &self.streets,
        }
    }
}

#[derive(Default)]
struct PickerState {
    selection: Selection,
    options: [LevelOptions; 4],
    /// Bumped whenever a level's pending response becomes obsolete
    requests: [u64; 4],
}

fn index(level: LocationLevel) -> usize {
    match level {
        LocationLevel::Region => 0,
        LocationLevel::District => 1,
        LocationLevel::Ward => 2,
        LocationLevel::Street => 3,
    }
}

/// Selection state machine over a shared [`LocationResolver`]
pub struct LocationPicker {
    resolver: Arc<LocationResolver>,
    state: Mutex<PickerState>,
}

impl LocationPicker {
    pub fn new(resolver: Arc<LocationResolver>) -> Self {
        Self {
            resolver,
            state: Mutex::new(PickerState::default()),
        }
    }

    /// Populate the region options
    pub async fn load_regions(&self) -> Result<()> {
        let request = self.begin_load(LocationLevel::Region);
        let result = self.resolver.fetch_regions().await;
        self.finish_load(LocationLevel::Region, request, result)
    }

    pub async fn select_region(&self, id: &str) -> Result<()> {
        self.select(LocationLevel::Region, id).await
    }

    pub async fn select_district(&self, id: &str) -> Result<()> {
        self.select(LocationLevel::District, id).await
    }

    pub async fn select_ward(&self, id: &str) -> Result<()> {
        self.select(LocationLevel::Ward, id).await
    }

    /// Streets are the last level; nothing is loaded
    pub async fn select_street(&self, id: &str) -> Result<()> {
        self.select(LocationLevel::Street, id).await
    }

    async fn select(&self, level: LocationLevel, id: &str) -> Result<()> {
        let Some(child) = level.child() else {
            lock(&self.state).selection.street = Some(id.to_string());
            return Ok(());
        };

        let request = {
            let mut state = lock(&self.state);
            *state.selection.slot(level) = Some(id.to_string());
            self.clear_below(&mut state, level);
            state.options[index(child)] = LevelOptions::Loading;
            state.requests[index(child)]
        };

        let result = self.resolver.fetch(child, Some(id)).await;
        self.finish_load(child, request, result)
    }

    /// Clear selections and options under `level`, invalidating their
    /// pending responses
    fn clear_below(&self, state: &mut PickerState, level: LocationLevel) {
        let mut next = level.child();
        while let Some(lower) = next {
            *state.selection.slot(lower) = None;
            state.options[index(lower)] = LevelOptions::Idle;
            state.requests[index(lower)] += 1;
            next = lower.child();
        }
    }

    fn begin_load(&self, level: LocationLevel) -> u64 {
        let mut state = lock(&self.state);
        state.requests[index(level)] += 1;
        state.options[index(level)] = LevelOptions::Loading;
        state.requests[index(level)]
    }

    fn finish_load(&self, level: LocationLevel, request: u64, result: Result<Vec<LocationNode>>) -> Result<()> {
        let mut state = lock(&self.state);
        if state.requests[index(level)] != request {
            log::debug!("Dropping stale {} options", level);
            return Ok(());
        }

        match result {
            Ok(nodes) => {
                state.options[index(level)] = LevelOptions::Loaded(nodes);
                Ok(())
            }
            Err(e) => {
                state.options[index(level)] = LevelOptions::Failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Clear the selection and every option list
    pub fn reset(&self) {
        let mut state = lock(&self.state);
        state.selection = Selection::default();
        for level in LocationLevel::ALL {
            state.options[index(level)] = LevelOptions::Idle;
            state.requests[index(level)] += 1;
        }
    }

    pub fn snapshot(&self) -> PickerSnapshot {
        let state = lock(&self.state);
        let [regions, districts, wards, streets] = state.options.clone();
        PickerSnapshot {
            selection: state.selection.clone(),
            regions,
            districts,
            wards,
            streets,
        }
    }
}
