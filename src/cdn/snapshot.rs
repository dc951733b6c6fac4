//! Snapshot documents published to the CDN
//!
//! Parsing never panics: anything that isn't a well-formed, complete
//! document is a [`SnapshotError`], which the resolver treats as a miss.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::models::{Property, PropertyCard};
use crate::error::SnapshotError;

/// Required-field check run after deserialization
pub trait Validate {
    fn validate(&self) -> Result<(), SnapshotError>;
}

fn require(field: &str, value: &str) -> Result<(), SnapshotError> {
    if value.trim().is_empty() {
        return Err(SnapshotError::Invalid(format!("`{}` is empty", field)));
    }
    Ok(())
}

impl Validate for Property {
    fn validate(&self) -> Result<(), SnapshotError> {
        require("propertyId", &self.property_id)?;
        require("title", &self.title)?;
        require("propertyType", &self.property_type)
    }
}

impl Validate for PropertyCard {
    fn validate(&self) -> Result<(), SnapshotError> {
        require("propertyId", &self.property_id)?;
        require("title", &self.title)
    }
}

/// One page of a pre-rendered search feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFeedPage<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub has_next_page: bool,
    /// Number of listings in the whole snapshot feed
    pub total_in_cache: u64,
}

impl<T: Validate> Validate for SnapshotFeedPage<T> {
    fn validate(&self) -> Result<(), SnapshotError> {
        if self.page == 0 {
            return Err(SnapshotError::Invalid("page numbers start at 1".to_string()));
        }
        for (i, item) in self.items.iter().enumerate() {
            item.validate()
                .map_err(|e| SnapshotError::Invalid(format!("item {}: {}", i, e)))?;
        }
        Ok(())
    }
}

/// A parsed snapshot document
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedSnapshot<T> {
    Document(T),
    /// Tombstone left behind for a soft-deleted resource
    Deleted,
}

/// Parse and validate a snapshot body.
///
/// A body flagged `deleted` or `isDeleted` is a tombstone and is not
/// checked any further.
pub fn parse_snapshot<T>(bytes: &[u8]) -> Result<ParsedSnapshot<T>, SnapshotError>
where
    T: DeserializeOwned + Validate,
{
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| SnapshotError::Parse(e.to_string()))?;

    if !value.is_object() {
        return Err(SnapshotError::Parse("expected a JSON object".to_string()));
    }
    if is_tombstone(&value) {
        return Ok(ParsedSnapshot::Deleted);
    }

    let document: T =
        serde_json::from_value(value).map_err(|e| SnapshotError::Invalid(e.to_string()))?;
    document.validate()?;
    Ok(ParsedSnapshot::Document(document))
}

fn is_tombstone(value: &Value) -> bool {
    ["deleted", "isDeleted"]
        .iter()
        .any(|flag| value.get(flag).and_then(Value::as_bool) == Some(true))
}
