//! Administrative location hierarchy: region → district → ward → street

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::client::Operation;
use crate::client::operations;

/// One level of the location hierarchy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationLevel {
    Region,
    District,
    Ward,
    Street,
}

impl LocationLevel {
    pub const ALL: [LocationLevel; 4] = [
        LocationLevel::Region,
        LocationLevel::District,
        LocationLevel::Ward,
        LocationLevel::Street,
    ];

    /// Operation that lists this level's nodes
    pub fn operation(self) -> &'static Operation {
        match self {
            LocationLevel::Region => &operations::LIST_REGIONS,
            LocationLevel::District => &operations::LIST_DISTRICTS,
            LocationLevel::Ward => &operations::LIST_WARDS,
            LocationLevel::Street => &operations::LIST_STREETS,
        }
    }

    /// Variable carrying the parent id, `None` for the root level
    pub fn parent_variable(self) -> Option<&'static str> {
        match self {
            LocationLevel::Region => None,
            LocationLevel::District => Some("regionId"),
            LocationLevel::Ward => Some("districtId"),
            LocationLevel::Street => Some("wardId"),
        }
    }

    /// The level below this one
    pub fn child(self) -> Option<LocationLevel> {
        match self {
            LocationLevel::Region => Some(LocationLevel::District),
            LocationLevel::District => Some(LocationLevel::Ward),
            LocationLevel::Ward => Some(LocationLevel::Street),
            LocationLevel::Street => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LocationLevel::Region => "region",
            LocationLevel::District => "district",
            LocationLevel::Ward => "ward",
            LocationLevel::Street => "street",
        }
    }
}

impl fmt::Display for LocationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A region, district, ward or street
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationNode {
    pub id: String,

    pub name: String,

    /// Id of the enclosing node (absent for regions)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl LocationNode {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            parent_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_chain() {
        let mut level = LocationLevel::Region;
        let mut seen = vec![level];
        while let Some(next) = level.child() {
            seen.push(next);
            level = next;
        }
        assert_eq!(seen, LocationLevel::ALL);
    }

    #[test]
    fn test_only_root_has_no_parent_variable() {
        assert!(LocationLevel::Region.parent_variable().is_none());
        assert_eq!(LocationLevel::Ward.parent_variable(), Some("districtId"));
        assert_eq!(LocationLevel::Street.operation().name, "listStreets");
    }

    #[test]
    fn test_node_deserializes_aliased_fields() {
        let node: LocationNode =
            serde_json::from_str(r#"{"id":"d1","parentId":"r1","name":"Ilala"}"#).unwrap();
        assert_eq!(node.parent_id.as_deref(), Some("r1"));
    }
}
