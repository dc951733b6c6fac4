//! Location display model

use serde::Serialize;
use tabled::Tabled;

use rentkit::client::models::LocationNode;

/// Region/district/ward/street row
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct LocationDisplay {
    #[tabled(rename = "ID")]
    pub id: String,

    #[tabled(rename = "NAME")]
    pub name: String,

    #[tabled(rename = "PARENT")]
    pub parent: String,
}

impl From<&LocationNode> for LocationDisplay {
    fn from(node: &LocationNode) -> Self {
        Self {
            id: node.id.clone(),
            name: node.name.clone(),
            parent: node.parent_id.clone().unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_node_has_no_parent() {
        let display = LocationDisplay::from(&LocationNode::new("r1", "Arusha"));
        assert_eq!(display.parent, "-");
    }

    #[test]
    fn test_child_node_shows_parent() {
        let mut node = LocationNode::new("d1", "Arusha Urban");
        node.parent_id = Some("r1".to_string());
        assert_eq!(LocationDisplay::from(&node).parent, "r1");
    }
}
