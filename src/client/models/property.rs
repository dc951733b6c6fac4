//! Property records

use serde::{Deserialize, Serialize};

fn default_currency() -> String {
    "TZS".to_string()
}

/// Monthly rent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    pub monthly_rent: f64,

    #[serde(default = "default_currency")]
    pub currency: String,
}

/// Administrative location of a property
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub region: String,

    #[serde(default)]
    pub district: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ward: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
}

/// Image URLs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Media {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

/// Full property record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub property_id: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// APARTMENT, HOUSE, ROOM, ...
    pub property_type: String,

    /// AVAILABLE, RENTED, UNAVAILABLE, ...
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u32>,

    pub pricing: Pricing,

    #[serde(default)]
    pub address: Address,

    #[serde(default)]
    pub media: Media,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub amenities: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub landlord_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Property {
    pub fn is_available(&self) -> bool {
        self.status.as_deref() == Some("AVAILABLE")
    }

    /// Thumbnail, falling back to the first gallery image
    pub fn thumbnail(&self) -> Option<&str> {
        self.media
            .thumbnail
            .as_deref()
            .or_else(|| self.media.images.first().map(String::as_str))
    }
}

/// Search-feed projection of a property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyCard {
    pub property_id: String,

    pub title: String,

    pub property_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,

    pub pricing: Pricing,

    #[serde(default)]
    pub address: Address,

    #[serde(default)]
    pub media: Media,
}

impl From<&Property> for PropertyCard {
    fn from(p: &Property) -> Self {
        Self {
            property_id: p.property_id.clone(),
            title: p.title.clone(),
            property_type: p.property_type.clone(),
            bedrooms: p.bedrooms,
            pricing: p.pricing.clone(),
            address: Address {
                region: p.address.region.clone(),
                district: p.address.district.clone(),
                ward: None,
                street: None,
            },
            media: Media {
                images: Vec::new(),
                thumbnail: p.thumbnail().map(str::to_string),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_property_deserializes_backend_shape() {
        let property: Property = serde_json::from_value(json!({
            "propertyId": "p1",
            "title": "Two bedroom apartment in Mikocheni",
            "propertyType": "APARTMENT",
            "status": "AVAILABLE",
            "bedrooms": 2,
            "pricing": {"monthlyRent": 850000, "currency": "TZS"},
            "address": {"region": "Dar es Salaam", "district": "Kinondoni", "ward": "Mikocheni"},
            "media": {"images": ["https://img/1.jpg", "https://img/2.jpg"]},
            "amenities": ["parking", "water tank"]
        }))
        .unwrap();

        assert!(property.is_available());
        assert_eq!(property.pricing.monthly_rent, 850000.0);
        assert_eq!(property.thumbnail(), Some("https://img/1.jpg"));
        assert_eq!(property.address.ward.as_deref(), Some("Mikocheni"));
    }

    #[test]
    fn test_card_from_property() {
        let property: Property = serde_json::from_value(json!({
            "propertyId": "p2",
            "title": "Room",
            "propertyType": "ROOM",
            "pricing": {"monthlyRent": 120000},
            "media": {"thumbnail": "https://img/t.jpg"}
        }))
        .unwrap();

        let card = PropertyCard::from(&property);
        assert_eq!(card.property_id, "p2");
        assert_eq!(card.pricing.currency, "TZS");
        assert_eq!(card.media.thumbnail.as_deref(), Some("https://img/t.jpg"));
    }
}
