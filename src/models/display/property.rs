//! Property display models

use serde::Serialize;
use tabled::Tabled;

use rentkit::client::models::{Property, PropertyCard};

use super::common::{format_as_iso_datetime, format_rent, truncate_string};

/// Search result row
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct PropertyDisplay {
    #[tabled(rename = "ID")]
    pub id: String,

    #[tabled(rename = "TITLE")]
    pub title: String,

    #[tabled(rename = "TYPE")]
    pub property_type: String,

    #[tabled(rename = "BEDS")]
    pub bedrooms: String,

    #[tabled(rename = "RENT / MONTH")]
    pub rent: String,

    #[tabled(rename = "LOCATION")]
    pub location: String,
}

impl From<&PropertyCard> for PropertyDisplay {
    fn from(card: &PropertyCard) -> Self {
        Self {
            id: card.property_id.clone(),
            title: truncate_string(&card.title, 40),
            property_type: card.property_type.clone(),
            bedrooms: card
                .bedrooms
                .map(|b| b.to_string())
                .unwrap_or_else(|| "-".to_string()),
            rent: format_rent(card.pricing.monthly_rent, &card.pricing.currency),
            location: location_line(&[&card.address.district, &card.address.region]),
        }
    }
}

/// One `FIELD | VALUE` line of a detail view
#[derive(Debug, Clone, Tabled, Serialize)]
pub struct FieldRow {
    #[tabled(rename = "FIELD")]
    pub field: &'static str,

    #[tabled(rename = "VALUE")]
    pub value: String,
}

fn row(field: &'static str, value: impl Into<String>) -> FieldRow {
    FieldRow {
        field,
        value: value.into(),
    }
}

/// Detail view of a property, skipping fields it doesn't have
pub fn property_detail_rows(property: &Property, source: &str) -> Vec<FieldRow> {
    let mut rows = vec![
        row("ID", property.property_id.clone()),
        row("Title", property.title.clone()),
        row("Type", property.property_type.clone()),
        row("Rent", format_rent(property.pricing.monthly_rent, &property.pricing.currency)),
    ];

    if let Some(status) = &property.status {
        rows.push(row("Status", status.clone()));
    }
    if let Some(bedrooms) = property.bedrooms {
        rows.push(row("Bedrooms", bedrooms.to_string()));
    }
    if let Some(bathrooms) = property.bathrooms {
        rows.push(row("Bathrooms", bathrooms.to_string()));
    }

    let address = &property.address;
    let street = address.street.as_deref().unwrap_or_default();
    let ward = address.ward.as_deref().unwrap_or_default();
    rows.push(row(
        "Location",
        location_line(&[street, ward, &address.district, &address.region]),
    ));

    if !property.amenities.is_empty() {
        rows.push(row("Amenities", property.amenities.join(", ")));
    }
    if let Some(description) = &property.description {
        rows.push(row("Description", truncate_string(description, 80)));
    }
    if let Some(thumbnail) = property.thumbnail() {
        rows.push(row("Image", thumbnail));
    }
    if let Some(updated) = &property.updated_at {
        rows.push(row("Updated", format_as_iso_datetime(updated)));
    }
    rows.push(row("Source", source));

    rows
}

fn location_line(parts: &[&str]) -> String {
    let line = parts
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    if line.is_empty() { "-".to_string() } else { line }
}
