//! GraphQL operation documents used by the data layer
//!
//! Location documents alias every level's key to `id`/`parentId` so all four
//! levels deserialize into [`LocationNode`](crate::client::models::LocationNode).

use super::Operation;

pub const GET_PROPERTY: Operation = Operation::new(
    "getProperty",
    r#"query getProperty($propertyId: ID!) {
  getProperty(propertyId: $propertyId) {
    propertyId
    title
    description
    propertyType
    status
    bedrooms
    bathrooms
    pricing { monthlyRent currency }
    address { region district ward street }
    media { images thumbnail }
    amenities
    landlordId
    createdAt
    updatedAt
  }
}"#,
);

pub const LIST_PROPERTIES_BY_DISTRICT: Operation = Operation::new(
    "listPropertiesByDistrict",
    r#"query listPropertiesByDistrict($districtId: ID!, $limit: Int, $nextToken: String) {
  listPropertiesByDistrict(districtId: $districtId, limit: $limit, nextToken: $nextToken) {
    items {
      propertyId
      title
      propertyType
      bedrooms
      pricing { monthlyRent currency }
      address { region district }
      media { thumbnail }
    }
    nextToken
  }
}"#,
);

pub const LIST_PROPERTIES_BY_REGION: Operation = Operation::new(
    "listPropertiesByRegion",
    r#"query listPropertiesByRegion($regionId: ID!, $limit: Int, $nextToken: String) {
  listPropertiesByRegion(regionId: $regionId, limit: $limit, nextToken: $nextToken) {
    items {
      propertyId
      title
      propertyType
      bedrooms
      pricing { monthlyRent currency }
      address { region district }
      media { thumbnail }
    }
    nextToken
  }
}"#,
);

pub const LIST_REGIONS: Operation = Operation::new(
    "listRegions",
    r#"query listRegions {
  listRegions { id: regionId name }
}"#,
);

pub const LIST_DISTRICTS: Operation = Operation::new(
    "listDistricts",
    r#"query listDistricts($regionId: ID!) {
  listDistricts(regionId: $regionId) { id: districtId parentId: regionId name }
}"#,
);

pub const LIST_WARDS: Operation = Operation::new(
    "listWards",
    r#"query listWards($districtId: ID!) {
  listWards(districtId: $districtId) { id: wardId parentId: districtId name }
}"#,
);

pub const LIST_STREETS: Operation = Operation::new(
    "listStreets",
    r#"query listStreets($wardId: ID!) {
  listStreets(wardId: $wardId) { id: streetId parentId: wardId name }
}"#,
);
