//! Data types returned by the GraphQL backend and the CDN snapshots

mod location;
mod property;

pub use location::{LocationLevel, LocationNode};
pub use property::{Address, Media, Pricing, Property, PropertyCard};
