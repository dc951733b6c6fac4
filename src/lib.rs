//! rentkit - property data access and cache layer for the rental marketplace
//!
//! The library exposes the pieces a front end composes:
//! - [`cache::QueryCache`] - TTL query cache with in-flight deduplication
//! - [`cdn::CdnResolver`] - CDN snapshot lookups with soft-delete handling
//! - [`properties::PropertyService`] - CDN-first property detail and search
//! - [`location::LocationResolver`] / [`location::LocationPicker`] - the
//!   region → district → ward → street hierarchy
//! - [`client::GraphQlApi`] - auth-mode aware GraphQL calls
//!
//! [`DataLayer`] wires one instance of each from a [`config::Config`].

pub mod cache;
pub mod cdn;
pub mod client;
pub mod config;
pub mod error;
pub mod layer;
pub mod location;
pub mod properties;

pub use error::{Error, Result};
pub use layer::DataLayer;
