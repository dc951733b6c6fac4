//! Display models for CLI output
//!
//! Converts library types into CLI-friendly rows.

pub mod display;

pub use display::{FieldRow, LocationDisplay, PropertyDisplay, property_detail_rows};
