//! Display model implementations for table and JSON output

mod common;
mod location;
mod property;

pub use location::LocationDisplay;
pub use property::{FieldRow, PropertyDisplay, property_detail_rows};
