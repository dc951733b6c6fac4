//! Shared CLI argument types
//!
//! This module contains reusable argument structs that can be flattened
//! into commands using `#[command(flatten)]`.

mod common;
mod feed;
mod global;

pub use common::OutputFormat;
pub use feed::FeedArgs;
pub use global::GlobalOptions;
