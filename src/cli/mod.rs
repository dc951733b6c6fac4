//! CLI command definitions and handlers

use clap::{Parser, Subcommand};

pub mod args;
pub mod cache;
pub mod context;
pub mod location;
pub mod property;
pub mod search;
pub mod status;

pub use args::{FeedArgs, OutputFormat};
pub use context::CommandContext;

/// rentkit - browse rental listings through the CDN-first data layer
#[derive(Parser, Debug)]
#[command(name = "rentkit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (table, json)
    #[arg(
        long,
        global = true,
        env = "RENTKIT_FORMAT",
        default_value = "table",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: OutputFormat,

    /// Override config file location
    #[arg(long, global = true, env = "RENTKIT_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "RENTKIT_DEBUG", hide_env = true)]
    pub debug: bool,

    /// Bypass the query cache, fetch fresh data
    #[arg(long, global = true, env = "RENTKIT_NO_CACHE", hide_env = true)]
    pub no_cache: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show configuration and cache status
    Status,

    /// Display version information
    Version,

    /// Look up individual properties
    #[command(subcommand)]
    Property(PropertyCommands),

    /// Page through district or region listings
    #[command(subcommand)]
    Search(SearchCommands),

    /// Browse the region → district → ward → street hierarchy
    #[command(subcommand)]
    Location(LocationCommands),

    /// Manage the local query cache
    #[command(subcommand)]
    Cache(CacheCommands),
}

/// Property subcommands
#[derive(Subcommand, Debug)]
pub enum PropertyCommands {
    /// Show one property, from its CDN snapshot when available
    Get {
        /// Property ID
        id: String,

        /// Skip the CDN snapshot and query the backend directly
        #[arg(long)]
        live: bool,
    },
}

/// Search feed subcommands
#[derive(Subcommand, Debug)]
pub enum SearchCommands {
    /// Listings in a district
    District {
        /// District ID
        id: String,

        #[command(flatten)]
        feed: FeedArgs,
    },

    /// Listings in a region
    Region {
        /// Region ID
        id: String,

        #[command(flatten)]
        feed: FeedArgs,
    },
}

/// Location hierarchy subcommands
#[derive(Subcommand, Debug)]
pub enum LocationCommands {
    /// List all regions
    Regions,

    /// List districts of a region
    Districts {
        /// Region ID
        region_id: String,
    },

    /// List wards of a district
    Wards {
        /// District ID
        district_id: String,
    },

    /// List streets of a ward
    Streets {
        /// Ward ID
        ward_id: String,
    },
}

/// Cache management subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show persisted cache statistics
    Status,

    /// Remove every cached entry
    Clear,

    /// Remove expired entries only
    Cleanup,

    /// Print the cache directory
    Path,
}
