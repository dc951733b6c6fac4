//! Command execution context
//!
//! Loads the configuration and builds the data layer for commands that
//! talk to the backend.

use rentkit::DataLayer;
use rentkit::config::Config;
use rentkit::error::Result;

use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;

/// Context for command execution: the data layer and runtime options.
pub struct CommandContext {
    /// Shared cache, CDN resolver, property service and location resolver
    pub layer: DataLayer,
    /// Output format preference
    pub format: OutputFormat,
}

impl CommandContext {
    /// Create a new command context.
    ///
    /// `--no-cache` turns the query cache off for this run, including the
    /// persisted tier.
    ///
    /// # Errors
    /// Returns error if the config can't be loaded or the backend endpoint or
    /// API key is missing.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let mut config = Config::load_at(opts.config_ref())?;
        if opts.no_cache {
            config.cache.enabled = false;
        }

        let layer = DataLayer::from_config(&config)?;

        Ok(Self {
            layer,
            format: opts.format,
        })
    }
}
