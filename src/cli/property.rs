//! Property commands

use colored::Colorize;

use rentkit::error::Result;
use rentkit::properties::{PropertyFetchOptions, PropertyLookup};

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, OutputFormat};
use crate::models::{FieldRow, property_detail_rows};
use crate::output::print_rows;

/// Show one property
pub async fn get(opts: &GlobalOptions, id: &str, live: bool) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let options = PropertyFetchOptions {
        live_only: live,
        force_refresh: opts.no_cache,
    };

    let lookup = ctx.layer.properties().get_property(id, options).await?;

    match &lookup {
        PropertyLookup::Found { property, source } => {
            let rows = property_detail_rows(property, &source.to_string());
            print_rows(&rows, &lookup, ctx.format)
        }
        PropertyLookup::NotFound => match ctx.format {
            OutputFormat::Json => print_rows::<FieldRow, _>(&[], &lookup, ctx.format),
            OutputFormat::Table => {
                println!("{} Property {} not found (removed or never listed)", "✗".red(), id);
                Ok(())
            }
        },
    }
}
