//! Location hierarchy commands

use rentkit::client::models::{LocationLevel, LocationNode};
use rentkit::error::Result;

use crate::cli::CommandContext;
use crate::cli::args::GlobalOptions;
use crate::models::LocationDisplay;
use crate::output::print_rows;

pub async fn regions(opts: &GlobalOptions) -> Result<()> {
    list(opts, LocationLevel::Region, None).await
}

pub async fn districts(opts: &GlobalOptions, region_id: &str) -> Result<()> {
    list(opts, LocationLevel::District, Some(region_id)).await
}

pub async fn wards(opts: &GlobalOptions, district_id: &str) -> Result<()> {
    list(opts, LocationLevel::Ward, Some(district_id)).await
}

pub async fn streets(opts: &GlobalOptions, ward_id: &str) -> Result<()> {
    list(opts, LocationLevel::Street, Some(ward_id)).await
}

async fn list(opts: &GlobalOptions, level: LocationLevel, parent: Option<&str>) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let nodes: Vec<LocationNode> = ctx.layer.locations().fetch(level, parent).await?;

    let rows: Vec<LocationDisplay> = nodes.iter().map(LocationDisplay::from).collect();
    print_rows(&rows, &nodes, ctx.format)
}
