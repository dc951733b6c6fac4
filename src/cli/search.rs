//! Search feed command

use colored::Colorize;

use rentkit::error::Result;
use rentkit::properties::{FeedCursor, FeedScope};

use crate::cli::args::GlobalOptions;
use crate::cli::{CommandContext, FeedArgs, OutputFormat};
use crate::models::PropertyDisplay;
use crate::output::print_rows;

/// Show one page of a district or region feed
pub async fn run(opts: &GlobalOptions, scope: FeedScope, feed: &FeedArgs) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let page = ctx
        .layer
        .properties()
        .search(&scope, &feed.cursor(), feed.limit)
        .await?;

    let rows: Vec<PropertyDisplay> = page.items.iter().map(PropertyDisplay::from).collect();
    print_rows(&rows, &page, ctx.format)?;

    if ctx.format == OutputFormat::Table {
        if page.gone {
            println!("{}", "This feed has been removed.".yellow());
        }
        if page.restarted {
            println!(
                "{}",
                "Snapshot feed changed while paging; showing live results from the start.".yellow()
            );
        }
        if let Some(total) = page.total_in_cache {
            println!("{}", format!("{} listings in feed", total).dimmed());
        }
        match &page.next {
            Some(FeedCursor::Snapshot { page }) => {
                println!("{}", format!("More results: --page {}", page).dimmed())
            }
            Some(FeedCursor::Live {
                next_token: Some(token),
            }) => println!("{}", format!("More results: --next-token {}", token).dimmed()),
            _ => {}
        }
    }

    Ok(())
}
