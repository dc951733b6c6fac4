//! rentkit CLI - browse rental listings and manage the local query cache

use clap::Parser;

mod cli;
mod models;
mod output;

use cli::args::GlobalOptions;
use cli::{CacheCommands, Cli, Commands, LocationCommands, PropertyCommands, SearchCommands};
use rentkit::Result;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    if let Err(err) = run(cli).await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level));
    if debug {
        builder.filter_module("rentkit", log::LevelFilter::Debug);
    }
    let _ = builder.format_timestamp_millis().try_init();
}

async fn run(cli: Cli) -> Result<()> {
    let opts = GlobalOptions::from_cli(&cli);

    match cli.command {
        Commands::Status => cli::status::run(&opts),
        Commands::Version => {
            println!("rentkit version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Property(cmd) => match cmd {
            PropertyCommands::Get { id, live } => cli::property::get(&opts, &id, live).await,
        },
        Commands::Search(cmd) => match cmd {
            SearchCommands::District { id, feed } => {
                cli::search::run(&opts, rentkit::properties::FeedScope::District(id), &feed).await
            }
            SearchCommands::Region { id, feed } => {
                cli::search::run(&opts, rentkit::properties::FeedScope::Region(id), &feed).await
            }
        },
        Commands::Location(cmd) => match cmd {
            LocationCommands::Regions => cli::location::regions(&opts).await,
            LocationCommands::Districts { region_id } => {
                cli::location::districts(&opts, &region_id).await
            }
            LocationCommands::Wards { district_id } => {
                cli::location::wards(&opts, &district_id).await
            }
            LocationCommands::Streets { ward_id } => cli::location::streets(&opts, &ward_id).await,
        },
        Commands::Cache(cmd) => match cmd {
            CacheCommands::Status => cli::cache::status(opts.format),
            CacheCommands::Clear => cli::cache::clear(opts.format),
            CacheCommands::Cleanup => cli::cache::cleanup(opts.format),
            CacheCommands::Path => cli::cache::path(),
        },
    }
}
