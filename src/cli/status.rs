//! Status command implementation

use colored::Colorize;

use rentkit::cache::CacheStorage;
use rentkit::config::Config;
use rentkit::error::Result;

use crate::cli::args::GlobalOptions;

/// Display configuration, session and cache status
pub fn run(opts: &GlobalOptions) -> Result<()> {
    println!("{}\n", "rentkit Configuration Status".bold());

    let config_path = Config::resolve_path(opts.config_ref())?;
    let exists = config_path.exists();
    let config = Config::load_at(opts.config_ref())?;

    if exists {
        println!("Config file: {}", config_path.display().to_string().cyan());
    } else {
        println!(
            "Config file: {} {}",
            config_path.display().to_string().cyan(),
            "(not found, using defaults)".dimmed()
        );
    }
    println!();

    match &config.graphql_url {
        Some(url) => println!("{} GraphQL endpoint: {}", "✓".green(), url),
        None => {
            println!("{} GraphQL endpoint not configured", "✗".red());
            println!("  → Set `graphql_url` or RENTKIT_GRAPHQL_URL");
        }
    }

    if config.api_key.is_some() {
        println!("{} Public API key configured", "✓".green());
    } else {
        println!("{} Public API key not configured", "✗".red());
        println!("  → Set `api_key` or RENTKIT_API_KEY");
    }

    match &config.cdn_url {
        Some(url) => println!("{} CDN snapshots: {}", "✓".green(), url),
        None => println!("{} CDN snapshots disabled (all reads go to GraphQL)", "○".dimmed()),
    }

    match &config.session {
        Some(session) if !config.is_session_expired() => {
            let remaining = session.expires_at.signed_duration_since(chrono::Utc::now());
            println!(
                "{} Signed in (session expires in {}h {}m)",
                "✓".green(),
                remaining.num_hours(),
                remaining.num_minutes() % 60
            );
        }
        Some(_) => println!("{} Session expired, reads continue anonymously", "⚠".yellow()),
        None => println!("{} Not signed in (public reads only)", "○".dimmed()),
    }

    println!();
    if !config.cache.enabled || opts.no_cache {
        println!("{} Query cache disabled", "○".dimmed());
    } else {
        println!(
            "{} Query cache: {} entries max, {}s default TTL, {}s location TTL",
            "✓".green(),
            config.cache.max_entries,
            config.cache.default_ttl_secs,
            config.cache.location_ttl_secs
        );
        if config.cache.persist {
            let path = CacheStorage::cache_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "unknown".to_string());
            println!("  Persisted at {}", path.dimmed());
        }
    }
    println!();

    Ok(())
}
