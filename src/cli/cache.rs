//! Cache management commands

use colored::Colorize;

use rentkit::cache::CacheStorage;
use rentkit::error::{Error, Result};

use crate::cli::OutputFormat;
use crate::output::json::format_json;

fn open() -> Result<CacheStorage> {
    Ok(CacheStorage::open()?)
}

fn cache_dir_display() -> String {
    CacheStorage::cache_dir()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Show cache status/statistics
pub fn status(format: OutputFormat) -> Result<()> {
    let stats = open()?.stats()?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "total_entries": stats.total_entries,
                "valid_entries": stats.valid_entries,
                "expired_entries": stats.expired_entries,
                "total_size_bytes": stats.total_size_bytes,
                "total_size_human": format_size(stats.total_size_bytes),
                "oldest_entry_timestamp": stats.oldest_entry,
                "newest_entry_timestamp": stats.newest_entry,
                "by_operation": stats.by_operation.iter().map(|(op, (count, bytes))| {
                    (op.clone(), serde_json::json!({"count": count, "bytes": bytes}))
                }).collect::<serde_json::Map<_, _>>(),
                "path": cache_dir_display(),
            });
            println!("{}", format_json(&json)?);
        }
        OutputFormat::Table => {
            println!("{}", "Cache Status".bold());
            println!("────────────────────────────────────────");
            println!("Location:       {}", cache_dir_display());
            println!("Valid entries:  {}", stats.valid_entries);
            println!("Expired:        {}", stats.expired_entries);
            println!("Total size:     {}", format_size(stats.total_size_bytes));

            if let Some(oldest) = stats.oldest_entry {
                println!("Oldest entry:   {}", format_millis(oldest));
            }
            if let Some(newest) = stats.newest_entry {
                println!("Newest entry:   {}", format_millis(newest));
            }

            if !stats.by_operation.is_empty() {
                println!();
                for (operation, (count, bytes)) in &stats.by_operation {
                    println!("  {:<28} {:>5}  {}", operation, count, format_size(*bytes).dimmed());
                }
            }
        }
    }

    Ok(())
}

/// Clear all cache entries
pub fn clear(format: OutputFormat) -> Result<()> {
    let stats = open()?.clear_all()?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "entries_removed": stats.entries_removed,
                "success": true,
            });
            println!("{}", format_json(&json)?);
        }
        OutputFormat::Table => {
            if stats.entries_removed > 0 {
                println!("Cleared {} cache entries", stats.entries_removed);
            } else {
                println!("Cache was already empty");
            }
        }
    }

    Ok(())
}

/// Remove expired entries
pub fn cleanup(format: OutputFormat) -> Result<()> {
    let removed = open()?.delete_expired()?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "entries_removed": removed,
                "success": true,
            });
            println!("{}", format_json(&json)?);
        }
        OutputFormat::Table => println!("Removed {} expired cache entries", removed),
    }

    Ok(())
}

/// Show cache path
pub fn path() -> Result<()> {
    let path = CacheStorage::cache_dir().map_err(Error::from)?;
    println!("{}", path.display());
    Ok(())
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|d| {
            d.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "unknown".to_string())
}

/// Format bytes as human-readable size
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = KB * 1024;
    const GB: usize = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
