//! Common display utilities and helpers

use chrono::{DateTime, Utc};

/// Truncate string to max characters with ellipsis
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Rent with thousands separators, e.g. `TZS 850,000`
pub fn format_rent(amount: f64, currency: &str) -> String {
    let whole = amount.round() as i64;
    let digits = whole.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if whole < 0 {
        grouped.insert(0, '-');
    }

    format!("{} {}", currency, grouped)
}

/// Format timestamp string to ISO datetime (YYYY-MM-DDTHH:MM:SSZ)
pub fn format_as_iso_datetime(timestamp: &str) -> String {
    if let Ok(dt) = timestamp.parse::<DateTime<Utc>>() {
        return dt.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    }

    // Unix milliseconds
    if let Ok(ts_ms) = timestamp.parse::<i64>()
        && let Some(dt) = DateTime::from_timestamp_millis(ts_ms)
    {
        return dt.format("%Y-%m-%dT%H:%M:%SZ").to_string();
    }

    timestamp.to_string()
}
