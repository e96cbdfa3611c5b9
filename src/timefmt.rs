//! Human-readable formatting of upstream unix timestamps.
//!
//! Recent timestamps render as relative text ("5 minutes ago"); anything
//! older than three days falls back to an absolute local `MM/DD HH:MM`.

use chrono::{Local, TimeZone, Utc};

const MINUTE: i64 = 60;
const HOUR: i64 = 3600;
const DAY: i64 = 86_400;
const THREE_DAYS: i64 = 259_200;

/// Format a raw unix-seconds string for display.
///
/// Never panics: malformed or out-of-range input yields an empty string.
#[must_use]
pub fn format_time(raw: &str) -> String {
    raw.trim()
        .parse::<i64>()
        .map_or_else(|_| String::new(), format_unix)
}

/// Format a unix timestamp relative to the current time.
#[must_use]
pub fn format_unix(timestamp: i64) -> String {
    format_at(timestamp, Utc::now().timestamp())
}

/// Bucket the elapsed time against an explicit "now", first match wins.
/// All values are floor-divided, not rounded.
fn format_at(timestamp: i64, now: i64) -> String {
    let elapsed = now.saturating_sub(timestamp);

    if elapsed < MINUTE {
        format!("{elapsed} seconds ago")
    } else if elapsed < HOUR {
        format!("{} minutes ago", elapsed / MINUTE)
    } else if elapsed < DAY {
        format!("{} hours ago", elapsed / HOUR)
    } else if elapsed < THREE_DAYS {
        format!("{} days ago", elapsed / DAY)
    } else {
        // chrono rejects timestamps outside its representable range; the
        // never-panic contract turns those into an empty string too.
        Local
            .timestamp_opt(timestamp, 0)
            .single()
            .map_or_else(String::new, |dt| dt.format("%m/%d %H:%M").to_string())
    }
}
