use chrono::{DateTime, Utc};

/// Whole days elapsed between `since` and `now`, floored at zero.
pub fn days_since(since: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    now.signed_duration_since(since).num_days().max(0)
}

/// Formats a timestamp as `YYYY-MM-DD`.
pub fn format_date(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d").to_string()
}
