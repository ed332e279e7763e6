pub mod position;
pub mod query;
pub mod trade;

use chrono::{DateTime, TimeZone, Utc};

/// Earliest timestamp of generated trades and default replay start.
pub fn base_date() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_default()
}
