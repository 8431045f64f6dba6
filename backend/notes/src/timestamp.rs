//! Timestamps as found in stored records.
//!
//! Older files hold naive local ISO strings without an offset; those are
//! read as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};

pub(crate) fn parse(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

pub(crate) fn format(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}
