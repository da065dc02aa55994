//! Lenient parsing of instants written by other systems.

use jiff::civil::{Date, DateTime, Time};
use jiff::tz::TimeZone;
use jiff::{Timestamp, fmt::rfc2822};

/// Parses an instant that may lack an offset.
///
/// Accepts RFC 3339 with an offset, RFC 2822, and civil date-times or bare
/// dates with no offset (optionally suffixed `UTC` or `GMT`), which are
/// read as UTC. A bare date is midnight UTC.
pub fn parse_instant(raw: &str) -> Option<Timestamp> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = raw.parse::<Timestamp>() {
        return Some(ts);
    }
    if let Ok(zoned) = rfc2822::parse(raw) {
        return Some(zoned.timestamp());
    }

    let civil = strip_utc_suffix(raw);
    let datetime = civil
        .parse::<DateTime>()
        .ok()
        .or_else(|| civil.parse::<Date>().ok().map(|d| d.to_datetime(Time::midnight())))?;
    datetime.to_zoned(TimeZone::UTC).ok().map(|z| z.timestamp())
}

fn strip_utc_suffix(raw: &str) -> &str {
    ["UTC", "utc", "GMT", "gmt", "Z"]
        .iter()
        .find_map(|suffix| raw.strip_suffix(suffix))
        .map_or(raw, str::trim_end)
}
