//! Temporal decoding helpers.
//!
//! Epoch values arrive as microseconds since the Unix epoch and are split
//! with flooring division so that negative epochs keep a non-negative
//! sub-second remainder. Vector zones arrive either as an IANA name, as a
//! fixed offset like `+05:30`, or as `Z`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tracing::warn;

/// Microseconds per second.
pub const MICROS_PER_SECOND: i64 = 1_000_000;

/// Julian day number of the Unix epoch (1970-01-01).
pub const UNIX_EPOCH_JULIAN_DAY: i32 = 2_440_588;

/// Flooring division. `floor_div(-1, 10) == -1`.
pub fn floor_div(x: i64, y: i64) -> i64 {
    let q = x / y;
    if (x ^ y) < 0 && q * y != x {
        q - 1
    } else {
        q
    }
}

/// Flooring remainder, always in `0..y` for positive `y`.
pub fn floor_mod(x: i64, y: i64) -> i64 {
    let r = x % y;
    if (x ^ y) < 0 && r != 0 {
        r + y
    } else {
        r
    }
}

/// Representative IANA zone for fixed offsets that are not a whole number
/// of hours. Whole-hour offsets resolve through the `Etc/GMT` zones.
fn fractional_offset_zone(offset: &str) -> Option<Tz> {
    let name = match offset {
        "+03:30" => "Asia/Tehran",
        "+04:30" => "Asia/Kabul",
        "+05:30" => "Asia/Kolkata",
        "+05:45" => "Asia/Kathmandu",
        "+06:30" => "Asia/Yangon",
        "+08:45" => "Australia/Eucla",
        "+09:30" => "Australia/Darwin",
        "+10:30" => "Australia/Adelaide",
        "+13:45" => "Pacific/Chatham",
        "-03:30" => "America/St_Johns",
        "-09:30" => "Pacific/Marquesas",
        _ => return None,
    };
    Tz::from_str(name).ok()
}

fn whole_hour_offset_zone(offset: &str) -> Option<Tz> {
    let (sign, rest) = if let Some(rest) = offset.strip_prefix('+') {
        ('-', rest)
    } else if let Some(rest) = offset.strip_prefix('-') {
        ('+', rest)
    } else {
        return None;
    };
    let (hours, minutes) = rest.split_once(':')?;
    if minutes != "00" {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    if hours == 0 {
        return Some(Tz::UTC);
    }
    // The Etc/GMT zone names carry the opposite sign of the offset.
    Tz::from_str(&format!("Etc/GMT{sign}{hours}")).ok()
}

/// Resolve a vector zone string to a concrete time zone.
///
/// Unknown input falls back to UTC so a malformed zone never fails a fetch.
pub fn resolve_zone(zone: &str) -> Tz {
    let zone = zone.trim();
    if zone.is_empty() || zone == "Z" || zone.eq_ignore_ascii_case("utc") {
        return Tz::UTC;
    }
    if let Ok(tz) = Tz::from_str(zone) {
        return tz;
    }
    if let Some(tz) = whole_hour_offset_zone(zone).or_else(|| fractional_offset_zone(zone)) {
        return tz;
    }
    warn!(zone, "unrecognized time zone, falling back to UTC");
    Tz::UTC
}

fn zoned_from_micros(epoch_micros: i64, tz: Tz) -> Option<DateTime<Tz>> {
    let seconds = floor_div(epoch_micros, MICROS_PER_SECOND);
    let micros = floor_mod(epoch_micros, MICROS_PER_SECOND);
    let utc = DateTime::<Utc>::from_timestamp(seconds, (micros as u32) * 1_000)?;
    Some(utc.with_timezone(&tz))
}

/// Render epoch microseconds as a calendar date in the given zone.
pub fn format_date(epoch_micros: i64, zone: &str) -> Option<String> {
    let dt = zoned_from_micros(epoch_micros, resolve_zone(zone))?;
    Some(dt.format("%Y-%m-%d").to_string())
}

/// Render epoch microseconds as an ISO-8601 timestamp with millisecond
/// precision in the given zone.
pub fn format_datetime(epoch_micros: i64, zone: &str) -> Option<String> {
    let dt = zoned_from_micros(epoch_micros, resolve_zone(zone))?;
    Some(dt.format("%Y-%m-%dT%H:%M:%S%.3f%:z").to_string())
}

/// Render an INT96 timestamp: a Julian day plus nanoseconds within the day.
///
/// Nanoseconds are truncated to microsecond precision before rendering.
pub fn format_int96(julian_day: i32, nanos_of_day: i64) -> Option<String> {
    let day_seconds = i64::from(julian_day - UNIX_EPOCH_JULIAN_DAY) * 86_400;
    let micros_of_day = nanos_of_day / 1_000;
    let epoch_micros = day_seconds
        .checked_mul(MICROS_PER_SECOND)?
        .checked_add(micros_of_day)?;
    format_datetime(epoch_micros, "UTC")
}
