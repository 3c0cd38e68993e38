//! Date-time parsing for the date-time value kind.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::Error;

/// Recognized combined date-time formats, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Recognized date-only formats; midnight is assumed.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

/// Parse a textual date-time in one of the recognized formats.
///
/// RFC 3339 is tried first (offsets are folded to UTC), then the fixed
/// format list. Unrecognized or ambiguous input is an explicit conversion
/// failure, never a silent default.
pub fn parse_datetime(input: &str) -> Result<NaiveDateTime, Error> {
    let trimmed = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_utc());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(dt);
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date.and_time(NaiveTime::MIN));
        }
    }

    Err(Error::conversion(
        "DateTime",
        format!("unrecognized date-time '{}'", input),
    ))
}
