//! Parsing of the date format used by `Expires` cookie attributes and date headers.

use chrono::{DateTime, NaiveDateTime};

/// Layouts of the dashed cookie form, after the weekday and zone are removed.
///
/// The two-digit year comes first because `%Y` would also accept `15` as the year 15.
const DASHED_FORMATS: [&str; 2] = ["%d-%b-%y %H:%M:%S", "%d-%b-%Y %H:%M:%S"];

/// Parses an RFC 1123 date such as `Wed, 21 Oct 2015 07:28:00 GMT` into Unix seconds.
///
/// The dashed cookie form `Wed, 21-Oct-2015 07:28:00 GMT` is accepted too. The weekday is
/// ignored and a dashed date is always taken to be UTC. Returns `None` if the text is not a
/// valid calendar date in either form.
#[must_use]
pub fn parse_http_date(text: &str) -> Option<i64> {
    let text = text.trim();

    // The weekday, if any, ends at the comma.
    let text = text.split_once(',').map_or(text, |(_, rest)| rest).trim();

    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date.timestamp());
    }

    let text = text.strip_suffix("GMT").unwrap_or(text).trim_end();

    DASHED_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|date| date.and_utc().timestamp())
}
