//! HTTP date handling for the cache validators.
//!
//! Servers send `Last-Modified` in the IMF-fixdate form, but some omit the
//! zero padding on the day of month, so both variants are accepted. The
//! weekday is not checked against the date.

use chrono::{DateTime, NaiveDateTime, Utc};

/// `Mon, 02 Jan 2006 15:04:05 GMT`
const PADDED_DAY: &str = "%a, %d %b %Y %H:%M:%S GMT";
/// Date part of either variant, after the weekday prefix
const DATE_PART: &str = "%d %b %Y %H:%M:%S GMT";

/// Parse a `Last-Modified` header value.
///
/// Returns `None` for values in neither accepted format.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    let (_weekday, date) = value.split_once(", ")?;

    NaiveDateTime::parse_from_str(date, DATE_PART)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Format a timestamp for an `If-Modified-Since` header.
pub fn format_http_date(time: &DateTime<Utc>) -> String {
    time.format(PADDED_DAY).to_string()
}
