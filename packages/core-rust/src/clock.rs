//! Wall-clock access and HTML date-input formatting.
//!
//! Date and date-time fields default to "now", so the clock is injected
//! through [`ClockSource`] to keep model builds deterministic under test.
//!
//! # Formats
//!
//! Values are rendered the way HTML inputs expect them:
//! `Date` as `YYYY-MM-DD`, `DateTimeLocal` as `YYYY-MM-DDTHH:MM`.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

use crate::types::Value;

/// Format of an `<input type="date">` value.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Format of an `<input type="datetime-local">` value.
pub const DATE_TIME_LOCAL_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Abstraction over the system clock for dependency injection.
pub trait ClockSource: Send + Sync {
    /// Returns the current local date and time.
    fn now(&self) -> NaiveDateTime;
}

/// Default clock source that reads the local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl ClockSource for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Which date input a value is formatted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateKind {
    Date,
    DateTimeLocal,
}

impl DateKind {
    #[must_use]
    pub fn format(self, at: NaiveDateTime) -> String {
        match self {
            DateKind::Date => format_date(at),
            DateKind::DateTimeLocal => format_date_time_local(at),
        }
    }
}

#[must_use]
pub fn format_date(at: NaiveDateTime) -> String {
    at.format(DATE_FORMAT).to_string()
}

#[must_use]
pub fn format_date_time_local(at: NaiveDateTime) -> String {
    at.format(DATE_TIME_LOCAL_FORMAT).to_string()
}

/// Parses the date representations a backend or input may hand back.
///
/// Accepts RFC 3339 (converted to local time), `YYYY-MM-DDTHH:MM[:SS]`,
/// `YYYY-MM-DD HH:MM[:SS]` and `YYYY-MM-DD` (midnight).
#[must_use]
pub fn parse_date(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Some(at.with_timezone(&Local).naive_local());
    }
    for format in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(at) = NaiveDateTime::parse_from_str(text, format) {
            return Some(at);
        }
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Re-formats a stored date value for the given input kind.
///
/// Strings are parsed with [`parse_date`]; integers are epoch
/// milliseconds. Unparseable strings pass through unchanged and anything
/// else becomes `Null`.
#[must_use]
pub fn coerce_date(value: &Value, kind: DateKind) -> Value {
    match value {
        Value::String(text) => match parse_date(text) {
            Some(at) => Value::String(kind.format(at)),
            None => value.clone(),
        },
        Value::Int(millis) => DateTime::from_timestamp_millis(*millis).map_or(Value::Null, |at| {
            Value::String(kind.format(at.with_timezone(&Local).naive_local()))
        }),
        _ => Value::Null,
    }
}
