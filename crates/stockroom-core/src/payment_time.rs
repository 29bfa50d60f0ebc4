//! # Payment Dates
//!
//! Payment dates arrive in whatever format the operator typed. Accepted:
//!
//! | Layout                | Example               |
//! |-----------------------|-----------------------|
//! | `YYYY-MM-DD HH:MM:SS` | `2024-03-01 14:30:00` |
//! | `YYYY-MM-DDTHH:MM:SS` | `2024-03-01T14:30:00` |
//! | `YYYY-MM-DDTHH:MM`    | `2024-03-01T14:30`    |
//! | `YYYY-MM-DD`          | `2024-03-01`          |
//! | `DD-MM-YYYY HH:MM:SS` | `01-03-2024 14:30:00` |
//! | `DD-MM-YYYY`          | `01-03-2024`          |
//!
//! Times are UTC. Blank input means "now", which the caller supplies so
//! this module stays free of clock reads.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::ValidationError;
use crate::validation::ValidationResult;

const DATE_TIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%d-%m-%Y %H:%M:%S",
];

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y"];

/// A parsed date, remembering whether a time of day was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parsed {
    DateTime(NaiveDateTime),
    Date(NaiveDate),
}

fn parse(raw: &str) -> Option<Parsed> {
    let value = raw.trim();

    DATE_TIME_LAYOUTS
        .iter()
        .find_map(|layout| NaiveDateTime::parse_from_str(value, layout).ok())
        .map(Parsed::DateTime)
        .or_else(|| {
            DATE_LAYOUTS
                .iter()
                .find_map(|layout| NaiveDate::parse_from_str(value, layout).ok())
                .map(Parsed::Date)
        })
}

fn invalid(field: &str, raw: &str) -> ValidationError {
    ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: format!("unsupported date format: {:?}", raw),
    }
}

/// Parses a payment date; blank input yields `now`. Date-only input is
/// midnight.
///
/// ## Example
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use stockroom_core::payment_time::parse_payment_date;
///
/// let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let parsed = parse_payment_date("01-03-2024 14:30:00", now).unwrap();
/// assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap());
/// assert_eq!(parse_payment_date("  ", now).unwrap(), now);
/// ```
pub fn parse_payment_date(raw: &str, now: DateTime<Utc>) -> ValidationResult<DateTime<Utc>> {
    if raw.trim().is_empty() {
        return Ok(now);
    }

    match parse(raw) {
        Some(Parsed::DateTime(dt)) => Ok(dt.and_utc()),
        Some(Parsed::Date(d)) => Ok(d.and_time(NaiveTime::MIN).and_utc()),
        None => Err(invalid("date", raw)),
    }
}

/// Inclusive bounds for a payment listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

/// Builds filter bounds. A date-only `from` starts at 00:00:00, a date-only
/// `to` ends at 23:59:59. Blank bounds are open.
pub fn date_range(from: Option<&str>, to: Option<&str>) -> ValidationResult<DateRange> {
    let bound = |raw: Option<&str>, field: &str, end_of_day: bool| -> ValidationResult<_> {
        let Some(raw) = raw.filter(|r| !r.trim().is_empty()) else {
            return Ok(None);
        };
        let time = if end_of_day {
            NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
        } else {
            NaiveTime::MIN
        };
        match parse(raw) {
            Some(Parsed::DateTime(dt)) => Ok(Some(dt.and_utc())),
            Some(Parsed::Date(d)) => Ok(Some(d.and_time(time).and_utc())),
            None => Err(invalid(field, raw)),
        }
    };

    Ok(DateRange {
        from: bound(from, "dateFrom", false)?,
        to: bound(to, "dateTo", true)?,
    })
}
