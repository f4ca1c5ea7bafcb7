//! Timestamp parsing with `strftime`-style layouts.
//!
//! Layouts follow `chrono::format::strftime`. A layout may describe a full
//! instant with offset (`%Y-%m-%dT%H:%M:%S%z`) or a naive date-time taken as
//! UTC (`%Y-%m-%dT%H:%M:%S%.3fZ`, the `Z` being a literal). Coarser layouts
//! are completed with the start of their period: `%Y-%m-%d-%H` is the top of
//! the hour, `%Y-%m-%d` midnight, `%Y-%m` the first of the month.

use chrono::format::{self, Item, ParseError, Parsed, StrftimeItems};
use chrono::{DateTime, TimeZone, Utc};
use std::fmt::Write as _;

/// Parse `value` according to `layout`, normalising to UTC.
pub fn parse_timestamp(value: &str, layout: &str) -> Result<DateTime<Utc>, ParseError> {
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, value, StrftimeItems::new(layout))?;

    if parsed.timestamp().is_none() {
        let has_day = parsed.day().is_some()
            || parsed.ordinal().is_some()
            || parsed.week_from_sun().is_some()
            || parsed.week_from_mon().is_some()
            || parsed.isoweek().is_some();
        if !has_day {
            parsed.set_day(1)?;
        }
        if parsed.hour_div_12().is_none() && parsed.hour_mod_12().is_none() {
            parsed.set_hour(0)?;
        }
        if parsed.minute().is_none() {
            parsed.set_minute(0)?;
        }
    }

    if parsed.offset().is_some() {
        Ok(parsed.to_datetime()?.with_timezone(&Utc))
    } else {
        Ok(parsed.to_naive_datetime_with_offset(0)?.and_utc())
    }
}

/// Check that a layout can format a timestamp and read it back. Used by
/// config validation so a typo fails at startup rather than per row.
pub fn validate_layout(layout: &str) -> bool {
    if layout.is_empty() || StrftimeItems::new(layout).any(|item| matches!(item, Item::Error)) {
        return false;
    }

    let Some(sample) = Utc.with_ymd_and_hms(2006, 1, 2, 15, 4, 5).single() else {
        return false;
    };
    let mut rendered = String::new();
    if write!(rendered, "{}", sample.format(layout)).is_err() {
        return false;
    }

    parse_timestamp(&rendered, layout).is_ok()
}
