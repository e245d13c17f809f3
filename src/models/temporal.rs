//! Store-local time handling.
//!
//! Every ledger row carries a `Timestamp` and a `Date` computed on the server
//! in the configured timezone. "Today" boundaries for listing and clearing are
//! derived from the same clock, so the two always agree.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Text format of the `Timestamp` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Text format of the `Date` column.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Timezones the store can partition days in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StoreTimezone {
    /// UK civil time, including daylight saving.
    #[default]
    #[serde(rename = "Europe/London")]
    EuropeLondon,
    /// Coordinated Universal Time.
    #[serde(rename = "UTC")]
    Utc,
}

impl StoreTimezone {
    /// Returns the IANA name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EuropeLondon => "Europe/London",
            Self::Utc => "UTC",
        }
    }

    /// Parses an IANA name (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "europe/london" | "london" => Some(Self::EuropeLondon),
            "utc" | "etc/utc" | "z" => Some(Self::Utc),
            _ => None,
        }
    }

    /// Converts an instant to wall-clock time in this zone.
    #[must_use]
    pub fn local(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        match self {
            Self::EuropeLondon => instant
                .with_timezone(&chrono_tz::Europe::London)
                .naive_local(),
            Self::Utc => instant.naive_utc(),
        }
    }

    /// Returns the calendar day of an instant in this zone.
    #[must_use]
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        self.local(instant).date()
    }
}

impl fmt::Display for StoreTimezone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Source of the current instant.
///
/// Timestamps are always assigned by the service, never by the submitter.
pub trait Clock: Send + Sync {
    /// Returns the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to one instant, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Formats a store-local timestamp for the `Timestamp` column.
#[must_use]
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Formats a calendar day for the `Date` column.
#[must_use]
pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a `Timestamp` cell.
///
/// Accepts the canonical format plus the ISO `T` separator and fractional
/// seconds that spreadsheet tooling tends to introduce. Unparseable cells
/// yield `None` rather than an error.
#[must_use]
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
}

/// Parses a `Date` cell.
#[must_use]
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_london_summer_time_shifts_date() {
        // 23:30 UTC on 1 July is 00:30 BST on 2 July.
        let instant = Utc.with_ymd_and_hms(2024, 7, 1, 23, 30, 0).unwrap();
        assert_eq!(
            StoreTimezone::EuropeLondon.date_of(instant),
            NaiveDate::from_ymd_opt(2024, 7, 2).unwrap()
        );
        assert_eq!(
            StoreTimezone::Utc.date_of(instant),
            NaiveDate::from_ymd_opt(2024, 7, 1).unwrap()
        );
    }

    #[test]
    fn test_london_winter_matches_utc() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 15, 23, 30, 0).unwrap();
        assert_eq!(
            StoreTimezone::EuropeLondon.local(instant),
            StoreTimezone::Utc.local(instant)
        );
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(
            StoreTimezone::parse("Europe/London"),
            Some(StoreTimezone::EuropeLondon)
        );
        assert_eq!(StoreTimezone::parse("utc"), Some(StoreTimezone::Utc));
        assert_eq!(StoreTimezone::parse("America/New_York"), None);
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        let text = format_timestamp(&ts);
        assert_eq!(text, "2024-01-01 09:15:00");
        assert_eq!(parse_timestamp(&text), Some(ts));
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2024-01-01T09:15:00").is_some());
        assert!(parse_timestamp("2024-01-01 09:15:00.250").is_some());
        assert!(parse_timestamp("yesterday-ish").is_none());
        assert!(parse_timestamp("   ").is_none());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date(" 2024-01-01 "),
            NaiveDate::from_ymd_opt(2024, 1, 1)
        );
        assert_eq!(parse_date("01/01/2024"), None);
    }
}
