//! # Temporal Types: UTC-Only Timestamps
//!
//! `Timestamp` is UTC with a `Z` suffix, truncated to seconds. Audit digests
//! cover timestamps, so two renderings of the same instant must be
//! byte-identical. Non-UTC inputs are rejected by [`Timestamp::parse`].

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// From a `DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse an RFC 3339 string. Only the `Z` suffix is accepted; even
    /// `+00:00` is rejected.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidTimestamp(s.to_string());
        if !s.ends_with('Z') {
            return Err(invalid());
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|_| invalid())?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Calendar date of this instant (UTC).
    pub fn date(&self) -> NaiveDate {
        self.0.date_naive()
    }

    /// Render as `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn now_has_no_subseconds() {
        assert_eq!(Timestamp::now().as_datetime().nanosecond(), 0);
    }

    #[test]
    fn from_utc_truncates() {
        let dt = Utc
            .with_ymd_and_hms(2026, 3, 2, 9, 15, 30)
            .unwrap()
            .with_nanosecond(987_000_000)
            .unwrap();
        assert_eq!(Timestamp::from_utc(dt).to_iso8601(), "2026-03-02T09:15:30Z");
    }

    #[test]
    fn parse_accepts_z_only() {
        assert!(Timestamp::parse("2026-03-02T09:15:30Z").is_ok());
        assert!(Timestamp::parse("2026-03-02T09:15:30+00:00").is_err());
        assert!(Timestamp::parse("2026-03-02T14:15:30+05:00").is_err());
        assert!(Timestamp::parse("not-a-date").is_err());
        assert!(Timestamp::parse("").is_err());
    }

    #[test]
    fn parse_truncates_fraction() {
        let ts = Timestamp::parse("2026-03-02T09:15:30.250Z").unwrap();
        assert_eq!(ts.to_string(), "2026-03-02T09:15:30Z");
    }

    #[test]
    fn date_is_utc_calendar_day() {
        let ts = Timestamp::parse("2026-03-02T23:59:59Z").unwrap();
        assert_eq!(ts.date(), NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    }

    #[test]
    fn ordering_follows_time() {
        let a = Timestamp::parse("2026-03-02T09:15:30Z").unwrap();
        let b = Timestamp::parse("2026-03-02T09:15:31Z").unwrap();
        assert!(a < b);
    }
}
