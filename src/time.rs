//! Moscow-timezone day boundaries, deadline arithmetic, and marketplace ISO
//! formatting.
//!
//! The marketplace's readiness/deadline semantics are anchored to Moscow
//! calendar days regardless of where a warehouse physically sits, so all
//! "today"/"tomorrow" arithmetic in the engine goes through here rather than
//! through `Utc::now()` directly.

use chrono::{DateTime, Duration, TimeZone, Timelike, Utc};
use chrono_tz::Europe::Moscow;

/// Start (00:00:00) of the Moscow calendar day containing `instant + offset_days`.
#[must_use]
pub fn start_of_moscow_day(instant: DateTime<Utc>, offset_days: i64) -> DateTime<Utc> {
    let shifted = instant + Duration::days(offset_days);
    let moscow_date = shifted.with_timezone(&Moscow).date_naive();
    Moscow
        .from_local_datetime(&moscow_date.and_hms_opt(0, 0, 0).expect("valid midnight"))
        .single()
        .expect("Moscow has no DST transitions since 2014")
        .with_timezone(&Utc)
}

/// End (23:59:59) of the Moscow calendar day containing `instant`.
#[must_use]
pub fn end_of_moscow_day(instant: DateTime<Utc>) -> DateTime<Utc> {
    let moscow_date = instant.with_timezone(&Moscow).date_naive();
    Moscow
        .from_local_datetime(&moscow_date.and_hms_opt(23, 59, 59).expect("valid end of day"))
        .single()
        .expect("Moscow has no DST transitions since 2014")
        .with_timezone(&Utc)
}

/// Local hour-of-day (0-23) of `instant` in the given fixed UTC offset
/// minutes, as supplied by the marketplace for a warehouse's timezone.
#[must_use]
pub fn local_hour(instant: DateTime<Utc>, tz_offset_minutes: i32) -> u32 {
    let shifted = instant + Duration::minutes(i64::from(tz_offset_minutes));
    shifted.time().hour()
}

/// Format an instant as marketplace ISO-8601 with milliseconds stripped and
/// a trailing `Z`, e.g. `2026-07-29T10:00:00Z`.
#[must_use]
pub fn to_marketplace_iso(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse a marketplace ISO-8601 timestamp (with or without milliseconds) into
/// a UTC instant.
pub fn from_marketplace_iso(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn start_of_moscow_day_is_midnight_moscow() {
        // 2026-07-28T21:30:00Z is 2026-07-29T00:30:00 Moscow (UTC+3).
        let instant = Utc.with_ymd_and_hms(2026, 7, 28, 21, 30, 0).unwrap();
        let start = start_of_moscow_day(instant, 0);
        let expected = Utc.with_ymd_and_hms(2026, 7, 28, 21, 0, 0).unwrap();
        assert_eq!(start, expected);
    }

    #[test]
    fn start_of_moscow_day_offset_by_one_day() {
        let instant = Utc.with_ymd_and_hms(2026, 7, 28, 6, 0, 0).unwrap();
        let tomorrow_start = start_of_moscow_day(instant, 1);
        // 2026-07-28T06:00Z = 2026-07-28T09:00 Moscow; +1 day = 2026-07-29T00:00 Moscow
        // = 2026-07-28T21:00Z.
        let expected = Utc.with_ymd_and_hms(2026, 7, 28, 21, 0, 0).unwrap();
        assert_eq!(tomorrow_start, expected);
    }

    #[test]
    fn end_of_day_is_one_second_before_next_midnight() {
        let instant = Utc.with_ymd_and_hms(2026, 7, 28, 21, 0, 0).unwrap();
        let end = end_of_moscow_day(instant);
        let next_start = start_of_moscow_day(instant, 1);
        assert_eq!(end + Duration::seconds(1), next_start);
    }

    #[test]
    fn marketplace_iso_round_trips_without_millis() {
        let instant = Utc.with_ymd_and_hms(2026, 7, 28, 10, 15, 30).unwrap();
        let formatted = to_marketplace_iso(instant);
        assert_eq!(formatted, "2026-07-28T10:15:30Z");
        assert_eq!(from_marketplace_iso(&formatted).unwrap(), instant);
    }

    #[test]
    fn marketplace_iso_parses_millis_input() {
        let parsed = from_marketplace_iso("2026-07-28T10:15:30.123Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 7, 28, 10, 15, 30).unwrap());
    }

    #[test]
    fn local_hour_applies_positive_offset() {
        let instant = Utc.with_ymd_and_hms(2026, 7, 28, 22, 30, 0).unwrap();
        assert_eq!(local_hour(instant, 180), 1); // Moscow UTC+3
    }
}
