use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};

/// Anything a date-range control can hand us. Finer-grained values are truncated to their
/// calendar date; time zones are not converted, the date is taken as written.
pub trait IntoCalendarDate {
    fn into_calendar_date(self) -> NaiveDate;
}

impl IntoCalendarDate for NaiveDate {
    fn into_calendar_date(self) -> NaiveDate {
        self
    }
}

impl IntoCalendarDate for NaiveDateTime {
    fn into_calendar_date(self) -> NaiveDate {
        self.date()
    }
}

impl<Tz: TimeZone> IntoCalendarDate for DateTime<Tz> {
    fn into_calendar_date(self) -> NaiveDate {
        self.date_naive()
    }
}

/// Parses a date control value: `YYYY-MM-DD`, RFC 3339, or a naive `YYYY-MM-DD[T ]HH:MM:SS`
/// timestamp (fractional seconds allowed). Timestamps are truncated to their date.
pub fn parse_calendar_date(s: &str) -> anyhow::Result<NaiveDate> {
    let t = s.trim();
    anyhow::ensure!(!t.is_empty(), "date must be non-empty");

    if let Ok(d) = NaiveDate::parse_from_str(t, "%Y-%m-%d") {
        return Ok(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return Ok(dt.into_calendar_date());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return Ok(dt.into_calendar_date());
        }
    }

    NaiveDate::parse_from_str(t, "%Y-%m-%d").with_context(|| format!("invalid date: {t}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn truncates_timestamps_to_date() {
        let late = Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap();
        assert_eq!(late.into_calendar_date(), ymd(2025, 1, 31));
        assert_eq!(late.naive_utc().into_calendar_date(), ymd(2025, 1, 31));
    }

    #[test]
    fn keeps_the_written_date_for_offset_timestamps() {
        // 2025-02-01 01:00 at +09:00 is still Jan 31 in UTC; the control value wins.
        let kst = FixedOffset::east_opt(9 * 3600).unwrap();
        let dt = kst.with_ymd_and_hms(2025, 2, 1, 1, 0, 0).unwrap();
        assert_eq!(dt.into_calendar_date(), ymd(2025, 2, 1));
    }

    #[test]
    fn parses_plain_dates_and_timestamps() {
        assert_eq!(parse_calendar_date("2025-01-01").unwrap(), ymd(2025, 1, 1));
        assert_eq!(
            parse_calendar_date("2025-01-01T18:30:00Z").unwrap(),
            ymd(2025, 1, 1)
        );
        assert_eq!(
            parse_calendar_date("2025-01-01 18:30:00").unwrap(),
            ymd(2025, 1, 1)
        );
        assert_eq!(
            parse_calendar_date(" 2025-01-01T18:30:00.250 ").unwrap(),
            ymd(2025, 1, 1)
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_calendar_date("").is_err());
        assert!(parse_calendar_date("01/02/2025").is_err());
        assert!(parse_calendar_date("2025-02-30").is_err());
    }
}
