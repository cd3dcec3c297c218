//! Date/time utilities.

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::{HookError, Result};

/// Date format used by the calendar API and ISO date rendering.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse an IANA timezone name (e.g., "Europe/Paris").
pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| HookError::Timezone(name.to_string()))
}

/// Parse a stored datetime string to `DateTime<Utc>`.
///
/// Accepts RFC3339 and the SQLite `YYYY-MM-DD HH:MM:SS` format (assumed UTC).
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

/// Whether a tick falls on the first minute of an hour.
pub fn is_new_hour(tick: DateTime<Utc>) -> bool {
    tick.minute() == 0
}

/// Last calendar day of the month containing `date`.
pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

/// Whether `date` is the last day of its month.
pub fn is_last_day_of_month(date: NaiveDate) -> bool {
    last_day_of_month(date) == date
}

/// Add `days` calendar days to `date`, saturating at the maximum date.
pub fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

/// English name of a weekday, e.g. "Monday".
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Local calendar date of `tick` in `tz`.
pub fn local_date(tick: DateTime<Utc>, tz: Tz) -> NaiveDate {
    tick.with_timezone(&tz).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_timezone() {
        assert_eq!(parse_timezone("Europe/Paris").unwrap(), chrono_tz::Europe::Paris);
        assert!(matches!(
            parse_timezone("Invalid/Zone"),
            Err(HookError::Timezone(_))
        ));
    }

    #[test]
    fn test_parse_datetime_rfc3339() {
        let dt = parse_datetime("2024-01-15T10:30:00+09:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 1, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_datetime_sqlite() {
        let dt = parse_datetime("2024-01-15 10:30:00").unwrap();
        assert_eq!(dt, Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_datetime_invalid() {
        assert!(parse_datetime("not a date").is_none());
    }

    #[test]
    fn test_is_new_hour() {
        assert!(is_new_hour(Utc.with_ymd_and_hms(2022, 10, 31, 1, 0, 0).unwrap()));
        assert!(is_new_hour(Utc.with_ymd_and_hms(2022, 10, 31, 1, 0, 59).unwrap()));
        assert!(!is_new_hour(Utc.with_ymd_and_hms(2022, 10, 31, 1, 1, 0).unwrap()));
        assert!(!is_new_hour(Utc.with_ymd_and_hms(2022, 10, 31, 1, 59, 0).unwrap()));
    }

    #[test]
    fn test_last_day_of_month() {
        assert_eq!(last_day_of_month(date(2022, 10, 5)), date(2022, 10, 31));
        assert_eq!(last_day_of_month(date(2022, 12, 1)), date(2022, 12, 31));
        assert_eq!(last_day_of_month(date(2024, 2, 10)), date(2024, 2, 29));
        assert_eq!(last_day_of_month(date(2023, 2, 28)), date(2023, 2, 28));
    }

    #[test]
    fn test_is_last_day_of_month() {
        assert!(is_last_day_of_month(date(2022, 10, 31)));
        assert!(!is_last_day_of_month(date(2022, 10, 30)));
    }

    #[test]
    fn test_add_days_crosses_month() {
        assert_eq!(add_days(date(2022, 10, 31), 1), date(2022, 11, 1));
        assert_eq!(add_days(date(2022, 12, 30), 7), date(2023, 1, 6));
    }

    #[test]
    fn test_weekday_name() {
        assert_eq!(weekday_name(date(2022, 10, 31).weekday()), "Monday");
        assert_eq!(weekday_name(Weekday::Sun), "Sunday");
    }

    #[test]
    fn test_local_date() {
        let tick = Utc.with_ymd_and_hms(2021, 1, 1, 23, 0, 0).unwrap();
        assert_eq!(local_date(tick, chrono_tz::Europe::Paris), date(2021, 1, 2));
        assert_eq!(local_date(tick, chrono_tz::UTC), date(2021, 1, 1));
    }
}
