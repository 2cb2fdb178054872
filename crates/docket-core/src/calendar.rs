//! Calendar-day arithmetic and Indonesian date rendering for reminders.
//!
//! Day boundaries are server-local midnight.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};

const MONTHS_ID: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// The calendar day after `now`, truncated to midnight.
pub fn tomorrow(now: NaiveDateTime) -> NaiveDate {
    now.date()
        .checked_add_days(Days::new(1))
        .unwrap_or(NaiveDate::MAX)
}

/// Same instant one calendar day earlier.
pub fn day_before(at: NaiveDateTime) -> NaiveDateTime {
    at.checked_sub_days(Days::new(1)).unwrap_or(NaiveDateTime::MIN)
}

/// Long Indonesian date, e.g. `17 Oktober 2026`.
pub fn format_long_id(date: NaiveDate) -> String {
    let month = MONTHS_ID[date.month0() as usize];
    format!("{} {} {}", date.day(), month, date.year())
}

/// Message body of a next-day hearing reminder.
pub fn reminder_message(title: &str, date: NaiveDateTime) -> String {
    format!(
        "Reminder: Kasus \"{}\" dijadwalkan untuk besok ({})",
        title,
        format_long_id(date.date())
    )
}

/// ISO `YYYY-MM-DD` rendering used by the case detail view.
pub fn format_iso_day(date: NaiveDateTime) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_tomorrow_truncates_time() {
        assert_eq!(
            tomorrow(at(2026, 10, 16, 23)),
            NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
        );
    }

    #[test]
    fn test_tomorrow_crosses_month_and_year() {
        assert_eq!(
            tomorrow(at(2026, 12, 31, 8)),
            NaiveDate::from_ymd_opt(2027, 1, 1).unwrap()
        );
        assert_eq!(
            tomorrow(at(2028, 2, 28, 0)),
            NaiveDate::from_ymd_opt(2028, 2, 29).unwrap()
        );
    }

    #[test]
    fn test_day_before_keeps_time_of_day() {
        assert_eq!(day_before(at(2026, 10, 17, 9)), at(2026, 10, 16, 9));
        assert_eq!(day_before(at(2026, 3, 1, 10)), at(2026, 2, 28, 10));
    }

    #[test]
    fn test_format_long_id() {
        assert_eq!(
            format_long_id(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()),
            "17 Oktober 2026"
        );
        assert_eq!(
            format_long_id(NaiveDate::from_ymd_opt(2027, 1, 5).unwrap()),
            "5 Januari 2027"
        );
    }

    #[test]
    fn test_reminder_message() {
        assert_eq!(
            reminder_message("Case A", at(2026, 10, 17, 9)),
            "Reminder: Kasus \"Case A\" dijadwalkan untuk besok (17 Oktober 2026)"
        );
    }

    #[test]
    fn test_format_iso_day() {
        assert_eq!(format_iso_day(at(2026, 5, 3, 14)), "2026-05-03");
    }
}
