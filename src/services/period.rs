// src/services/period.rs

use crate::errors::{AppError, AppResult};
use chrono::{Datelike, Months, NaiveDate};

/// Parses a "YYYY-MM" pay period into the first day of that month.
pub fn parse_month(period: &str) -> AppResult<NaiveDate> {
    let invalid = || AppError::Validation(format!("'{period}' is not a valid month, expected YYYY-MM"));

    let (year, month) = period.split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }
    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)
}

pub fn format_month(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

pub fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    let first = date.with_day(1).unwrap_or(date);
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}

pub fn days_in_month(date: NaiveDate) -> u32 {
    last_day_of_month(date).day()
}

/// Whole months from `from` to `to`, negative when `to` is earlier
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    (to.year() - from.year()) * 12 + to.month() as i32 - from.month() as i32
}

/// Inclusive day iterator, used when planning rosters
pub fn date_range(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    from.iter_days().take_while(move |d| *d <= to)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn parses_valid_months() {
        assert_eq!(parse_month("2024-02").unwrap(), date(2024, 2, 1));
        assert_eq!(format_month(date(2024, 11, 17)), "2024-11");
    }

    #[test]
    fn rejects_malformed_months() {
        for bad in ["2024-13", "2024-2", "24-02", "2024/02", "", "2024-00"] {
            assert!(
                matches!(parse_month(bad), Err(AppError::Validation(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn month_lengths_follow_the_calendar() {
        assert_eq!(days_in_month(date(2024, 2, 10)), 29);
        assert_eq!(days_in_month(date(2023, 2, 1)), 28);
        assert_eq!(days_in_month(date(2024, 12, 31)), 31);
        assert_eq!(last_day_of_month(date(2024, 4, 5)), date(2024, 4, 30));
    }

    #[test]
    fn months_between_spans_years() {
        assert_eq!(months_between(date(2023, 11, 1), date(2024, 2, 1)), 3);
        assert_eq!(months_between(date(2024, 2, 1), date(2024, 1, 1)), -1);
    }

    #[test]
    fn date_range_is_inclusive() {
        let days: Vec<_> = date_range(date(2024, 2, 28), date(2024, 3, 1)).collect();
        assert_eq!(days, vec![date(2024, 2, 28), date(2024, 2, 29), date(2024, 3, 1)]);
        assert_eq!(date_range(date(2024, 3, 2), date(2024, 3, 1)).count(), 0);
    }
}
