//! Named date ranges used when listing entries.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Month, Months, NaiveDate, TimeDelta};
use thiserror::Error;

/// Error returned when parsing an unknown [`TargetPeriod`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error(
    "unknown period: {value} (expected today, yesterday, week, month, lastmonth, all or a month name)"
)]
pub struct UnknownPeriod {
    pub value: String,
}

/// A range of days relative to today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetPeriod {
    Today,
    Yesterday,
    /// Monday of the current week through Sunday.
    Week,
    Month,
    LastMonth,
    All,
    /// A month of the current year.
    Named(Month),
}

impl TargetPeriod {
    /// Resolves to a half-open `[from, until)` range.
    pub fn range(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        let tomorrow = today + TimeDelta::days(1);
        match self {
            Self::Today => (today, tomorrow),
            Self::Yesterday => (today - TimeDelta::days(1), today),
            Self::Week => {
                let monday =
                    today - TimeDelta::days(i64::from(today.weekday().num_days_from_monday()));
                (monday, monday + TimeDelta::days(7))
            }
            Self::Month => month_range(first_of_month(today)),
            Self::LastMonth => {
                let this_month = first_of_month(today);
                month_range(this_month - Months::new(1))
            }
            Self::All => (
                NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN),
                NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX),
            ),
            Self::Named(month) => {
                let first = NaiveDate::from_ymd_opt(today.year(), month.number_from_month(), 1)
                    .unwrap_or(today);
                month_range(first)
            }
        }
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn month_range(first: NaiveDate) -> (NaiveDate, NaiveDate) {
    (first, first + Months::new(1))
}

impl fmt::Display for TargetPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Today => write!(f, "today"),
            Self::Yesterday => write!(f, "yesterday"),
            Self::Week => write!(f, "week"),
            Self::Month => write!(f, "month"),
            Self::LastMonth => write!(f, "lastmonth"),
            Self::All => write!(f, "all"),
            Self::Named(month) => write!(f, "{}", month.name().to_ascii_lowercase()),
        }
    }
}

impl FromStr for TargetPeriod {
    type Err = UnknownPeriod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let period = match lower.as_str() {
            "today" => Self::Today,
            "yesterday" => Self::Yesterday,
            "week" => Self::Week,
            "month" => Self::Month,
            "lastmonth" | "last-month" => Self::LastMonth,
            "all" => Self::All,
            // chrono accepts full names and three-letter abbreviations
            other => Self::Named(other.parse::<Month>().map_err(|_| UnknownPeriod {
                value: s.to_string(),
            })?),
        };
        Ok(period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn range(period: &str, today: &str) -> (String, String) {
        let (from, until) = period.parse::<TargetPeriod>().unwrap().range(date(today));
        (from.to_string(), until.to_string())
    }

    #[test]
    fn day_periods() {
        assert_eq!(
            range("today", "2024-03-01"),
            ("2024-03-01".into(), "2024-03-02".into())
        );
        assert_eq!(
            range("yesterday", "2024-03-01"),
            ("2024-02-29".into(), "2024-03-01".into())
        );
    }

    #[test]
    fn week_starts_on_monday() {
        assert_eq!(
            range("week", "2024-01-10"),
            ("2024-01-08".into(), "2024-01-15".into())
        );
    }

    #[test]
    fn month_periods() {
        assert_eq!(
            range("month", "2024-12-15"),
            ("2024-12-01".into(), "2025-01-01".into())
        );
        assert_eq!(
            range("lastmonth", "2024-01-15"),
            ("2023-12-01".into(), "2024-01-01".into())
        );
    }

    #[test]
    fn month_names_and_aliases() {
        assert_eq!(
            range("feb", "2024-06-01"),
            ("2024-02-01".into(), "2024-03-01".into())
        );
        assert_eq!(
            "September".parse::<TargetPeriod>().unwrap(),
            TargetPeriod::Named(Month::September)
        );
        assert_eq!(TargetPeriod::Named(Month::May).to_string(), "may");
    }

    #[test]
    fn unknown_period_is_rejected() {
        assert!("fortnight".parse::<TargetPeriod>().is_err());
    }
}
