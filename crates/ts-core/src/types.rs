//! Core type definitions.

use std::fmt;

use chrono::{NaiveDate, NaiveTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::TimesheetError;
use crate::rounding::Rounding;

/// Error returned when parsing an unknown [`LogDirection`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown log direction: {value} (expected in or out)")]
pub struct UnknownLogDirection {
    pub value: String,
}

/// Whether an event starts or ends the working day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogDirection {
    /// Clock in: login, unlock, wake up.
    In,
    /// Clock out: lid close, shutdown.
    Out,
}

impl LogDirection {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::In => "in",
            Self::Out => "out",
        }
    }

    /// Name of the entry field this direction writes.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::In => "clock in",
            Self::Out => "clock out",
        }
    }
}

impl fmt::Display for LogDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LogDirection {
    type Err = UnknownLogDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            _ => Err(UnknownLogDirection {
                value: s.to_string(),
            }),
        }
    }
}

/// One timesheet row. There is at most one per calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimesheetEntry {
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_in: Option<NaiveTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clock_out: Option<NaiveTime>,
    #[serde(default)]
    pub is_flex: bool,
    #[serde(default)]
    pub is_pto: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
}

impl TimesheetEntry {
    /// Creates an empty entry for `date`.
    pub const fn new(date: NaiveDate) -> Self {
        Self {
            date,
            clock_in: None,
            clock_out: None,
            is_flex: false,
            is_pto: false,
            project: None,
        }
    }

    /// Creates an entry with the given clock times, stripped to the minute.
    pub fn with_times(
        date: NaiveDate,
        clock_in: Option<NaiveTime>,
        clock_out: Option<NaiveTime>,
    ) -> Self {
        Self {
            clock_in: clock_in.map(truncate_to_minute),
            clock_out: clock_out.map(truncate_to_minute),
            ..Self::new(date)
        }
    }

    pub const fn time(&self, direction: LogDirection) -> Option<NaiveTime> {
        match direction {
            LogDirection::In => self.clock_in,
            LogDirection::Out => self.clock_out,
        }
    }

    pub fn set_time(&mut self, direction: LogDirection, time: NaiveTime) {
        let time = Some(truncate_to_minute(time));
        match direction {
            LogDirection::In => self.clock_in = time,
            LogDirection::Out => self.clock_out = time,
        }
    }

    /// True when the row carries clock times.
    pub const fn has_times(&self) -> bool {
        self.clock_in.is_some() || self.clock_out.is_some()
    }

    /// Checks that the row is worth persisting and that its times are ordered.
    pub fn validate(&self) -> Result<(), TimesheetError> {
        if !self.has_times() && !self.is_flex && !self.is_pto {
            return Err(TimesheetError::InvalidEntry { date: self.date });
        }
        ensure_ordered(self.date, self.clock_in, self.clock_out)
    }
}

impl fmt::Display for TimesheetEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let clock_in = format_clock(self.clock_in);
        let clock_out = if self.is_flex {
            "flex".to_string()
        } else if self.is_pto {
            "pto".to_string()
        } else {
            format_clock(self.clock_out)
        };
        write!(f, "{}\t{clock_in: <8}\t{clock_out: <8}", self.date)
    }
}

/// Header matching the [`TimesheetEntry`] display format.
pub const ROW_HEADER: &str = "Date    \tClock In\tClock Out";

fn format_clock(time: Option<NaiveTime>) -> String {
    time.map_or_else(|| "-".to_string(), |t| t.format("%H:%M").to_string())
}

/// Fails with [`TimesheetError::InvertedTimes`] unless clock in precedes clock out.
pub fn ensure_ordered(
    date: NaiveDate,
    clock_in: Option<NaiveTime>,
    clock_out: Option<NaiveTime>,
) -> Result<(), TimesheetError> {
    match (clock_in, clock_out) {
        (Some(clock_in), Some(clock_out)) if clock_in >= clock_out => {
            Err(TimesheetError::InvertedTimes {
                date,
                clock_in,
                clock_out,
            })
        }
        _ => Ok(()),
    }
}

/// Drops seconds and sub-second precision.
pub fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}

/// A day that does not count as a workday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// A flex balance snapshot. The latest snapshot by date is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlexBalance {
    pub date: NaiveDate,
    /// Signed accrual in seconds.
    pub seconds: i64,
}

impl FlexBalance {
    /// Creates a snapshot from a number of hours, rounded to the second.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "balances are far below i64::MAX seconds"
    )]
    pub fn from_hours(date: NaiveDate, hours: f64) -> Self {
        Self {
            date,
            seconds: (hours * 3600.0).round() as i64,
        }
    }

    #[expect(clippy::cast_precision_loss, reason = "display only")]
    pub fn hours(&self) -> f64 {
        self.seconds as f64 / 3600.0
    }
}

impl fmt::Display for FlexBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_seconds(self.seconds))
    }
}

/// Formats a signed second count as `+Xh Ym`.
pub fn format_seconds(seconds: i64) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let minutes = seconds.unsigned_abs() / 60;
    format!("{sign}{}h {}m", minutes / 60, minutes % 60)
}

/// Work rules used by backfill and the flex balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkSettings {
    /// Clock in used when filling standard hours.
    pub standard_start: NaiveTime,
    /// Clock out used when filling standard hours.
    pub standard_quit: NaiveTime,
    /// Time that must be worked each workday.
    pub required_day: TimeDelta,
    /// Rounding interval in minutes.
    pub round_interval: u32,
    /// Remainders at or below this many minutes round down.
    pub round_threshold: u32,
    /// Whether flexing on weekends and holidays is expected.
    pub work_weekend: bool,
    /// Project label given to new entries.
    pub default_project: Option<String>,
}

impl WorkSettings {
    pub const fn rounding(&self) -> Rounding {
        Rounding {
            interval: self.round_interval,
            threshold: self.round_threshold,
        }
    }
}

impl Default for WorkSettings {
    fn default() -> Self {
        Self {
            standard_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            standard_quit: NaiveTime::from_hms_opt(16, 30, 0).unwrap_or_default(),
            required_day: TimeDelta::minutes(450),
            round_interval: 15,
            round_threshold: 7,
            work_weekend: false,
            default_project: None,
        }
    }
}
