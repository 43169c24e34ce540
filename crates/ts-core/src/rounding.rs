//! Rounding of clock times to a fixed interval.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};

use crate::types::truncate_to_minute;

/// Rounds to the nearest `interval` minutes.
///
/// A remainder at or below `threshold` rounds down, anything above rounds up.
/// Adjustments are applied to a full date-time so that rounding up late in
/// the evening carries into the next day instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rounding {
    pub interval: u32,
    pub threshold: u32,
}

impl Rounding {
    pub fn round(&self, at: NaiveDateTime) -> NaiveDateTime {
        let at = at.date().and_time(truncate_to_minute(at.time()));
        if self.interval == 0 {
            return at;
        }
        let minute_of_day = at.hour() * 60 + at.minute();
        let remainder = minute_of_day % self.interval;
        if remainder == 0 {
            at
        } else if remainder <= self.threshold {
            at - TimeDelta::minutes(i64::from(remainder))
        } else {
            at + TimeDelta::minutes(i64::from(self.interval - remainder))
        }
    }

    /// Rounds a time of day. Values that round past midnight wrap to 00:00.
    pub fn round_time(&self, time: NaiveTime) -> NaiveTime {
        self.round(NaiveDate::default().and_time(time)).time()
    }

    /// Rounded duration between clock in and clock out on `date`.
    pub fn worked(&self, date: NaiveDate, clock_in: NaiveTime, clock_out: NaiveTime) -> TimeDelta {
        self.round(date.and_time(clock_out)) - self.round(date.and_time(clock_in))
    }
}
