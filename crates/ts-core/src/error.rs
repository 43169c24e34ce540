//! Error types shared by the timesheet crates.

use std::io;
use std::path::PathBuf;

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::authlog::MalformedLogLine;
use crate::calendar::InvalidCalendar;

/// Errors raised by timesheet operations.
///
/// Library code returns these unchanged; only the command dispatch layer of
/// the CLI turns them into messages and exit codes.
#[derive(Debug, Error)]
pub enum TimesheetError {
    /// An auth log line did not start with the expected syslog timestamp.
    ///
    /// This usually means the log format changed, so the whole operation stops.
    #[error("malformed line in {}", path.display())]
    MalformedLogLine {
        path: PathBuf,
        #[source]
        source: MalformedLogLine,
    },

    /// A query found nothing where at least one row was required.
    #[error("{message}")]
    NoData { message: String },

    /// A field already holds a value and overwriting was not requested.
    #[error("cannot overwrite existing {field} ({value}) on {date} without --overwrite")]
    ExistingData {
        date: NaiveDate,
        field: &'static str,
        value: String,
    },

    /// A new entry carries neither times nor flags.
    #[error("entry for {date} needs a clock in, clock out, flex or PTO value")]
    InvalidEntry { date: NaiveDate },

    /// Clock in is not strictly before clock out.
    #[error("clock in {clock_in} is not before clock out {clock_out} on {date}")]
    InvertedTimes {
        date: NaiveDate,
        clock_in: NaiveTime,
        clock_out: NaiveTime,
    },

    /// The log directory holds no usable auth logs.
    #[error("no readable auth logs found in {}", dir.display())]
    NoLogs { dir: PathBuf },

    /// The log directory could not be listed.
    #[error("unable to read log directory {}", dir.display())]
    LogDirUnreadable {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Backfill has neither an explicit start date nor any log to derive one.
    #[error("no start date given and no auth logs to derive one from")]
    MissingStartDate,

    /// The auth logs hold no login or logout events for the day.
    #[error("unable to find any activity on {date}")]
    NoActivity { date: NaiveDate },

    /// A holiday calendar could not be parsed.
    #[error("invalid calendar {}", path.display())]
    InvalidCalendar {
        path: PathBuf,
        #[source]
        source: InvalidCalendar,
    },

    /// Reading a file failed.
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The storage backend failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TimesheetError {
    pub(crate) fn no_data(message: impl Into<String>) -> Self {
        Self::NoData {
            message: message.into(),
        }
    }
}

/// Errors reported by a [`TimesheetStore`](crate::TimesheetStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique key already exists.
    #[error("duplicate entry for {what}")]
    Duplicate { what: String },

    /// The row to update does not exist.
    #[error("no stored row for {what}")]
    NotFound { what: String },

    /// Any other backend failure.
    #[error("storage error")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}
