//! Core domain logic for the timesheet.
//!
//! This crate contains the fundamental types and logic for:
//! - Auth log parsing: indexing rotated logs and extracting login/logout activity
//! - Backfill: reconciling log activity with stored entries
//! - Holiday calendars: reading iCalendar feeds into holidays
//! - Flex balance: folding worked time against the required day length
//! - Day operations: clocking, edits and flex/PTO days

pub mod authlog;
pub mod backfill;
mod balance;
pub mod calendar;
mod error;
mod holidays;
pub mod period;
mod rounding;
pub mod store;
mod timesheet;
pub mod types;

pub use authlog::{LogActivity, LogMarkers, LogSource};
pub use backfill::{
    Backfill, BackfillOptions, BackfillOutcome, Confirm, ProposedChange, guess_day,
};
pub use balance::{BalanceReport, flex_balance, save_balance};
pub use calendar::{InvalidCalendar, parse_holidays, read_holidays};
pub use error::{StoreError, TimesheetError};
pub use holidays::{ImportSummary, holidays_in_year, import_holidays};
pub use period::{TargetPeriod, UnknownPeriod};
pub use rounding::Rounding;
pub use store::{MemoryStore, TimesheetStore, is_workday};
pub use timesheet::{DayKind, ListedDay, clock, edit, entries_for, listed_days, mark_day};
pub use types::{
    FlexBalance, Holiday, LogDirection, ROW_HEADER, TimesheetEntry, WorkSettings,
    format_seconds,
};
