//! Direct edits of single days: clocking, corrections and day flags.

use chrono::{NaiveDate, NaiveTime};

use crate::error::TimesheetError;
use crate::store::{TimesheetStore, is_workday};
use crate::types::{LogDirection, TimesheetEntry};

/// How a whole day is accounted for instead of by clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayKind {
    Flex,
    Pto,
}

impl DayKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Flex => "flex",
            Self::Pto => "pto",
        }
    }
}

/// Records one clock time, creating the day's row if needed.
pub fn clock<S: TimesheetStore + ?Sized>(
    store: &mut S,
    date: NaiveDate,
    direction: LogDirection,
    time: NaiveTime,
    overwrite: bool,
    project: Option<&str>,
) -> Result<TimesheetEntry, TimesheetError> {
    let Some(mut entry) = store.entry(date)? else {
        let mut entry = TimesheetEntry::new(date);
        entry.project = project.map(str::to_string);
        entry.set_time(direction, time);
        entry.validate()?;
        store.add_entry(&entry)?;
        tracing::info!(%date, %direction, "clocked");
        return Ok(entry);
    };

    if let Some(stored) = entry.time(direction).filter(|_| !overwrite) {
        return Err(TimesheetError::ExistingData {
            date,
            field: direction.field(),
            value: stored.format("%H:%M").to_string(),
        });
    }
    entry.set_time(direction, time);
    entry.validate()?;
    store.update_entry(&entry)?;
    tracing::info!(%date, %direction, "clock time updated");
    Ok(entry)
}

/// Corrects the times of an existing row. Fields left `None` are kept.
pub fn edit<S: TimesheetStore + ?Sized>(
    store: &mut S,
    date: NaiveDate,
    clock_in: Option<NaiveTime>,
    clock_out: Option<NaiveTime>,
) -> Result<TimesheetEntry, TimesheetError> {
    let mut entry = store
        .entry(date)?
        .ok_or_else(|| TimesheetError::no_data(format!("no entry on {date} to edit")))?;
    if let Some(time) = clock_in {
        entry.set_time(LogDirection::In, time);
    }
    if let Some(time) = clock_out {
        entry.set_time(LogDirection::Out, time);
    }
    entry.validate()?;
    store.update_entry(&entry)?;
    Ok(entry)
}

/// Marks a day as flex or PTO.
///
/// A day with clock times is only converted with `overwrite`, which clears
/// the times.
pub fn mark_day<S: TimesheetStore + ?Sized>(
    store: &mut S,
    date: NaiveDate,
    kind: DayKind,
    overwrite: bool,
) -> Result<TimesheetEntry, TimesheetError> {
    let existing = store.entry(date)?;
    let mut entry = existing.clone().unwrap_or_else(|| TimesheetEntry::new(date));

    let stored = [LogDirection::In, LogDirection::Out]
        .into_iter()
        .find_map(|direction| entry.time(direction).map(|t| (direction, t)));
    if let Some((direction, stored)) = stored {
        if !overwrite {
            return Err(TimesheetError::ExistingData {
                date,
                field: direction.field(),
                value: stored.format("%H:%M").to_string(),
            });
        }
        entry.clock_in = None;
        entry.clock_out = None;
    }
    entry.is_flex = kind == DayKind::Flex;
    entry.is_pto = kind == DayKind::Pto;
    entry.validate()?;

    if existing.is_some() {
        store.update_entry(&entry)?;
    } else {
        store.add_entry(&entry)?;
    }
    tracing::info!(%date, kind = kind.as_str(), "marked day");
    Ok(entry)
}

/// Entries in `[from, until)`. An empty range is an error.
pub fn entries_for<S: TimesheetStore + ?Sized>(
    store: &S,
    from: NaiveDate,
    until: NaiveDate,
) -> Result<Vec<TimesheetEntry>, TimesheetError> {
    let entries = store.entries_in_range(from, until)?;
    if entries.is_empty() {
        return Err(TimesheetError::no_data(format!(
            "no entries between {from} and {until}"
        )));
    }
    Ok(entries)
}

/// One day of a listing that covers every date in a range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListedDay {
    Entry(TimesheetEntry),
    /// A workday with nothing stored.
    Missing(NaiveDate),
    /// A weekend or holiday with nothing stored.
    DayOff(NaiveDate),
}

impl ListedDay {
    pub const fn date(&self) -> NaiveDate {
        match self {
            Self::Entry(entry) => entry.date,
            Self::Missing(date) | Self::DayOff(date) => *date,
        }
    }

    pub const fn entry(&self) -> Option<&TimesheetEntry> {
        match self {
            Self::Entry(entry) => Some(entry),
            Self::Missing(_) | Self::DayOff(_) => None,
        }
    }
}

/// Lists every day in `[from, until)`, with placeholders where nothing is stored.
pub fn listed_days<S: TimesheetStore + ?Sized>(
    store: &S,
    from: NaiveDate,
    until: NaiveDate,
) -> Result<Vec<ListedDay>, TimesheetError> {
    let mut entries = store.entries_in_range(from, until)?.into_iter().peekable();
    let mut days = Vec::new();
    for date in from.iter_days().take_while(|date| *date < until) {
        if let Some(entry) = entries.next_if(|entry| entry.date == date) {
            days.push(ListedDay::Entry(entry));
        } else if is_workday(store, date)? {
            days.push(ListedDay::Missing(date));
        } else {
            days.push(ListedDay::DayOff(date));
        }
    }
    Ok(days)
}
