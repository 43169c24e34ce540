//! Backfill: reconstructing timesheet entries from auth log evidence.
//!
//! # Algorithm
//!
//! 1. Index the auth logs and default the range to `[earliest log, tomorrow)`.
//! 2. Merge the activity of every log overlapping the range into one map.
//! 3. For each day, derive candidate clock times (standard hours when asked,
//!    overridden by the earliest login and latest logout) and compare them
//!    with what is stored.
//! 4. Apply the merge policy: confirm interactively under `validate`,
//!    otherwise only fill empty fields unless `overwrite` is set.
//! 5. Write every surviving row in one atomic batch.

use std::fmt;

use chrono::{NaiveDate, NaiveTime, TimeDelta};

use crate::authlog::{DayActivity, LogActivity, LogSource};
use crate::error::TimesheetError;
use crate::store::{TimesheetStore, is_workday};
use crate::types::{LogDirection, TimesheetEntry, WorkSettings, ensure_ordered};

/// Flags controlling a backfill run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackfillOptions {
    /// First day to fill. Defaults to the first day in the oldest log.
    pub from: Option<NaiveDate>,
    /// Day after the last day to fill. Defaults to tomorrow.
    pub until: Option<NaiveDate>,
    /// Fill workdays with standard hours where logs are silent.
    pub use_standard: bool,
    /// Ask before every create or update.
    pub validate: bool,
    /// Replace stored times instead of only filling empty ones.
    pub overwrite: bool,
    /// Also fill weekends and holidays.
    pub include_holidays: bool,
}

/// A row change waiting for the merge policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProposedChange {
    /// No row exists yet for the date.
    Create(TimesheetEntry),
    /// New values for an existing row. `None` leaves a field as stored.
    Update {
        existing: TimesheetEntry,
        clock_in: Option<NaiveTime>,
        clock_out: Option<NaiveTime>,
    },
}

impl ProposedChange {
    pub const fn date(&self) -> NaiveDate {
        match self {
            Self::Create(entry) => entry.date,
            Self::Update { existing, .. } => existing.date,
        }
    }
}

fn describe(old: Option<NaiveTime>, new: Option<NaiveTime>) -> String {
    let show = |t: Option<NaiveTime>| t.map_or_else(|| "-".to_string(), |t| t.format("%H:%M").to_string());
    match new {
        Some(_) => format!("{} -> {}", show(old), show(new)),
        None => format!("{} (unchanged)", show(old)),
    }
}

impl fmt::Display for ProposedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create(entry) => write!(
                f,
                "create {}: clock in {}, clock out {}",
                entry.date,
                describe(None, entry.clock_in),
                describe(None, entry.clock_out),
            ),
            Self::Update {
                existing,
                clock_in,
                clock_out,
            } => write!(
                f,
                "update {}: clock in {}, clock out {}",
                existing.date,
                describe(existing.clock_in, *clock_in),
                describe(existing.clock_out, *clock_out),
            ),
        }
    }
}

/// Decides whether a proposed change should be applied.
pub trait Confirm {
    fn confirm(&mut self, change: &ProposedChange) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&ProposedChange) -> bool,
{
    fn confirm(&mut self, change: &ProposedChange) -> bool {
        self(change)
    }
}

/// Result of a backfill run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackfillOutcome {
    /// Rows that were created or updated, in date order.
    Written(Vec<TimesheetEntry>),
    NothingChanged,
}

/// Reconciles auth log evidence with the stored timesheet.
pub struct Backfill<'a, S: ?Sized> {
    store: &'a mut S,
    settings: &'a WorkSettings,
    logs: &'a LogSource,
    today: NaiveDate,
}

impl<'a, S: TimesheetStore + ?Sized> Backfill<'a, S> {
    pub fn new(
        store: &'a mut S,
        settings: &'a WorkSettings,
        logs: &'a LogSource,
        today: NaiveDate,
    ) -> Self {
        Self {
            store,
            settings,
            logs,
            today,
        }
    }

    pub fn run<C: Confirm + ?Sized>(
        &mut self,
        options: &BackfillOptions,
        confirm: &mut C,
    ) -> Result<BackfillOutcome, TimesheetError> {
        let index = match self.logs.index(self.today) {
            Ok(index) => index,
            Err(err @ (TimesheetError::NoLogs { .. } | TimesheetError::LogDirUnreadable { .. }))
                if options.use_standard =>
            {
                tracing::warn!(error = %err, "no usable auth logs, filling standard hours only");
                Vec::new()
            }
            Err(err) => return Err(err),
        };

        let from = options
            .from
            .or_else(|| index.first().map(|log| log.min_date))
            .ok_or(TimesheetError::MissingStartDate)?;
        let until = options
            .until
            .unwrap_or_else(|| self.today + TimeDelta::days(1));
        tracing::info!(%from, %until, logs = index.len(), "starting backfill");

        let mut activity = LogActivity::default();
        for log in index.iter().filter(|log| log.overlaps(from, until)) {
            tracing::debug!(path = %log.path.display(), "reading auth log");
            activity.merge(self.logs.activity(&log.path, None, self.today)?);
        }
        let activity = self.in_range(activity, from, until, options.include_holidays)?;

        let mut proposed = Vec::new();
        for date in from.iter_days().take_while(|date| *date < until) {
            let workday = is_workday(&*self.store, date)?;
            if !workday && !options.include_holidays {
                continue;
            }
            if let Some(change) = self.propose(date, workday, activity.get(date), options)? {
                proposed.push(change);
            }
        }

        let mut batch = Vec::new();
        for change in proposed {
            if let Some(entry) = self.resolve(change, options, confirm) {
                ensure_ordered(entry.date, entry.clock_in, entry.clock_out)?;
                batch.push(entry);
            }
        }

        if batch.is_empty() {
            tracing::info!("backfill found nothing to change");
            return Ok(BackfillOutcome::NothingChanged);
        }
        self.store.commit_entries(&batch)?;
        tracing::info!(rows = batch.len(), "backfill committed");
        Ok(BackfillOutcome::Written(batch))
    }

    /// Drops activity outside `[from, until)` and, unless asked, on non-workdays.
    fn in_range(
        &self,
        activity: LogActivity,
        from: NaiveDate,
        until: NaiveDate,
        include_holidays: bool,
    ) -> Result<LogActivity, TimesheetError> {
        let mut kept = LogActivity::default();
        for (date, day) in activity {
            if date < from || date >= until {
                continue;
            }
            if !include_holidays && !is_workday(&*self.store, date)? {
                tracing::debug!(%date, "ignoring activity on non-workday");
                continue;
            }
            kept.insert_day(date, day);
        }
        Ok(kept)
    }

    fn propose(
        &self,
        date: NaiveDate,
        workday: bool,
        evidence: Option<&DayActivity>,
        options: &BackfillOptions,
    ) -> Result<Option<ProposedChange>, TimesheetError> {
        let existing = self.store.entry(date)?;
        if existing.as_ref().is_some_and(|e| e.is_flex || e.is_pto) {
            tracing::debug!(%date, "leaving flex/PTO day untouched");
            return Ok(None);
        }

        let login = evidence.and_then(DayActivity::first_login);
        let logout = evidence.and_then(DayActivity::last_logout);
        if evidence.is_none() && !options.use_standard {
            return Ok(None);
        }
        ensure_ordered(date, login, logout)?;

        let (mut clock_in, mut clock_out) = (login, logout);
        if options.use_standard && workday {
            let start = self.settings.standard_start;
            let quit = self.settings.standard_quit;
            // A standard seed never outranks evidence from the other end of the day.
            if clock_in.is_none() && clock_out.is_none_or(|logout| start < logout) {
                clock_in = Some(start);
            }
            if clock_out.is_none() && clock_in.is_none_or(|login| login < quit) {
                clock_out = Some(quit);
            }
        }
        if clock_in.is_none() && clock_out.is_none() {
            return Ok(None);
        }
        ensure_ordered(date, clock_in, clock_out)?;

        let Some(existing) = existing else {
            let entry = TimesheetEntry {
                project: self.settings.default_project.clone(),
                ..TimesheetEntry::with_times(date, clock_in, clock_out)
            };
            return Ok(Some(ProposedChange::Create(entry)));
        };

        let clock_in = clock_in.filter(|time| existing.clock_in != Some(*time));
        let clock_out = clock_out.filter(|time| existing.clock_out != Some(*time));
        if clock_in.is_none() && clock_out.is_none() {
            return Ok(None);
        }
        Ok(Some(ProposedChange::Update {
            existing,
            clock_in,
            clock_out,
        }))
    }

    fn resolve<C: Confirm + ?Sized>(
        &self,
        change: ProposedChange,
        options: &BackfillOptions,
        confirm: &mut C,
    ) -> Option<TimesheetEntry> {
        if options.validate && !confirm.confirm(&change) {
            tracing::info!(date = %change.date(), "change declined");
            return None;
        }

        match change {
            ProposedChange::Create(entry) => Some(entry),
            ProposedChange::Update {
                mut existing,
                clock_in,
                clock_out,
            } => {
                let permitted = |direction: LogDirection, new: Option<NaiveTime>| {
                    let new = new?;
                    let stored = existing.time(direction);
                    if options.validate || options.overwrite || stored.is_none() {
                        Some(new)
                    } else {
                        tracing::info!(
                            date = %existing.date,
                            field = direction.field(),
                            stored = %stored.map(|t| t.to_string()).unwrap_or_default(),
                            proposed = %new,
                            "not overwriting existing value"
                        );
                        None
                    }
                };
                let clock_in = permitted(LogDirection::In, clock_in);
                let clock_out = permitted(LogDirection::Out, clock_out);
                if clock_in.is_none() && clock_out.is_none() {
                    return None;
                }
                if let Some(time) = clock_in {
                    existing.set_time(LogDirection::In, time);
                }
                if let Some(time) = clock_out {
                    existing.set_time(LogDirection::Out, time);
                }
                Some(existing)
            }
        }
    }
}

/// Guesses clock times for a single day from the auth logs and stores them.
///
/// Only the requested directions are filled. A stored value is replaced only
/// with `overwrite`.
pub fn guess_day<S: TimesheetStore + ?Sized>(
    store: &mut S,
    settings: &WorkSettings,
    logs: &LogSource,
    day: NaiveDate,
    directions: &[LogDirection],
    overwrite: bool,
    today: NaiveDate,
) -> Result<TimesheetEntry, TimesheetError> {
    let existing = store.entry(day)?;
    if let Some(existing) = &existing {
        for direction in directions {
            if let Some(stored) = existing.time(*direction).filter(|_| !overwrite) {
                return Err(TimesheetError::ExistingData {
                    date: day,
                    field: direction.field(),
                    value: stored.format("%H:%M").to_string(),
                });
            }
        }
    }

    let until = day + TimeDelta::days(1);
    let mut activity = LogActivity::default();
    for log in logs.index(today)? {
        if log.overlaps(day, until) {
            activity.merge(logs.activity(&log.path, Some(day), today)?);
        }
    }
    let evidence = activity.get(day).cloned().unwrap_or_default();

    let mut entry = existing.clone().unwrap_or_else(|| TimesheetEntry {
        project: settings.default_project.clone(),
        ..TimesheetEntry::new(day)
    });
    let mut found = false;
    for direction in directions {
        let time = match direction {
            LogDirection::In => evidence.first_login(),
            LogDirection::Out => evidence.last_logout(),
        };
        if let Some(time) = time {
            entry.set_time(*direction, time);
            found = true;
        }
    }
    if !found {
        return Err(TimesheetError::NoActivity { date: day });
    }
    entry.validate()?;

    if existing.is_some() {
        store.update_entry(&entry)?;
    } else {
        store.add_entry(&entry)?;
    }
    Ok(entry)
}
