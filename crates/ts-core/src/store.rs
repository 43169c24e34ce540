//! Storage interface used by the timesheet operations.
//!
//! The reconciliation engine and balance fold only ever talk to a
//! [`TimesheetStore`]; `ts-db` implements it on `SQLite` and [`MemoryStore`]
//! keeps everything in maps for tests.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, Weekday};

use crate::error::StoreError;
use crate::types::{FlexBalance, Holiday, TimesheetEntry};

/// Persistence operations for entries, holidays and balance snapshots.
///
/// Ranges are half-open: `from` is included, `until` is not.
pub trait TimesheetStore {
    /// Looks up the entry for a single date.
    fn entry(&self, date: NaiveDate) -> Result<Option<TimesheetEntry>, StoreError>;

    /// Lists entries in `[from, until)` ordered by date.
    fn entries_in_range(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<TimesheetEntry>, StoreError>;

    /// Inserts a new entry. Fails with [`StoreError::Duplicate`] if the date exists.
    fn add_entry(&mut self, entry: &TimesheetEntry) -> Result<(), StoreError>;

    /// Replaces the fields of an existing entry.
    fn update_entry(&mut self, entry: &TimesheetEntry) -> Result<(), StoreError>;

    /// Inserts or updates all entries atomically: either every row is written
    /// or none is.
    fn commit_entries(&mut self, entries: &[TimesheetEntry]) -> Result<(), StoreError>;

    fn holiday(&self, date: NaiveDate) -> Result<Option<Holiday>, StoreError>;

    fn holidays_in_range(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Holiday>, StoreError>;

    /// Inserts holidays atomically. Any existing date fails the whole batch.
    fn add_holidays(&mut self, holidays: &[Holiday]) -> Result<(), StoreError>;

    /// Returns the most recent snapshot dated on or before `date`.
    fn latest_flex_balance(&self, date: NaiveDate) -> Result<Option<FlexBalance>, StoreError>;

    /// Appends a snapshot. Snapshots are never updated.
    fn add_flex_balance(&mut self, balance: &FlexBalance) -> Result<(), StoreError>;
}

/// A workday is Monday to Friday and not a recorded holiday.
pub fn is_workday<S: TimesheetStore + ?Sized>(
    store: &S,
    date: NaiveDate,
) -> Result<bool, StoreError> {
    if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
        return Ok(false);
    }
    Ok(store.holiday(date)?.is_none())
}

/// In-memory store.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<NaiveDate, TimesheetEntry>,
    holidays: BTreeMap<NaiveDate, Holiday>,
    balances: BTreeMap<NaiveDate, FlexBalance>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimesheetStore for MemoryStore {
    fn entry(&self, date: NaiveDate) -> Result<Option<TimesheetEntry>, StoreError> {
        Ok(self.entries.get(&date).cloned())
    }

    fn entries_in_range(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<TimesheetEntry>, StoreError> {
        if until <= from {
            return Ok(Vec::new());
        }
        Ok(self.entries.range(from..until).map(|(_, e)| e.clone()).collect())
    }

    fn add_entry(&mut self, entry: &TimesheetEntry) -> Result<(), StoreError> {
        if self.entries.contains_key(&entry.date) {
            return Err(StoreError::Duplicate {
                what: entry.date.to_string(),
            });
        }
        self.entries.insert(entry.date, entry.clone());
        Ok(())
    }

    fn update_entry(&mut self, entry: &TimesheetEntry) -> Result<(), StoreError> {
        let Some(stored) = self.entries.get_mut(&entry.date) else {
            return Err(StoreError::NotFound {
                what: entry.date.to_string(),
            });
        };
        *stored = entry.clone();
        Ok(())
    }

    fn commit_entries(&mut self, entries: &[TimesheetEntry]) -> Result<(), StoreError> {
        for entry in entries {
            self.entries.insert(entry.date, entry.clone());
        }
        Ok(())
    }

    fn holiday(&self, date: NaiveDate) -> Result<Option<Holiday>, StoreError> {
        Ok(self.holidays.get(&date).cloned())
    }

    fn holidays_in_range(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Holiday>, StoreError> {
        if until <= from {
            return Ok(Vec::new());
        }
        Ok(self.holidays.range(from..until).map(|(_, h)| h.clone()).collect())
    }

    fn add_holidays(&mut self, holidays: &[Holiday]) -> Result<(), StoreError> {
        let mut seen = std::collections::BTreeSet::new();
        for holiday in holidays {
            if self.holidays.contains_key(&holiday.date) || !seen.insert(holiday.date) {
                return Err(StoreError::Duplicate {
                    what: format!("holiday on {}", holiday.date),
                });
            }
        }
        for holiday in holidays {
            self.holidays.insert(holiday.date, holiday.clone());
        }
        Ok(())
    }

    fn latest_flex_balance(&self, date: NaiveDate) -> Result<Option<FlexBalance>, StoreError> {
        Ok(self.balances.range(..=date).next_back().map(|(_, b)| *b))
    }

    fn add_flex_balance(&mut self, balance: &FlexBalance) -> Result<(), StoreError> {
        if self.balances.contains_key(&balance.date) {
            return Err(StoreError::Duplicate {
                what: format!("flex balance on {}", balance.date),
            });
        }
        self.balances.insert(balance.date, *balance);
        Ok(())
    }
}
