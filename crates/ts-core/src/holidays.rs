//! Holiday import.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::TimesheetError;
use crate::store::TimesheetStore;
use crate::types::Holiday;

/// Counts from an import pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub added: Vec<Holiday>,
    /// Same date and name as a stored or earlier holiday.
    pub duplicates: usize,
    /// Same date as a stored or earlier holiday under another name.
    pub conflicts: usize,
}

/// Inserts the holidays not already known, in one batch.
///
/// The first holiday seen for a date wins: later ones with the same name are
/// duplicates, later ones with a different name are conflicts.
pub fn import_holidays<S: TimesheetStore + ?Sized>(
    store: &mut S,
    holidays: Vec<Holiday>,
) -> Result<ImportSummary, TimesheetError> {
    let mut summary = ImportSummary::default();
    let mut accepted: BTreeMap<NaiveDate, Holiday> = BTreeMap::new();

    for holiday in holidays {
        let known = match accepted.get(&holiday.date) {
            Some(earlier) => Some(earlier.name.clone()),
            None => store.holiday(holiday.date)?.map(|stored| stored.name),
        };
        match known {
            Some(name) if name == holiday.name => {
                tracing::info!(date = %holiday.date, name = %holiday.name, "holiday already recorded");
                summary.duplicates += 1;
            }
            Some(name) => {
                tracing::warn!(
                    date = %holiday.date,
                    kept = %name,
                    skipped = %holiday.name,
                    "conflicting holiday, keeping the first"
                );
                summary.conflicts += 1;
            }
            None => {
                accepted.insert(holiday.date, holiday);
            }
        }
    }

    summary.added = accepted.into_values().collect();
    if !summary.added.is_empty() {
        store.add_holidays(&summary.added)?;
    }
    Ok(summary)
}

/// Lists holidays for a calendar year, or every holiday when `year` is `None`.
pub fn holidays_in_year<S: TimesheetStore + ?Sized>(
    store: &S,
    year: Option<i32>,
) -> Result<Vec<Holiday>, TimesheetError> {
    let (from, until) = match year {
        Some(year) => (
            NaiveDate::from_ymd_opt(year, 1, 1),
            NaiveDate::from_ymd_opt(year + 1, 1, 1),
        ),
        None => (
            NaiveDate::from_ymd_opt(1, 1, 1),
            NaiveDate::from_ymd_opt(9999, 12, 31),
        ),
    };
    let (Some(from), Some(until)) = (from, until) else {
        return Err(TimesheetError::no_data(format!(
            "year {} is out of range",
            year.unwrap_or_default()
        )));
    };
    Ok(store.holidays_in_range(from, until)?)
}
