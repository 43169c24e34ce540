//! Flex balance accrual.

use chrono::{NaiveDate, TimeDelta};
use serde::Serialize;

use crate::error::TimesheetError;
use crate::store::{TimesheetStore, is_workday};
use crate::types::{FlexBalance, WorkSettings};

/// A computed balance and the workdays it could not account for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceReport {
    pub balance: FlexBalance,
    /// The snapshot the fold started from.
    pub since: FlexBalance,
    /// Workdays without a complete entry. Non-empty means the balance is
    /// likely understated.
    pub missing: Vec<NaiveDate>,
}

/// Folds entries forward from the latest snapshot on or before `target`.
pub fn flex_balance<S: TimesheetStore + ?Sized>(
    store: &S,
    settings: &WorkSettings,
    target: NaiveDate,
) -> Result<BalanceReport, TimesheetError> {
    let since = store.latest_flex_balance(target)?.ok_or_else(|| {
        TimesheetError::no_data(format!(
            "no flex balance recorded on or before {target}; set one with `ts balance set`"
        ))
    })?;
    if since.date == target {
        return Ok(BalanceReport {
            balance: since,
            since,
            missing: Vec::new(),
        });
    }

    let from = since.date + TimeDelta::days(1);
    let until = target + TimeDelta::days(1);
    let entries = store.entries_in_range(from, until)?;
    let mut entries = entries.into_iter().peekable();
    let rounding = settings.rounding();

    let mut accrued = TimeDelta::zero();
    let mut missing = Vec::new();
    for date in from.iter_days().take_while(|date| *date < until) {
        let workday = is_workday(store, date)?;
        let entry = entries.next_if(|entry| entry.date == date);
        let Some(entry) = entry else {
            if workday {
                missing.push(date);
            }
            continue;
        };

        if entry.is_flex {
            if !workday && !settings.work_weekend {
                tracing::warn!(%date, "flex day recorded on a weekend or holiday");
            }
            continue;
        }
        if entry.is_pto {
            continue;
        }
        match (entry.clock_in, entry.clock_out) {
            (Some(clock_in), Some(clock_out)) => {
                let delta = rounding.worked(date, clock_in, clock_out) - settings.required_day;
                tracing::debug!(%date, seconds = delta.num_seconds(), "accrued");
                accrued += delta;
            }
            _ if workday => {
                tracing::debug!(%date, "incomplete entry");
                missing.push(date);
            }
            _ => {}
        }
    }

    let balance = FlexBalance {
        date: target,
        seconds: since.seconds + accrued.num_seconds(),
    };
    if !missing.is_empty() {
        tracing::warn!(days = missing.len(), "balance computed with missing workdays");
    }
    Ok(BalanceReport {
        balance,
        since,
        missing,
    })
}

/// Computes the balance for `target` and records it as a new snapshot.
pub fn save_balance<S: TimesheetStore + ?Sized>(
    store: &mut S,
    settings: &WorkSettings,
    target: NaiveDate,
) -> Result<BalanceReport, TimesheetError> {
    let report = flex_balance(&*store, settings, target)?;
    if report.balance.date != report.since.date {
        store.add_flex_balance(&report.balance)?;
        tracing::info!(date = %target, balance = %report.balance, "saved flex balance");
    }
    Ok(report)
}
