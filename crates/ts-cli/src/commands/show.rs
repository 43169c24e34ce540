//! Show command for listing timesheet entries.

use std::io::Write;

use anyhow::Result;
use chrono::{Datelike, NaiveDate, Timelike};
use clap::Args;
use ts_core::{ListedDay, ROW_HEADER, Rounding, TargetPeriod, TimesheetEntry};
use ts_db::Database;

use crate::Config;

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Period to list: today, yesterday, week, month, lastmonth, all or a month name.
    #[arg(default_value = "month")]
    pub period: TargetPeriod,

    /// Output as JSON.
    #[arg(long, conflicts_with_all = ["fill", "sheet"])]
    pub json: bool,

    /// List every day of the period, with placeholders for missing days.
    #[arg(long, conflicts_with = "sheet")]
    pub fill: bool,

    /// Print rounded clock in and clock out columns for pasting into a flex sheet.
    #[arg(long)]
    pub sheet: bool,
}

pub fn run<W: Write>(
    writer: &mut W,
    args: &ShowArgs,
    db: &Database,
    config: &Config,
    today: NaiveDate,
) -> Result<()> {
    let (from, until) = args.period.range(today);
    tracing::debug!(period = %args.period, %from, %until, "listing entries");

    if args.fill || args.sheet {
        let (from, until) = if args.period == TargetPeriod::All {
            stored_span(db, from, until)?
        } else {
            (from, until)
        };
        let days = ts_core::listed_days(db, from, until)?;
        if args.sheet {
            write_sheet(writer, &days, config.work_settings().rounding())?;
        } else {
            write_filled(writer, &days)?;
        }
        return Ok(());
    }

    let entries = ts_core::entries_for(db, from, until)?;
    if args.json {
        serde_json::to_writer_pretty(&mut *writer, &entries)?;
        writeln!(writer)?;
    } else {
        write_table(writer, &entries)?;
    }
    Ok(())
}

/// Narrows an open-ended range to the first and last stored day.
fn stored_span(db: &Database, from: NaiveDate, until: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let entries = db.entries_in_range(from, until)?;
    match (entries.first(), entries.last()) {
        (Some(first), Some(last)) => Ok((first.date, last.date + chrono::TimeDelta::days(1))),
        _ => Ok((from, from)),
    }
}

fn write_table<W: Write>(writer: &mut W, entries: &[TimesheetEntry]) -> Result<()> {
    writeln!(writer, "{ROW_HEADER}")?;
    let mut previous: Option<&TimesheetEntry> = None;
    for entry in entries {
        // Blank line between months.
        if previous.is_some_and(|p| (p.date.year(), p.date.month()) != (entry.date.year(), entry.date.month())) {
            writeln!(writer)?;
        }
        writeln!(writer, "{entry}")?;
        previous = Some(entry);
    }
    Ok(())
}

fn write_filled<W: Write>(writer: &mut W, days: &[ListedDay]) -> Result<()> {
    writeln!(writer, "{ROW_HEADER}")?;
    for day in days {
        match day {
            ListedDay::Entry(entry) => writeln!(writer, "{entry}")?,
            ListedDay::Missing(date) => writeln!(writer, "{date}\t{:<8}\t{:<8}", "-", "-")?,
            ListedDay::DayOff(date) => writeln!(writer, "{date}")?,
        }
    }
    Ok(())
}

/// One `hour<TAB>minute` line per day and column, blank where no time is stored.
fn write_sheet<W: Write>(writer: &mut W, days: &[ListedDay], rounding: Rounding) -> Result<()> {
    let columns: [(&str, fn(&TimesheetEntry) -> Option<chrono::NaiveTime>); 2] = [
        ("Clock in:", |entry| entry.clock_in),
        ("Clock out:", |entry| entry.clock_out),
    ];
    for (index, (title, column)) in columns.iter().enumerate() {
        if index > 0 {
            writeln!(writer, "---")?;
        }
        writeln!(writer, "{title}")?;
        for day in days {
            match day.entry().and_then(*column) {
                Some(time) => {
                    let time = rounding.round_time(time);
                    writeln!(writer, "{}\t{}", time.hour(), time.minute())?;
                }
                None => writeln!(writer)?,
            }
        }
    }
    Ok(())
}
