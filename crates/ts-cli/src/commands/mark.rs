//! Flex and PTO commands for excusing whole days.

use std::io::Write;

use anyhow::Result;
use chrono::NaiveDate;
use clap::Args;
use ts_core::{DayKind, ROW_HEADER};
use ts_db::Database;

use crate::commands::util::date_or_today;

#[derive(Debug, Args)]
pub struct MarkArgs {
    /// Day to mark. Defaults to today.
    pub date: Option<String>,

    /// Clear existing clock times for the day.
    #[arg(long)]
    pub overwrite: bool,
}

pub fn run<W: Write>(
    writer: &mut W,
    args: &MarkArgs,
    kind: DayKind,
    db: &mut Database,
    today: NaiveDate,
) -> Result<()> {
    let date = date_or_today(args.date.as_deref(), today)?;
    let entry = ts_core::mark_day(db, date, kind, args.overwrite)?;
    writeln!(writer, "{ROW_HEADER}")?;
    writeln!(writer, "{entry}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    #[test]
    fn marks_today_as_pto() {
        let mut db = Database::open_in_memory().unwrap();
        let args = MarkArgs {
            date: None,
            overwrite: false,
        };
        let mut output = Vec::new();
        run(&mut output, &args, DayKind::Pto, &mut db, today()).unwrap();
        assert!(String::from_utf8(output).unwrap().ends_with("2024-01-10\t-       \tpto     \n"));
    }

    #[test]
    fn refuses_to_flex_worked_day() {
        let mut db = Database::open_in_memory().unwrap();
        let args = MarkArgs {
            date: Some("2024-01-09".to_string()),
            overwrite: false,
        };
        ts_core::clock(
            &mut db,
            NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
            ts_core::LogDirection::In,
            chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            false,
            None,
        )
        .unwrap();

        let err = run(&mut Vec::new(), &args, DayKind::Flex, &mut db, today()).unwrap_err();
        assert!(err.to_string().contains("without --overwrite"));
    }
}
