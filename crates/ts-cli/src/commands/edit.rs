//! Edit command for correcting a stored day.

use std::io::Write;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::Args;
use ts_core::ROW_HEADER;
use ts_db::Database;

use crate::commands::util::{parse_date, parse_time};

#[derive(Debug, Args)]
pub struct EditArgs {
    /// Day to edit (YYYY-MM-DD, yesterday, "3 days ago").
    pub date: String,

    /// New clock in time (HH:MM).
    #[arg(long = "in")]
    pub clock_in: Option<String>,

    /// New clock out time (HH:MM).
    #[arg(long = "out")]
    pub clock_out: Option<String>,
}

pub fn run<W: Write>(
    writer: &mut W,
    args: &EditArgs,
    db: &mut Database,
    today: NaiveDate,
) -> Result<()> {
    if args.clock_in.is_none() && args.clock_out.is_none() {
        bail!("nothing to edit: pass --in and/or --out");
    }
    let date = parse_date(&args.date, today)?;
    let clock_in = args.clock_in.as_deref().map(parse_time).transpose()?;
    let clock_out = args.clock_out.as_deref().map(parse_time).transpose()?;

    let entry = ts_core::edit(db, date, clock_in, clock_out)?;
    writeln!(writer, "{ROW_HEADER}")?;
    writeln!(writer, "{entry}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use ts_core::{LogDirection, TimesheetStore};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 10).unwrap()
    }

    #[test]
    fn edit_updates_clock_out() {
        let mut db = Database::open_in_memory().unwrap();
        ts_core::clock(
            &mut db,
            NaiveDate::from_ymd_opt(2024, 1, 9).unwrap(),
            LogDirection::In,
            parse_time("09:00").unwrap(),
            false,
            None,
        )
        .unwrap();

        let args = EditArgs {
            date: "yesterday".to_string(),
            clock_in: None,
            clock_out: Some("17:15".to_string()),
        };
        let mut output = Vec::new();
        run(&mut output, &args, &mut db, today()).unwrap();

        let stored = TimesheetStore::entry(&db, NaiveDate::from_ymd_opt(2024, 1, 9).unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(stored.clock_out, Some(parse_time("17:15").unwrap()));
        assert!(String::from_utf8(output).unwrap().ends_with("2024-01-09\t09:00   \t17:15   \n"));
    }

    #[test]
    fn edit_without_times_fails() {
        let mut db = Database::open_in_memory().unwrap();
        let args = EditArgs {
            date: "2024-01-09".to_string(),
            clock_in: None,
            clock_out: None,
        };
        let err = run(&mut Vec::new(), &args, &mut db, today()).unwrap_err();
        assert!(err.to_string().contains("nothing to edit"));
    }

    #[test]
    fn edit_missing_day_fails() {
        let mut db = Database::open_in_memory().unwrap();
        let args = EditArgs {
            date: "2024-01-09".to_string(),
            clock_in: Some("09:00".to_string()),
            clock_out: None,
        };
        let err = run(&mut Vec::new(), &args, &mut db, today()).unwrap_err();
        assert_eq!(err.to_string(), "no entry on 2024-01-09 to edit");
    }
}
