//! Balance command for the flex time bank.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use ts_core::FlexBalance;
use ts_db::Database;

use crate::Config;
use crate::commands::util::date_or_today;

#[derive(Debug, Args)]
pub struct BalanceArgs {
    #[command(subcommand)]
    pub action: Option<BalanceAction>,

    /// Day to compute the balance for. Defaults to today.
    #[arg(short, long)]
    pub date: Option<String>,

    /// Record the computed balance as a new snapshot.
    #[arg(long)]
    pub save: bool,
}

#[derive(Debug, Subcommand)]
pub enum BalanceAction {
    /// Record a known balance in hours (e.g. 2.5 or -1.25).
    Set {
        #[arg(allow_negative_numbers = true)]
        hours: f64,

        /// Day the balance applies to. Defaults to today.
        #[arg(short, long)]
        date: Option<String>,
    },
}

pub fn run<W: Write>(
    writer: &mut W,
    args: &BalanceArgs,
    db: &mut Database,
    config: &Config,
    today: NaiveDate,
) -> Result<()> {
    if let Some(BalanceAction::Set { hours, date }) = &args.action {
        let date = date_or_today(date.as_deref(), today)?;
        let snapshot = FlexBalance::from_hours(date, *hours);
        db.add_flex_balance(&snapshot)
            .with_context(|| format!("failed to record flex balance for {date}"))?;
        writeln!(writer, "Flex balance on {date}: {snapshot}")?;
        return Ok(());
    }

    let target = date_or_today(args.date.as_deref(), today)?;
    let settings = config.work_settings();
    let report = if args.save {
        ts_core::save_balance(db, &settings, target)?
    } else {
        ts_core::flex_balance(&*db, &settings, target)?
    };

    writeln!(
        writer,
        "Flex balance on {}: {} (since {} at {})",
        report.balance.date, report.balance, report.since.date, report.since
    )?;
    if !report.missing.is_empty() {
        writeln!(
            writer,
            "Missing entries for {} workday(s), balance may be inaccurate:",
            report.missing.len()
        )?;
        for date in &report.missing {
            writeln!(writer, "  {date}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;
    use ts_core::TimesheetEntry;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn exact() -> Config {
        Config {
            round_threshold: 0,
            ..Config::default()
        }
    }

    fn compute(date_arg: Option<&str>, save: bool) -> BalanceArgs {
        BalanceArgs {
            action: None,
            date: date_arg.map(str::to_string),
            save,
        }
    }

    #[test]
    fn set_then_compute() {
        let mut db = Database::open_in_memory().unwrap();
        let config = exact();
        let mut output = Vec::new();
        let set = BalanceArgs {
            action: Some(BalanceAction::Set {
                hours: 0.0,
                date: Some("2024-01-08".to_string()),
            }),
            date: None,
            save: false,
        };
        run(&mut output, &set, &mut db, &config, date("2024-01-10")).unwrap();

        db.commit_entries(&[TimesheetEntry::with_times(
            date("2024-01-09"),
            chrono::NaiveTime::from_hms_opt(9, 0, 0),
            chrono::NaiveTime::from_hms_opt(17, 0, 0),
        )])
        .unwrap();
        run(&mut output, &compute(None, false), &mut db, &config, date("2024-01-10")).unwrap();

        assert_snapshot!(String::from_utf8(output).unwrap(), @r"
        Flex balance on 2024-01-08: +0h 0m
        Flex balance on 2024-01-10: +0h 30m (since 2024-01-08 at +0h 0m)
        Missing entries for 1 workday(s), balance may be inaccurate:
          2024-01-10
        ");
    }

    #[test]
    fn save_records_snapshot() {
        let mut db = Database::open_in_memory().unwrap();
        let config = exact();
        db.add_flex_balance(&FlexBalance::from_hours(date("2024-01-05"), -1.5))
            .unwrap();

        run(&mut Vec::new(), &compute(Some("2024-01-07"), true), &mut db, &config, date("2024-01-10"))
            .unwrap();

        let latest = db.latest_flex_balance(date("2024-01-10")).unwrap().unwrap();
        assert_eq!(latest.date, date("2024-01-07"));
        assert_eq!(latest.seconds, -5400);
    }

    #[test]
    fn compute_without_snapshot_fails() {
        let mut db = Database::open_in_memory().unwrap();
        let err = run(&mut Vec::new(), &compute(None, false), &mut db, &exact(), date("2024-01-10"))
            .unwrap_err();
        assert!(err.to_string().starts_with("no flex balance recorded"));
    }
}
