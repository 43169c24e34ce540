//! Backfill command for filling the timesheet from auth logs.

use std::io::Write;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use clap::Args;
use ts_core::{Backfill, BackfillOptions, BackfillOutcome, Confirm, ROW_HEADER};
use ts_db::Database;

use crate::Config;
use crate::commands::util::parse_date;

#[derive(Debug, Args)]
pub struct BackfillArgs {
    /// First day to fill. Defaults to the oldest auth log.
    #[arg(long)]
    pub from: Option<String>,

    /// Day after the last day to fill. Defaults to tomorrow.
    #[arg(long)]
    pub until: Option<String>,

    /// Fill workdays without log activity with standard hours.
    #[arg(long)]
    pub standard: bool,

    /// Confirm every change interactively.
    #[arg(long)]
    pub validate: bool,

    /// Replace stored times that differ from the logs.
    #[arg(long, conflicts_with = "validate")]
    pub overwrite: bool,

    /// Also fill weekends and holidays.
    #[arg(long)]
    pub include_holidays: bool,
}

pub fn run<W: Write, C: Confirm + ?Sized>(
    writer: &mut W,
    args: &BackfillArgs,
    db: &mut Database,
    config: &Config,
    today: NaiveDate,
    confirm: &mut C,
) -> Result<()> {
    let options = BackfillOptions {
        from: args.from.as_deref().map(|d| parse_date(d, today)).transpose()?,
        until: args.until.as_deref().map(|d| parse_date(d, today)).transpose()?,
        use_standard: args.standard,
        validate: args.validate,
        overwrite: args.overwrite,
        include_holidays: args.include_holidays,
    };
    let settings = config.work_settings();
    let logs = config.log_source();

    match Backfill::new(db, &settings, &logs, today).run(&options, confirm)? {
        BackfillOutcome::Written(entries) => {
            writeln!(writer, "{ROW_HEADER}")?;
            for entry in entries {
                writeln!(writer, "{entry}")?;
            }
            Ok(())
        }
        BackfillOutcome::NothingChanged => bail!("Nothing changed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs::File;

    use flate2::Compression;
    use flate2::write::GzEncoder;
    use ts_core::ProposedChange;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn args(from: &str, until: &str) -> BackfillArgs {
        BackfillArgs {
            from: Some(from.to_string()),
            until: Some(until.to_string()),
            standard: false,
            validate: false,
            overwrite: false,
            include_holidays: false,
        }
    }

    /// A rotated, compressed log for Monday and a current log for Tuesday.
    fn log_config(temp: &tempfile::TempDir) -> Config {
        let mut gz = GzEncoder::new(
            File::create(temp.path().join("auth.log.1.gz")).unwrap(),
            Compression::default(),
        );
        gz.write_all(
            b"Jan  8 08:55:10 laptop gkr-pam: unlocked login keyring\n\
              Jan  8 16:31:44 laptop systemd-logind[812]: Lid closed.\n",
        )
        .unwrap();
        gz.finish().unwrap();
        std::fs::write(
            temp.path().join("auth.log"),
            "Jan  9 09:10:00 laptop systemd-logind[812]: Lid opened.\n\
             Jan  9 12:00:00 laptop sshd[99]: Accepted publickey for user\n",
        )
        .unwrap();
        Config {
            log_dir: temp.path().to_path_buf(),
            ..Config::default()
        }
    }

    fn no_prompt(_: &ProposedChange) -> bool {
        panic!("unexpected prompt")
    }

    #[test]
    fn backfill_prints_written_rows() {
        let temp = tempfile::tempdir().unwrap();
        let config = log_config(&temp);
        let mut db = Database::open_in_memory().unwrap();
        let mut output = Vec::new();

        run(
            &mut output,
            &args("2024-01-08", "2024-01-10"),
            &mut db,
            &config,
            date("2024-03-01"),
            &mut no_prompt,
        )
        .unwrap();

        let lines: Vec<String> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| l.trim_end().to_string())
            .collect();
        assert_eq!(
            lines,
            vec![
                "Date    \tClock In\tClock Out",
                "2024-01-08\t08:55   \t16:31",
                "2024-01-09\t09:10   \t-",
            ]
        );
    }

    #[test]
    fn second_run_reports_nothing_changed() {
        let temp = tempfile::tempdir().unwrap();
        let config = log_config(&temp);
        let mut db = Database::open_in_memory().unwrap();
        let backfill_args = args("2024-01-08", "2024-01-10");

        run(&mut Vec::new(), &backfill_args, &mut db, &config, date("2024-03-01"), &mut no_prompt)
            .unwrap();
        let err = run(&mut Vec::new(), &backfill_args, &mut db, &config, date("2024-03-01"), &mut no_prompt)
            .unwrap_err();
        assert_eq!(err.to_string(), "Nothing changed");
    }

    #[test]
    fn validate_uses_prompt() {
        let temp = tempfile::tempdir().unwrap();
        let config = log_config(&temp);
        let mut db = Database::open_in_memory().unwrap();
        let backfill_args = BackfillArgs {
            validate: true,
            ..args("2024-01-08", "2024-01-10")
        };
        let mut seen = 0;
        let mut only_monday = |change: &ProposedChange| {
            seen += 1;
            change.date() == date("2024-01-08")
        };

        let mut output = Vec::new();
        run(&mut output, &backfill_args, &mut db, &config, date("2024-03-01"), &mut only_monday)
            .unwrap();
        assert_eq!(seen, 2);
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("2024-01-08"));
        assert!(!output.contains("2024-01-09"));
    }
}
