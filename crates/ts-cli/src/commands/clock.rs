//! Clock command for recording clock in and clock out times.

use std::io::Write;

use anyhow::{Result, bail};
use chrono::NaiveDateTime;
use clap::Args;
use ts_core::{LogDirection, ROW_HEADER};
use ts_db::Database;

use crate::Config;
use crate::commands::util::{date_or_today, parse_time};

#[derive(Debug, Args)]
pub struct ClockArgs {
    /// Whether to clock in or out.
    pub direction: LogDirection,

    /// Time to record (HH:MM). Defaults to now.
    pub time: Option<String>,

    /// Day to record. Defaults to today.
    #[arg(short, long)]
    pub date: Option<String>,

    /// Guess the time from the auth logs.
    #[arg(short, long, conflicts_with = "time")]
    pub guess: bool,

    /// Replace an existing time.
    #[arg(long)]
    pub overwrite: bool,
}

pub fn run<W: Write>(
    writer: &mut W,
    args: &ClockArgs,
    db: &mut Database,
    config: &Config,
    now: NaiveDateTime,
) -> Result<()> {
    let date = date_or_today(args.date.as_deref(), now.date())?;

    let entry = if args.guess {
        ts_core::guess_day(
            db,
            &config.work_settings(),
            &config.log_source(),
            date,
            &[args.direction],
            args.overwrite,
            now.date(),
        )?
    } else {
        let time = match &args.time {
            Some(time) => parse_time(time)?,
            None if date == now.date() => now.time(),
            None => bail!("a time is required when clocking {} on another day", args.direction),
        };
        ts_core::clock(
            db,
            date,
            args.direction,
            time,
            args.overwrite,
            config.default_project.as_deref(),
        )?
    };

    writeln!(writer, "{ROW_HEADER}")?;
    writeln!(writer, "{entry}")?;
    Ok(())
}
