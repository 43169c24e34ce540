//! Holidays command for importing and listing non-working days.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Subcommand};
use ts_db::Database;

#[derive(Debug, Args)]
pub struct HolidaysArgs {
    #[command(subcommand)]
    pub action: HolidaysAction,
}

#[derive(Debug, Subcommand)]
pub enum HolidaysAction {
    /// Import holidays from an iCalendar (.ics) file.
    Import {
        /// Path to the .ics file.
        file: PathBuf,
    },
    /// List recorded holidays.
    List {
        /// Only list holidays in this year.
        #[arg(long)]
        year: Option<i32>,
    },
}

pub fn run<W: Write>(writer: &mut W, args: &HolidaysArgs, db: &mut Database) -> Result<()> {
    match &args.action {
        HolidaysAction::Import { file } => {
            let holidays = ts_core::read_holidays(file)?;
            let summary = ts_core::import_holidays(db, holidays)?;
            writeln!(
                writer,
                "Imported {} holiday(s), skipped {} duplicate(s) and {} conflict(s)",
                summary.added.len(),
                summary.duplicates,
                summary.conflicts
            )?;
        }
        HolidaysAction::List { year } => {
            for holiday in ts_core::holidays_in_year(&*db, *year)? {
                match &holiday.comment {
                    Some(comment) => {
                        writeln!(writer, "{}\t{} ({comment})", holiday.date, holiday.name)?;
                    }
                    None => writeln!(writer, "{}\t{}", holiday.date, holiday.name)?,
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use insta::assert_snapshot;

    fn event(start: &str, summary: &str) -> String {
        format!("BEGIN:VEVENT\r\nDTSTART;VALUE=DATE:{start}\r\nSUMMARY:{summary}\r\nEND:VEVENT\r\n")
    }

    fn calendar(events: &[String]) -> String {
        format!("BEGIN:VCALENDAR\r\nVERSION:2.0\r\n{}END:VCALENDAR\r\n", events.concat())
    }

    fn import(db: &mut Database, ics: &str) -> String {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("holidays.ics");
        std::fs::write(&file, ics).unwrap();
        let mut output = Vec::new();
        run(
            &mut output,
            &HolidaysArgs {
                action: HolidaysAction::Import { file },
            },
            db,
        )
        .unwrap();
        String::from_utf8(output).unwrap()
    }

    fn list(db: &mut Database, year: Option<i32>) -> String {
        let mut listed = Vec::new();
        run(
            &mut listed,
            &HolidaysArgs {
                action: HolidaysAction::List { year },
            },
            db,
        )
        .unwrap();
        String::from_utf8(listed).unwrap()
    }

    #[test]
    fn import_then_list() {
        let mut db = Database::open_in_memory().unwrap();
        let first = import(
            &mut db,
            &calendar(&[
                event("20241225", "Christmas Day"),
                "BEGIN:VEVENT\r\nDTSTART:20250101T000000Z\r\nSUMMARY:New Year's Day\r\nDESCRIPTION:observed\r\nEND:VEVENT\r\n".to_string(),
            ]),
        );
        let second = import(
            &mut db,
            &calendar(&[
                event("20241225", "Christmas Day"),
                event("20241225", "Christmas"),
                event("20241226", "Boxing Day"),
            ]),
        );

        assert_snapshot!(first + &second, @r"
        Imported 2 holiday(s), skipped 0 duplicate(s) and 0 conflict(s)
        Imported 1 holiday(s), skipped 1 duplicate(s) and 1 conflict(s)
        ");
        assert_eq!(
            list(&mut db, None),
            "2024-12-25\tChristmas Day\n\
             2024-12-26\tBoxing Day\n\
             2025-01-01\tNew Year's Day (observed)\n"
        );
    }

    #[test]
    fn list_filters_by_year() {
        let mut db = Database::open_in_memory().unwrap();
        import(
            &mut db,
            &calendar(&[event("20241225", "Christmas Day"), event("20250101", "New Year's Day")]),
        );
        assert_eq!(list(&mut db, Some(2025)), "2025-01-01\tNew Year's Day\n");
    }

    #[test]
    fn import_rejects_malformed_file() {
        let mut db = Database::open_in_memory().unwrap();
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("holidays.ics");
        std::fs::write(&file, "BEGIN:VEVENT\nDTSTART:Dec 25\nSUMMARY:Christmas\nEND:VEVENT\n").unwrap();
        let err = run(
            &mut Vec::new(),
            &HolidaysArgs {
                action: HolidaysAction::Import { file },
            },
            &mut db,
        )
        .unwrap_err();
        assert!(err.to_string().starts_with("invalid calendar"));
        assert!(list(&mut db, None).is_empty());
    }
}
