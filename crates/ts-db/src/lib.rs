//! Storage layer for the timesheet.
//!
//! Provides persistence for timesheet entries, holidays and flex balance
//! snapshots using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! The CLI opens one `Database` per process and passes it down by `&mut`.
//!
//! # Schema
//!
//! Dates are stored as TEXT in `YYYY-MM-DD` form and clock times as `HH:MM`,
//! so lexicographic ordering matches chronological ordering. Flags are
//! INTEGER 0/1. Every table is keyed by date.

use std::path::Path;

use chrono::{NaiveDate, NaiveTime};
use rusqlite::{Connection, OptionalExtension, Row, ffi, params};
use thiserror::Error;
use ts_core::{FlexBalance, Holiday, StoreError, TimesheetEntry, TimesheetStore};

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored value could not be parsed back into its type.
    #[error("invalid {column} value in database: {value}")]
    InvalidValue {
        column: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A row with the same key already exists.
    #[error("duplicate entry for {what}")]
    Duplicate { what: String },
    /// The row to update does not exist.
    #[error("no stored row for {what}")]
    NotFound { what: String },
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Duplicate { what } => Self::Duplicate { what },
            DbError::NotFound { what } => Self::NotFound { what },
            other => Self::Backend(Box::new(other)),
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS timesheet (
                date TEXT PRIMARY KEY,
                clock_in TEXT,
                clock_out TEXT,
                is_flex INTEGER NOT NULL DEFAULT 0,
                is_pto INTEGER NOT NULL DEFAULT 0,
                project TEXT
            );

            CREATE TABLE IF NOT EXISTS holidays (
                date TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                comment TEXT
            );

            -- Append-only; the latest date is authoritative.
            CREATE TABLE IF NOT EXISTS flex_balance (
                date TEXT PRIMARY KEY,
                seconds INTEGER NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Looks up the entry for a date.
    pub fn entry(&self, date: NaiveDate) -> Result<Option<TimesheetEntry>, DbError> {
        let raw = self
            .conn
            .query_row(
                "
                SELECT date, clock_in, clock_out, is_flex, is_pto, project
                FROM timesheet
                WHERE date = ?
                ",
                [format_date(date)],
                RawEntry::from_row,
            )
            .optional()?;
        raw.map(RawEntry::into_entry).transpose()
    }

    /// Lists entries within a date range.
    ///
    /// The range is inclusive of `from` and exclusive of `until`.
    pub fn entries_in_range(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<TimesheetEntry>, DbError> {
        if until <= from {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT date, clock_in, clock_out, is_flex, is_pto, project
            FROM timesheet
            WHERE date >= ? AND date < ?
            ORDER BY date ASC
            ",
        )?;
        let rows = stmt.query_map([format_date(from), format_date(until)], RawEntry::from_row)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?.into_entry()?);
        }
        Ok(entries)
    }

    /// Inserts a new entry, failing on an existing date.
    pub fn add_entry(&mut self, entry: &TimesheetEntry) -> Result<(), DbError> {
        self.conn
            .execute(
                "
                INSERT INTO timesheet (date, clock_in, clock_out, is_flex, is_pto, project)
                VALUES (?, ?, ?, ?, ?, ?)
                ",
                entry_params(entry),
            )
            .map_err(|err| duplicate_or(err, || format!("timesheet entry on {}", entry.date)))?;
        Ok(())
    }

    /// Replaces every field of an existing entry.
    pub fn update_entry(&mut self, entry: &TimesheetEntry) -> Result<(), DbError> {
        let updated = self.conn.execute(
            "
            UPDATE timesheet
            SET clock_in = ?2, clock_out = ?3, is_flex = ?4, is_pto = ?5, project = ?6
            WHERE date = ?1
            ",
            entry_params(entry),
        )?;
        if updated == 0 {
            return Err(DbError::NotFound {
                what: format!("timesheet entry on {}", entry.date),
            });
        }
        Ok(())
    }

    /// Upserts a batch of entries in one transaction.
    pub fn commit_entries(&mut self, entries: &[TimesheetEntry]) -> Result<(), DbError> {
        if entries.is_empty() {
            return Ok(());
        }
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "
                INSERT INTO timesheet (date, clock_in, clock_out, is_flex, is_pto, project)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(date) DO UPDATE SET
                    clock_in = excluded.clock_in,
                    clock_out = excluded.clock_out,
                    is_flex = excluded.is_flex,
                    is_pto = excluded.is_pto,
                    project = excluded.project
                ",
            )?;
            for entry in entries {
                stmt.execute(entry_params(entry))?;
            }
        }
        tx.commit()?;
        tracing::debug!(rows = entries.len(), "committed timesheet entries");
        Ok(())
    }

    pub fn holiday(&self, date: NaiveDate) -> Result<Option<Holiday>, DbError> {
        let raw = self
            .conn
            .query_row(
                "SELECT date, name, comment FROM holidays WHERE date = ?",
                [format_date(date)],
                RawHoliday::from_row,
            )
            .optional()?;
        raw.map(RawHoliday::into_holiday).transpose()
    }

    /// Lists holidays in `[from, until)` ordered by date.
    pub fn holidays_in_range(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Holiday>, DbError> {
        if until <= from {
            return Ok(Vec::new());
        }
        let mut stmt = self.conn.prepare(
            "
            SELECT date, name, comment
            FROM holidays
            WHERE date >= ? AND date < ?
            ORDER BY date ASC
            ",
        )?;
        let rows = stmt.query_map([format_date(from), format_date(until)], RawHoliday::from_row)?;
        let mut holidays = Vec::new();
        for row in rows {
            holidays.push(row?.into_holiday()?);
        }
        Ok(holidays)
    }

    /// Inserts holidays in one transaction. An existing date rolls back the batch.
    pub fn add_holidays(&mut self, holidays: &[Holiday]) -> Result<(), DbError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO holidays (date, name, comment) VALUES (?, ?, ?)")?;
            for holiday in holidays {
                stmt.execute(params![format_date(holiday.date), holiday.name, holiday.comment])
                    .map_err(|err| duplicate_or(err, || format!("holiday on {}", holiday.date)))?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Returns the latest snapshot dated on or before `date`.
    pub fn latest_flex_balance(&self, date: NaiveDate) -> Result<Option<FlexBalance>, DbError> {
        let raw: Option<(String, i64)> = self
            .conn
            .query_row(
                "
                SELECT date, seconds
                FROM flex_balance
                WHERE date <= ?
                ORDER BY date DESC
                LIMIT 1
                ",
                [format_date(date)],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        raw.map(|(date, seconds)| {
            Ok(FlexBalance {
                date: parse_date(&date)?,
                seconds,
            })
        })
        .transpose()
    }

    pub fn add_flex_balance(&mut self, balance: &FlexBalance) -> Result<(), DbError> {
        self.conn
            .execute(
                "INSERT INTO flex_balance (date, seconds) VALUES (?, ?)",
                params![format_date(balance.date), balance.seconds],
            )
            .map_err(|err| duplicate_or(err, || format!("flex balance on {}", balance.date)))?;
        Ok(())
    }
}

impl TimesheetStore for Database {
    fn entry(&self, date: NaiveDate) -> Result<Option<TimesheetEntry>, StoreError> {
        Ok(Self::entry(self, date)?)
    }

    fn entries_in_range(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<TimesheetEntry>, StoreError> {
        Ok(Self::entries_in_range(self, from, until)?)
    }

    fn add_entry(&mut self, entry: &TimesheetEntry) -> Result<(), StoreError> {
        Ok(Self::add_entry(self, entry)?)
    }

    fn update_entry(&mut self, entry: &TimesheetEntry) -> Result<(), StoreError> {
        Ok(Self::update_entry(self, entry)?)
    }

    fn commit_entries(&mut self, entries: &[TimesheetEntry]) -> Result<(), StoreError> {
        Ok(Self::commit_entries(self, entries)?)
    }

    fn holiday(&self, date: NaiveDate) -> Result<Option<Holiday>, StoreError> {
        Ok(Self::holiday(self, date)?)
    }

    fn holidays_in_range(
        &self,
        from: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<Holiday>, StoreError> {
        Ok(Self::holidays_in_range(self, from, until)?)
    }

    fn add_holidays(&mut self, holidays: &[Holiday]) -> Result<(), StoreError> {
        Ok(Self::add_holidays(self, holidays)?)
    }

    fn latest_flex_balance(&self, date: NaiveDate) -> Result<Option<FlexBalance>, StoreError> {
        Ok(Self::latest_flex_balance(self, date)?)
    }

    fn add_flex_balance(&mut self, balance: &FlexBalance) -> Result<(), StoreError> {
        Ok(Self::add_flex_balance(self, balance)?)
    }
}

/// Timesheet row as stored, before parsing dates and times.
struct RawEntry {
    date: String,
    clock_in: Option<String>,
    clock_out: Option<String>,
    is_flex: bool,
    is_pto: bool,
    project: Option<String>,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            date: row.get(0)?,
            clock_in: row.get(1)?,
            clock_out: row.get(2)?,
            is_flex: row.get(3)?,
            is_pto: row.get(4)?,
            project: row.get(5)?,
        })
    }

    fn into_entry(self) -> Result<TimesheetEntry, DbError> {
        Ok(TimesheetEntry {
            date: parse_date(&self.date)?,
            clock_in: self.clock_in.as_deref().map(parse_time).transpose()?,
            clock_out: self.clock_out.as_deref().map(parse_time).transpose()?,
            is_flex: self.is_flex,
            is_pto: self.is_pto,
            project: self.project,
        })
    }
}

struct RawHoliday {
    date: String,
    name: String,
    comment: Option<String>,
}

impl RawHoliday {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            date: row.get(0)?,
            name: row.get(1)?,
            comment: row.get(2)?,
        })
    }

    fn into_holiday(self) -> Result<Holiday, DbError> {
        Ok(Holiday {
            date: parse_date(&self.date)?,
            name: self.name,
            comment: self.comment,
        })
    }
}

fn entry_params(entry: &TimesheetEntry) -> [Box<dyn rusqlite::ToSql + '_>; 6] {
    [
        Box::new(format_date(entry.date)),
        Box::new(entry.clock_in.map(format_time)),
        Box::new(entry.clock_out.map(format_time)),
        Box::new(entry.is_flex),
        Box::new(entry.is_pto),
        Box::new(entry.project.as_deref()),
    ]
}

fn duplicate_or(err: rusqlite::Error, what: impl FnOnce() -> String) -> DbError {
    match &err {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            DbError::Duplicate { what: what() }
        }
        _ => DbError::Sqlite(err),
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_date(value: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|source| DbError::InvalidValue {
        column: "date",
        value: value.to_string(),
        source,
    })
}

fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

fn parse_time(value: &str) -> Result<NaiveTime, DbError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT).map_err(|source| DbError::InvalidValue {
        column: "time",
        value: value.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        NaiveTime::parse_from_str(s, "%H:%M").unwrap()
    }

    fn worked(d: &str, clock_in: &str, clock_out: &str) -> TimesheetEntry {
        TimesheetEntry::with_times(date(d), Some(time(clock_in)), Some(time(clock_out)))
    }

    #[test]
    fn open_in_memory_database() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn schema_matches_data_model() {
        let db = Database::open_in_memory().expect("open in-memory db");

        assert_eq!(
            table_columns(&db.conn, "timesheet"),
            vec!["date", "clock_in", "clock_out", "is_flex", "is_pto", "project"]
        );
        assert_eq!(
            table_columns(&db.conn, "holidays"),
            vec!["date", "name", "comment"]
        );
        assert_eq!(
            table_columns(&db.conn, "flex_balance"),
            vec!["date", "seconds"]
        );
    }

    fn table_columns(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("PRAGMA table_info({table})"))
            .expect("prepare table_info");
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(1))
            .expect("query table_info");
        rows.map(|row| row.expect("table_info row")).collect()
    }

    #[test]
    fn open_reuses_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("timesheet.db");
        {
            let mut db = Database::open(&path).unwrap();
            db.add_entry(&worked("2024-01-08", "09:00", "17:00")).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert!(db.entry(date("2024-01-08")).unwrap().is_some());
    }

    #[test]
    fn entry_round_trips() {
        let mut db = Database::open_in_memory().unwrap();
        let mut entry = worked("2024-01-08", "08:57", "17:03");
        entry.project = Some("ops".to_string());
        db.add_entry(&entry).unwrap();

        let mut flex = TimesheetEntry::new(date("2024-01-09"));
        flex.is_flex = true;
        db.add_entry(&flex).unwrap();

        assert_eq!(db.entry(date("2024-01-08")).unwrap(), Some(entry));
        assert_eq!(db.entry(date("2024-01-09")).unwrap(), Some(flex));
        assert_eq!(db.entry(date("2024-01-10")).unwrap(), None);
    }

    #[test]
    fn add_entry_maps_unique_violation() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_entry(&worked("2024-01-08", "09:00", "17:00")).unwrap();
        let err = db.add_entry(&worked("2024-01-08", "10:00", "17:00")).unwrap_err();
        assert!(matches!(err, DbError::Duplicate { .. }));
        assert!(matches!(StoreError::from(err), StoreError::Duplicate { .. }));
    }

    #[test]
    fn update_entry_requires_row() {
        let mut db = Database::open_in_memory().unwrap();
        let err = db.update_entry(&worked("2024-01-08", "09:00", "17:00")).unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[test]
    fn entries_in_range_is_half_open_and_ordered() {
        let mut db = Database::open_in_memory().unwrap();
        for d in ["2024-01-10", "2024-01-08", "2024-01-09", "2024-01-11"] {
            db.add_entry(&worked(d, "09:00", "17:00")).unwrap();
        }
        let dates: Vec<NaiveDate> = db
            .entries_in_range(date("2024-01-08"), date("2024-01-11"))
            .unwrap()
            .into_iter()
            .map(|e| e.date)
            .collect();
        assert_eq!(
            dates,
            vec![date("2024-01-08"), date("2024-01-09"), date("2024-01-10")]
        );
        assert!(db
            .entries_in_range(date("2024-01-11"), date("2024-01-08"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn commit_entries_upserts() {
        let mut db = Database::open_in_memory().unwrap();
        db.add_entry(&TimesheetEntry::with_times(date("2024-01-08"), Some(time("09:00")), None))
            .unwrap();

        db.commit_entries(&[
            worked("2024-01-08", "09:00", "16:45"),
            worked("2024-01-09", "08:45", "16:30"),
        ])
        .unwrap();

        assert_eq!(
            db.entry(date("2024-01-08")).unwrap().unwrap().clock_out,
            Some(time("16:45"))
        );
        assert!(db.entry(date("2024-01-09")).unwrap().is_some());
    }

    #[test]
    fn add_holidays_rolls_back_on_duplicate() {
        let mut db = Database::open_in_memory().unwrap();
        let holiday = |d: &str, name: &str| Holiday {
            date: date(d),
            name: name.to_string(),
            comment: Some("observed".to_string()),
        };
        db.add_holidays(&[holiday("2024-12-25", "Christmas Day")]).unwrap();

        let err = db
            .add_holidays(&[
                holiday("2024-12-26", "Boxing Day"),
                holiday("2024-12-25", "Christmas"),
            ])
            .unwrap_err();
        assert!(matches!(err, DbError::Duplicate { .. }));
        assert!(db.holiday(date("2024-12-26")).unwrap().is_none());
        assert_eq!(
            db.holiday(date("2024-12-25")).unwrap(),
            Some(holiday("2024-12-25", "Christmas Day"))
        );
        assert_eq!(
            db.holidays_in_range(date("2024-01-01"), date("2025-01-01")).unwrap().len(),
            1
        );
    }

    #[test]
    fn flex_balance_is_append_only() {
        let mut db = Database::open_in_memory().unwrap();
        let snapshot = FlexBalance {
            date: date("2024-01-05"),
            seconds: -1800,
        };
        db.add_flex_balance(&snapshot).unwrap();
        db.add_flex_balance(&FlexBalance {
            date: date("2024-02-01"),
            seconds: 3600,
        })
        .unwrap();

        assert_eq!(db.latest_flex_balance(date("2024-01-31")).unwrap(), Some(snapshot));
        assert_eq!(
            db.latest_flex_balance(date("2024-02-01")).unwrap().map(|b| b.seconds),
            Some(3600)
        );
        assert!(db.latest_flex_balance(date("2024-01-04")).unwrap().is_none());
        assert!(matches!(
            db.add_flex_balance(&snapshot).unwrap_err(),
            DbError::Duplicate { .. }
        ));
    }

    #[test]
    fn backfill_runs_against_sqlite() {
        use ts_core::{Backfill, BackfillOptions, BackfillOutcome, LogSource, ProposedChange, WorkSettings};

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("auth.log"),
            "Jan  8 08:58:01 laptop gkr-pam: unlocked login keyring\n\
             Jan  8 17:04:30 laptop systemd-logind[812]: Lid closed.\n",
        )
        .unwrap();
        let logs = LogSource::new(dir.path(), "auth.log");
        let settings = WorkSettings::default();
        let mut db = Database::open_in_memory().unwrap();
        let options = BackfillOptions {
            from: Some(date("2024-01-08")),
            until: Some(date("2024-01-09")),
            ..BackfillOptions::default()
        };
        let mut yes = |_: &ProposedChange| true;

        let outcome = Backfill::new(&mut db, &settings, &logs, date("2024-03-01"))
            .run(&options, &mut yes)
            .unwrap();
        assert!(matches!(outcome, BackfillOutcome::Written(ref rows) if rows.len() == 1));
        assert_eq!(db.entry(date("2024-01-08")).unwrap(), Some(worked("2024-01-08", "08:58", "17:04")));

        let again = Backfill::new(&mut db, &settings, &logs, date("2024-03-01"))
            .run(&options, &mut yes)
            .unwrap();
        assert_eq!(again, BackfillOutcome::NothingChanged);
    }
}
