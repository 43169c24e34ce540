//! Auth log scanning.
//!
//! Reads syslog-style authentication logs (`auth.log`, `auth.log.1`,
//! `auth.log.2.gz`, ...) and extracts login and logout events.
//!
//! # Line Format
//!
//! Every line starts with `<Mon> <day> <HH:MM:SS>`. The year is not part of
//! the line, so it is taken from a reference date: the reference year is used
//! unless that would put the line in the future, in which case the line
//! belongs to the previous year.
//!
//! # Compression
//!
//! Rotated logs ending in `.gz` are decompressed transparently by
//! [`open_lines`]; everything downstream only sees lines of text.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use flate2::read::GzDecoder;
use regex::Regex;
use thiserror::Error;

use crate::error::TimesheetError;
use crate::types::{LogDirection, truncate_to_minute};

/// Default directory holding the auth logs.
pub const DEFAULT_LOG_DIR: &str = "/var/log";

/// Default base name of the auth log.
pub const DEFAULT_LOG_BASE_NAME: &str = "auth.log";

/// Phrases that mark the start of a session: unlocks, wake up, lid open.
const LOGIN_MARKERS: &[&str] = &[
    "unlocked login keyring",
    "gnome-keyring-daemon started properly and unlocked keyring",
    "Operation 'sleep' finished",
    "Lid opened",
];

/// Phrases that mark the end of a session: lid close, shutdown.
const LOGOUT_MARKERS: &[&str] = &["Lid closed", "System is powering down"];

/// Suffix allowed after the base name: optional rotation number, optional `.gz`.
static ROTATION_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\.\d+)?(\.gz)?$").unwrap());

/// A log line whose timestamp could not be parsed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("could not parse timestamp from log line: {line:?}")]
pub struct MalformedLogLine {
    pub line: String,
}

/// Parses the leading timestamp of a log line.
///
/// `today` supplies the year and bounds the result: a timestamp that would
/// land after `today` is placed in the previous year.
pub fn parse_timestamp(line: &str, today: NaiveDate) -> Result<NaiveDateTime, MalformedLogLine> {
    let malformed = || MalformedLogLine {
        line: line.trim_end().to_string(),
    };
    let mut fields = line.split_whitespace();
    let (Some(month), Some(day), Some(clock)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(malformed());
    };

    let parse = |year: i32| {
        NaiveDateTime::parse_from_str(
            &format!("{year} {month} {day:0>2} {clock}"),
            "%Y %b %d %H:%M:%S",
        )
    };
    let year = today.year();
    // Feb 29 only exists in some years; fall back before giving up.
    let parsed = parse(year)
        .or_else(|_| parse(year - 1))
        .map_err(|_| malformed())?;
    if parsed.date() > today {
        parse(year - 1).map_err(|_| malformed())
    } else {
        Ok(parsed)
    }
}

/// Marker phrases used to classify log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMarkers {
    login: Vec<String>,
    logout: Vec<String>,
}

impl LogMarkers {
    pub fn new(login: Vec<String>, logout: Vec<String>) -> Self {
        Self { login, logout }
    }

    /// Classifies a line by substring match.
    ///
    /// Login markers are checked first, so a line matching both is a login.
    pub fn classify(&self, line: &str) -> Option<LogDirection> {
        if self.login.iter().any(|marker| line.contains(marker.as_str())) {
            Some(LogDirection::In)
        } else if self.logout.iter().any(|marker| line.contains(marker.as_str())) {
            Some(LogDirection::Out)
        } else {
            None
        }
    }
}

impl Default for LogMarkers {
    fn default() -> Self {
        Self {
            login: LOGIN_MARKERS.iter().map(|m| (*m).to_string()).collect(),
            logout: LOGOUT_MARKERS.iter().map(|m| (*m).to_string()).collect(),
        }
    }
}

/// Opens a log file as a stream of lines, decompressing `.gz` files.
pub fn open_lines(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Splits a reader into lines, replacing invalid UTF-8 instead of failing.
fn text_lines(reader: Box<dyn BufRead>) -> impl Iterator<Item = io::Result<String>> {
    reader.split(b'\n').map(|bytes| {
        bytes.map(|bytes| {
            String::from_utf8_lossy(&bytes)
                .trim_end_matches('\r')
                .to_string()
        })
    })
}

/// The span of dates covered by one log file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthLogFile {
    pub path: PathBuf,
    pub min_date: NaiveDate,
    pub max_date: NaiveDate,
}

impl AuthLogFile {
    /// True when the file covers any day of the half-open range `[from, until)`.
    pub fn overlaps(&self, from: NaiveDate, until: NaiveDate) -> bool {
        self.min_date < until && self.max_date >= from
    }
}

/// Login and logout times seen on one day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DayActivity {
    pub logins: Vec<NaiveTime>,
    pub logouts: Vec<NaiveTime>,
}

impl DayActivity {
    pub fn first_login(&self) -> Option<NaiveTime> {
        self.logins.iter().min().copied()
    }

    pub fn last_logout(&self) -> Option<NaiveTime> {
        self.logouts.iter().max().copied()
    }

    fn extend(&mut self, other: Self) {
        self.logins.extend(other.logins);
        self.logouts.extend(other.logouts);
    }
}

/// Classified events bucketed by date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogActivity {
    days: BTreeMap<NaiveDate, DayActivity>,
}

impl LogActivity {
    pub fn record(&mut self, date: NaiveDate, direction: LogDirection, time: NaiveTime) {
        let day = self.days.entry(date).or_default();
        match direction {
            LogDirection::In => day.logins.push(time),
            LogDirection::Out => day.logouts.push(time),
        }
    }

    /// Adds one day's events, extending any events already recorded for it.
    pub fn insert_day(&mut self, date: NaiveDate, activity: DayActivity) {
        self.days.entry(date).or_default().extend(activity);
    }

    /// Merges another file's activity into this one.
    ///
    /// Lists are extended rather than replaced: a day can straddle a log
    /// rotation, and duplicates do not change the earliest/latest pick.
    pub fn merge(&mut self, other: Self) {
        for (date, activity) in other.days {
            self.insert_day(date, activity);
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DayActivity> {
        self.days.get(&date)
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, NaiveDate, DayActivity> {
        self.days.iter()
    }
}

impl IntoIterator for LogActivity {
    type Item = (NaiveDate, DayActivity);
    type IntoIter = btree_map::IntoIter<NaiveDate, DayActivity>;

    fn into_iter(self) -> Self::IntoIter {
        self.days.into_iter()
    }
}

/// A directory of rotated auth logs.
#[derive(Debug, Clone)]
pub struct LogSource {
    dir: PathBuf,
    base_name: String,
    markers: LogMarkers,
}

impl Default for LogSource {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_DIR, DEFAULT_LOG_BASE_NAME)
    }
}

impl LogSource {
    pub fn new(dir: impl Into<PathBuf>, base_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            base_name: base_name.into(),
            markers: LogMarkers::default(),
        }
    }

    #[must_use]
    pub fn with_markers(mut self, markers: LogMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Lists files named `<base>`, `<base>.N`, `<base>.gz` or `<base>.N.gz`.
    pub fn log_files(&self) -> Result<Vec<PathBuf>, TimesheetError> {
        let unreadable = |source| TimesheetError::LogDirUnreadable {
            dir: self.dir.clone(),
            source,
        };
        let mut files = Vec::new();
        for dir_entry in fs::read_dir(&self.dir).map_err(unreadable)? {
            let dir_entry = dir_entry.map_err(unreadable)?;
            let name = dir_entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            let matches = name
                .strip_prefix(self.base_name.as_str())
                .is_some_and(|suffix| ROTATION_SUFFIX_RE.is_match(suffix));
            if matches && dir_entry.path().is_file() {
                files.push(dir_entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    /// Indexes every log file by the dates it covers, oldest first.
    ///
    /// Empty or unreadable files are skipped with a warning. Finding no usable
    /// file at all is an error.
    pub fn index(&self, today: NaiveDate) -> Result<Vec<AuthLogFile>, TimesheetError> {
        let mut index = Vec::new();
        for path in self.log_files()? {
            let reader = match open_lines(&path) {
                Ok(reader) => reader,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable auth log");
                    continue;
                }
            };
            let mut first_line = None;
            let mut last_line = None;
            for line in text_lines(reader) {
                let line = line.map_err(|source| TimesheetError::Io {
                    path: path.clone(),
                    source,
                })?;
                if line.trim().is_empty() {
                    continue;
                }
                if first_line.is_none() {
                    first_line = Some(line.clone());
                }
                last_line = Some(line);
            }
            let (Some(first_line), Some(last_line)) = (first_line, last_line) else {
                tracing::warn!(path = %path.display(), "skipping empty auth log");
                continue;
            };
            let span = |line: &str| {
                parse_timestamp(line, today)
                    .map(|at| at.date())
                    .map_err(|source| TimesheetError::MalformedLogLine {
                        path: path.clone(),
                        source,
                    })
            };
            let min_date = span(&first_line)?;
            let max_date = span(&last_line)?;
            tracing::debug!(path = %path.display(), %min_date, %max_date, "indexed auth log");
            index.push(AuthLogFile {
                path,
                min_date,
                max_date,
            });
        }

        if index.is_empty() {
            return Err(TimesheetError::NoLogs {
                dir: self.dir.clone(),
            });
        }
        index.sort_by(|a, b| a.min_date.cmp(&b.min_date).then(a.max_date.cmp(&b.max_date)));
        Ok(index)
    }

    /// Extracts classified events from one file.
    ///
    /// With `day` set, lines before that day are skipped and reading stops at
    /// the first line after it, since log lines are chronological. Without a
    /// day every line is bucketed under its own date.
    pub fn activity(
        &self,
        path: &Path,
        day: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Result<LogActivity, TimesheetError> {
        let io_error = |source| TimesheetError::Io {
            path: path.to_path_buf(),
            source,
        };
        let reader = open_lines(path).map_err(io_error)?;
        let mut activity = LogActivity::default();
        for line in text_lines(reader) {
            let line = line.map_err(io_error)?;
            if line.trim().is_empty() {
                continue;
            }
            let at = parse_timestamp(&line, today).map_err(|source| {
                TimesheetError::MalformedLogLine {
                    path: path.to_path_buf(),
                    source,
                }
            })?;
            let line_day = at.date();
            if let Some(day) = day {
                if line_day > day {
                    break;
                }
                if line_day < day {
                    continue;
                }
            }
            let Some(direction) = self.markers.classify(&line) else {
                continue;
            };
            activity.record(line_day, direction, truncate_to_minute(at.time()));
        }
        Ok(activity)
    }
}
