//! iCalendar holiday feeds.
//!
//! Only the parts needed to populate holidays are read: `VEVENT` blocks with
//! a `DTSTART` date, a `SUMMARY` used as the holiday name and an optional
//! `DESCRIPTION` kept as the comment. Everything outside events is ignored.
//!
//! Folded lines (continuations starting with a space or tab) are joined
//! before parsing, and text values are unescaped.

use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use thiserror::Error;

use crate::error::TimesheetError;
use crate::types::Holiday;

/// A calendar that could not be turned into holidays.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("line {line}: {reason}")]
pub struct InvalidCalendar {
    /// One-based line of the property or block that failed.
    pub line: usize,
    pub reason: String,
}

impl InvalidCalendar {
    fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

/// A logical line after unfolding, with the physical line it started on.
struct ContentLine {
    line: usize,
    text: String,
}

fn unfold(text: &str) -> Vec<ContentLine> {
    let mut lines: Vec<ContentLine> = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(rest) = raw.strip_prefix([' ', '\t']) {
            if let Some(last) = lines.last_mut() {
                last.text.push_str(rest);
                continue;
            }
        }
        if raw.trim().is_empty() {
            continue;
        }
        lines.push(ContentLine {
            line: index + 1,
            text: raw.to_string(),
        });
    }
    lines
}

/// Splits `NAME;PARAM=X:value` into the upper-cased name and the value.
fn split_property(text: &str) -> Option<(String, &str)> {
    let (head, value) = text.split_once(':')?;
    let name = head.split(';').next().unwrap_or(head);
    Some((name.trim().to_ascii_uppercase(), value))
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out.trim().to_string()
}

/// Reads the date of a `DTSTART` value: `20241225` or `20241225T000000Z`.
fn parse_start(value: &str, line: usize) -> Result<NaiveDate, InvalidCalendar> {
    let value = value.trim();
    let (date, time) = value.split_once('T').unwrap_or((value, ""));
    let time_ok = time.is_empty()
        || time
            .get(..6)
            .is_some_and(|hms| hms.bytes().all(|b| b.is_ascii_digit()));
    if date.len() != 8 || !time_ok {
        return Err(InvalidCalendar::new(line, format!("invalid DTSTART {value:?}")));
    }
    NaiveDate::parse_from_str(date, "%Y%m%d")
        .map_err(|err| InvalidCalendar::new(line, format!("invalid DTSTART {value:?}: {err}")))
}

#[derive(Default)]
struct PendingEvent {
    line: usize,
    date: Option<NaiveDate>,
    name: Option<String>,
    comment: Option<String>,
}

impl PendingEvent {
    fn finish(self) -> Result<Holiday, InvalidCalendar> {
        let date = self
            .date
            .ok_or_else(|| InvalidCalendar::new(self.line, "event without DTSTART"))?;
        let name = self
            .name
            .filter(|name| !name.is_empty())
            .ok_or_else(|| InvalidCalendar::new(self.line, "event without SUMMARY"))?;
        Ok(Holiday {
            date,
            name,
            comment: self.comment.filter(|comment| !comment.is_empty()),
        })
    }
}

/// Parses every `VEVENT` of an iCalendar document into a holiday, in file order.
pub fn parse_holidays(text: &str) -> Result<Vec<Holiday>, InvalidCalendar> {
    let mut holidays = Vec::new();
    let mut event: Option<PendingEvent> = None;

    for ContentLine { line, text } in unfold(text) {
        let Some((name, value)) = split_property(&text) else {
            if event.is_some() {
                return Err(InvalidCalendar::new(line, format!("expected a property, got {text:?}")));
            }
            continue;
        };
        match (name.as_str(), value.trim().to_ascii_uppercase().as_str()) {
            ("BEGIN", "VEVENT") => {
                if event.is_some() {
                    return Err(InvalidCalendar::new(line, "nested VEVENT"));
                }
                event = Some(PendingEvent {
                    line,
                    ..PendingEvent::default()
                });
            }
            ("END", "VEVENT") => {
                let finished = event
                    .take()
                    .ok_or_else(|| InvalidCalendar::new(line, "END:VEVENT without BEGIN:VEVENT"))?;
                holidays.push(finished.finish()?);
            }
            _ => {
                let Some(pending) = event.as_mut() else {
                    continue;
                };
                match name.as_str() {
                    "DTSTART" => pending.date = Some(parse_start(value, line)?),
                    "SUMMARY" => pending.name = Some(unescape(value)),
                    "DESCRIPTION" => pending.comment = Some(unescape(value)),
                    _ => {}
                }
            }
        }
    }

    if let Some(pending) = event {
        return Err(InvalidCalendar::new(pending.line, "VEVENT is never closed"));
    }
    tracing::debug!(events = holidays.len(), "parsed calendar");
    Ok(holidays)
}

/// Reads and parses an `.ics` file.
pub fn read_holidays(path: &Path) -> Result<Vec<Holiday>, TimesheetError> {
    let text = fs::read_to_string(path).map_err(|source| TimesheetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_holidays(&text).map_err(|source| TimesheetError::InvalidCalendar {
        path: path.to_path_buf(),
        source,
    })
}
