//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{NaiveDate, NaiveTime, TimeDelta};
use regex::Regex;

/// Pre-compiled regex for relative date parsing.
static RELATIVE_DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(day|week)s?\s+ago$").unwrap());

/// Conservative bound for relative dates (~1000 years in days).
const MAX_RELATIVE_DAYS: i64 = 1000 * 365;

/// Parse a date string as ISO date, keyword, or relative date.
///
/// Supports:
/// - ISO 8601: "2026-01-15"
/// - Keywords: "today", "yesterday"
/// - Relative: "3 days ago", "1 week ago"
pub fn parse_date(s: &str, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(date);
    }
    match s.to_ascii_lowercase().as_str() {
        "today" => return Ok(today),
        "yesterday" => return Ok(today - TimeDelta::days(1)),
        _ => {}
    }

    // Try relative date: "N days/weeks ago"
    let Some(caps) = RELATIVE_DATE_RE.captures(s) else {
        anyhow::bail!(
            "Invalid date: {s}. Use YYYY-MM-DD (e.g., 2026-01-15), today, yesterday or relative (e.g., '3 days ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative date")?;

    let (max_for_unit, days_per_unit) = match &caps[2] {
        "day" => (MAX_RELATIVE_DAYS, 1),
        "week" => (MAX_RELATIVE_DAYS / 7, 7),
        unit => anyhow::bail!("Unknown date unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative date value too large: {n} {}", &caps[2]);
    }

    Ok(today - TimeDelta::days(n * days_per_unit))
}

/// Parse an optional date argument, defaulting to today.
pub fn date_or_today(s: Option<&str>, today: NaiveDate) -> anyhow::Result<NaiveDate> {
    s.map_or(Ok(today), |s| parse_date(s, today))
}

/// Parse a clock time as `HH:MM` or `HH:MM:SS`.
pub fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .with_context(|| format!("Invalid time: {s}. Use HH:MM (e.g., 09:15)"))
}
