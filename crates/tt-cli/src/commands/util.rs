//! Shared utilities for CLI commands.

use std::sync::LazyLock;

use anyhow::Context;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use tt_core::{DateRange, ProjectId, ProjectTree, TagId};

/// Pre-compiled regex for relative time parsing.
static RELATIVE_TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)\s+(minute|hour|day|week)s?\s+ago$").unwrap());

/// Conservative bounds for relative time parsing (~1000 years in minutes).
const MAX_RELATIVE_MINUTES: i64 = 1000 * 365 * 24 * 60;

/// Parse a datetime string as either RFC 3339 or relative time.
///
/// Supports:
/// - RFC 3339: "2026-01-15T10:30:00Z"
/// - Relative: "2 hours ago", "30 minutes ago", "1 day ago", "1 week ago"
/// - "now"
pub fn parse_datetime(s: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    if s == "now" {
        return Ok(now);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try relative time: "N hours/minutes/days/weeks ago"
    let Some(caps) = RELATIVE_TIME_RE.captures(s) else {
        anyhow::bail!(
            "Invalid datetime: {s}. Use RFC 3339 (e.g., 2026-01-15T10:30:00Z) or relative (e.g., '2 hours ago')"
        );
    };

    let n: i64 = caps[1]
        .parse()
        .context("failed to parse number in relative time")?;

    let (max_for_unit, minutes_per_unit) = match &caps[2] {
        "minute" => (MAX_RELATIVE_MINUTES, 1),
        "hour" => (MAX_RELATIVE_MINUTES / 60, 60),
        "day" => (MAX_RELATIVE_MINUTES / (60 * 24), 60 * 24),
        "week" => (MAX_RELATIVE_MINUTES / (60 * 24 * 7), 60 * 24 * 7),
        unit => anyhow::bail!("Unknown time unit: {unit}"),
    };

    if n > max_for_unit {
        anyhow::bail!("Relative time value too large: {n} {}", &caps[2]);
    }

    let duration = Duration::minutes(n * minutes_per_unit);
    Ok(now - duration)
}

/// Which side of a range a bound is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Start,
    /// A bare date as end includes that whole day.
    End,
}

/// Parses a range bound: a local date (`YYYY-MM-DD`) in `tz`, or anything
/// [`parse_datetime`] accepts.
pub fn parse_bound(
    s: &str,
    bound: Bound,
    tz: Tz,
    now: DateTime<Utc>,
) -> anyhow::Result<DateTime<Utc>> {
    let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") else {
        return parse_datetime(s, now);
    };

    let noon = date
        .and_hms_opt(12, 0, 0)
        .with_context(|| format!("invalid date: {s}"))?;
    let instant = tz
        .from_local_datetime(&noon)
        .earliest()
        .with_context(|| format!("{s} does not exist in {tz}"))?
        .with_timezone(&Utc);
    let day = DateRange::day(instant, tz);
    let resolved = match bound {
        Bound::Start => day.start,
        Bound::End => day.end,
    };
    resolved.with_context(|| format!("date out of range: {s}"))
}

/// Resolves a full project name such as `work/acme` to its ID.
pub fn resolve_project(tree: &ProjectTree, full_name: &str) -> anyhow::Result<ProjectId> {
    tree.find_by_full_name(full_name)
        .map(|project| project.id.clone())
        .with_context(|| format!("unknown project: {full_name}"))
}

/// Validates tag names.
pub fn parse_tags(tags: &[String]) -> anyhow::Result<Vec<TagId>> {
    tags.iter()
        .map(|tag| TagId::new(tag.trim()).with_context(|| format!("invalid tag: {tag:?}")))
        .collect()
}

/// Formats milliseconds as duration string.
/// Returns "Xh Ym" if >= 1 hour, "Xm" if < 1 hour.
/// Negative durations are treated as 0m.
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "0m".to_string();
    }
    let total_minutes = ms / 60_000;
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
