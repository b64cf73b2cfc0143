//! Report command for generating time reports.
//!
//! This module implements `tt report`: it turns command-line options into a
//! [`ReportConfig`], builds a [`BucketReport`] over the stored frames and
//! renders the bucket tree as an indented outline or as JSON.

use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tt_core::{
    BucketReport, BucketView, DateRange, ProjectTree, ReportConfig, ReportContext, ResultBucket,
    RoundingMode, SplitOperation,
};
use tt_db::Database;

use crate::Config;
use crate::cli::ReportArgs;
use crate::commands::util::{Bound, format_duration, parse_bound, resolve_project};

// ========== Configuration ==========

/// Builds the report configuration from command-line options.
pub fn build_config(
    args: &ReportArgs,
    config: &Config,
    projects: &ProjectTree,
    tz: Tz,
    now: DateTime<Utc>,
) -> Result<ReportConfig> {
    let project_ids = args
        .projects
        .iter()
        .map(|name| resolve_project(projects, name))
        .collect::<Result<Vec<_>>>()?;

    let from = args
        .from
        .as_deref()
        .map(|s| parse_bound(s, Bound::Start, tz, now))
        .transpose()
        .context("invalid --from")?;
    let to = args
        .to
        .as_deref()
        .map(|s| parse_bound(s, Bound::End, tz, now))
        .transpose()
        .context("invalid --to")?;
    let date_filter = (from.is_some() || to.is_some()).then(|| DateRange::new(from, to));

    let split_operations = SplitOperation::parse_list(args.split.as_deref().unwrap_or_default())
        .context("invalid --split")?;
    let entry_rounding = config.rounding(args.round, args.round_minutes)?;

    Ok(ReportConfig {
        project_ids,
        include_subprojects: args.subprojects,
        date_filter,
        split_operations,
        entry_rounding,
        show_empty: args.show_empty,
        include_active: args.include_active,
        reference_time: Some(now),
        include_archived: args.include_archived,
    })
}

// ========== Text Output ==========

/// Formats the report as an indented outline.
pub fn format_report(report: &BucketReport<'_>) -> String {
    let mut output = String::new();
    let root = report.result();

    if root.is_leaf() && root.is_empty() {
        writeln!(output, "No frames recorded.").unwrap();
        return output;
    }

    writeln!(
        output,
        "{}  {}  ({} frames)",
        report.title(root),
        format_bucket_duration(root),
        root.frame_count()
    )
    .unwrap();
    for child in root.children() {
        write_bucket(&mut output, report, child, 1);
    }
    output
}

fn write_bucket(output: &mut String, report: &BucketReport<'_>, bucket: &ResultBucket, depth: usize) {
    writeln!(
        output,
        "{}{}  {}",
        "  ".repeat(depth),
        report.title(bucket),
        format_bucket_duration(bucket)
    )
    .unwrap();
    for child in bucket.children() {
        write_bucket(output, report, child, depth + 1);
    }
}

/// Rounded duration, followed by the exact one when they differ.
fn format_bucket_duration(bucket: &ResultBucket) -> String {
    let rounded = bucket.duration().get();
    let exact = bucket.duration().get_exact();
    if rounded == exact || bucket.duration().rounding().mode == RoundingMode::None {
        format_duration(rounded.num_milliseconds())
    } else {
        format!(
            "{} (exact {})",
            format_duration(rounded.num_milliseconds()),
            format_duration(exact.num_milliseconds())
        )
    }
}

// ========== JSON Output ==========

/// JSON report structure.
#[derive(Debug, Serialize)]
pub struct JsonReport {
    pub generated_at: String,
    pub timezone: String,
    pub result: BucketView,
}

/// Formats the report as pretty-printed JSON.
pub fn format_report_json(report: &BucketReport<'_>, generated_at: DateTime<Utc>) -> Result<String> {
    let json = JsonReport {
        generated_at: generated_at.to_rfc3339(),
        timezone: report.context().timezone.name().to_string(),
        result: report.view(),
    };
    Ok(serde_json::to_string_pretty(&json)?)
}

// ========== Public Interface ==========

/// Runs the report command.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    args: &ReportArgs,
    now: DateTime<Utc>,
) -> Result<()> {
    let tz = config.tz()?;
    let projects = db.project_tree()?;
    let frames = db.list_frames()?;
    let report_config = build_config(args, config, &projects, tz, now)?;
    tracing::debug!(?report_config, "building report");

    let report = BucketReport::build(&frames, report_config, ReportContext::new(tz, &projects))
        .context("failed to build report")?;

    if args.json {
        writeln!(writer, "{}", format_report_json(&report, now)?)?;
    } else {
        write!(writer, "{}", format_report(&report))?;
    }
    Ok(())
}
