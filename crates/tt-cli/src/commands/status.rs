//! Status command: per-project time for today, yesterday, this week, month,
//! year and all time.

use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tt_core::{
    Period, PeriodTotals, ProjectId, ProjectLookup, ProjectSummary, ProjectTree, ReportContext,
    SummaryOptions, project_summaries,
};
use tt_db::Database;

use crate::Config;
use crate::commands::util::format_duration;

const COLUMN_GAP: &str = "  ";

/// Formats summaries as a table of total time per project.
///
/// Projects whose own time differs from their total get an extra `own` row.
pub fn format_status(summaries: &BTreeMap<ProjectId, ProjectSummary>, projects: &ProjectTree) -> String {
    if summaries.is_empty() {
        return "No projects.\n".to_string();
    }

    let mut named: Vec<(String, &ProjectSummary)> = summaries
        .values()
        .map(|summary| {
            let name = projects
                .full_name(&summary.project_id)
                .unwrap_or_else(|| summary.project_id.to_string());
            (name, summary)
        })
        .collect();
    named.sort_by(|a, b| a.0.cmp(&b.0));

    let mut rows: Vec<Vec<String>> = Vec::new();
    rows.push(
        std::iter::once("PROJECT".to_string())
            .chain(Period::ALL.iter().map(|period| period.label().to_uppercase()))
            .collect(),
    );
    for (name, summary) in named {
        rows.push(row(name, &summary.total));
        if has_subproject_time(summary) {
            rows.push(row("  own".to_string(), &summary.tracked));
        }
    }

    render_table(&rows)
}

fn row(label: String, totals: &PeriodTotals) -> Vec<String> {
    std::iter::once(label)
        .chain(
            Period::ALL
                .iter()
                .map(|period| format_duration(totals.get(*period).get().num_milliseconds())),
        )
        .collect()
}

fn has_subproject_time(summary: &ProjectSummary) -> bool {
    Period::ALL
        .iter()
        .any(|period| summary.tracked.get(*period).get() != summary.total.get(*period).get())
}

fn render_table(rows: &[Vec<String>]) -> String {
    let columns = rows.first().map_or(0, Vec::len);
    let widths: Vec<usize> = (0..columns)
        .map(|column| {
            rows.iter()
                .map(|row| row[column].chars().count())
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut output = String::new();
    for row in rows {
        let line = row
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join(COLUMN_GAP);
        output.push_str(line.trim_end());
        output.push('\n');
    }
    output
}

/// Runs the status command.
pub fn run<W: Write>(
    writer: &mut W,
    db: &Database,
    config: &Config,
    options: SummaryOptions,
    now: DateTime<Utc>,
) -> Result<()> {
    let tz = config.tz()?;
    let projects = db.project_tree()?;
    let frames = db.list_frames()?;
    let summaries = project_summaries(&frames, now, options, ReportContext::new(tz, &projects))
        .context("failed to summarize projects")?;

    write!(writer, "{}", format_status(&summaries, &projects))?;
    Ok(())
}
