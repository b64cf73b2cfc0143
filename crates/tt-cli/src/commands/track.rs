//! Frame recording commands: `tt start`, `tt stop` and `tt add`.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tt_core::{Frame, FrameId, ProjectLookup};
use tt_db::Database;
use uuid::Uuid;

use crate::commands::util::{format_duration, parse_tags, resolve_project};

/// A frame to record.
#[derive(Debug, Clone, Default)]
pub struct FrameSpec<'a> {
    pub project: &'a str,
    pub tags: &'a [String],
    pub notes: Option<&'a str>,
}

impl FrameSpec<'_> {
    fn build(&self, db: &Database, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> Result<Frame> {
        let tree = db.project_tree()?;
        let project_id = resolve_project(&tree, self.project)?;
        let mut frame = Frame::new(
            FrameId::new(Uuid::new_v4().to_string())?,
            project_id,
            start,
            end,
        );
        frame.tags = parse_tags(self.tags)?.into_iter().collect();
        frame.notes = self.notes.map(str::to_string);
        Ok(frame)
    }
}

/// Starts a running frame. Fails if another frame is running.
pub fn start<W: Write>(
    writer: &mut W,
    db: &mut Database,
    spec: &FrameSpec<'_>,
    at: DateTime<Utc>,
) -> Result<Frame> {
    if let Some(active) = db.active_frame()? {
        let name = active_project_name(db, &active)?;
        anyhow::bail!("already tracking {name}; run 'tt stop' first");
    }

    let frame = spec.build(db, at, None)?;
    db.insert_frames(std::slice::from_ref(&frame))
        .context("failed to store frame")?;
    writeln!(writer, "Started {} at {}", spec.project, at.to_rfc3339())?;
    Ok(frame)
}

/// Stops the running frame at `at`.
pub fn stop<W: Write>(writer: &mut W, db: &mut Database, at: DateTime<Utc>) -> Result<Frame> {
    let active = db
        .active_frame()?
        .context("no frame is running")?;
    let name = active_project_name(db, &active)?;
    let frame = db
        .stop_frame(&active.id, at)?
        .context("running frame disappeared")?;
    let elapsed = frame
        .duration(None)
        .map_or(0, |duration| duration.num_milliseconds());
    writeln!(writer, "Stopped {name} after {}", format_duration(elapsed))?;
    Ok(frame)
}

/// Records a finished frame.
pub fn add<W: Write>(
    writer: &mut W,
    db: &mut Database,
    spec: &FrameSpec<'_>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Frame> {
    if end < start {
        anyhow::bail!("end {end} is before start {start}");
    }
    let frame = spec.build(db, start, Some(end))?;
    db.insert_frames(std::slice::from_ref(&frame))
        .context("failed to store frame")?;
    writeln!(
        writer,
        "Added {} to {}",
        format_duration((end - start).num_milliseconds()),
        spec.project
    )?;
    Ok(frame)
}

fn active_project_name(db: &Database, frame: &Frame) -> Result<String> {
    let tree = db.project_tree()?;
    Ok(tree
        .full_name(&frame.project_id)
        .unwrap_or_else(|| frame.project_id.to_string()))
}
