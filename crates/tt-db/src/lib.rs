//! Storage layer for the time tracker.
//!
//! Provides persistence for projects and frames using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` instance can be moved between threads but cannot be shared
//! across threads without external synchronization. Reports operate on the
//! [`FrameList`] snapshot returned by [`Database::list_frames`], never on the
//! live connection.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision
//! (e.g., `2024-01-15T10:30:00.000Z`). Lexicographic ordering matches
//! chronological ordering, and values are always UTC.
//!
//! ## Projects
//!
//! Projects form a forest through `parent_id`. Deleting a project deletes its
//! subprojects and their frames.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;
use tt_core::{
    Frame, FrameId, FrameList, Project, ProjectId, ProjectTree, TagId, ValidationError,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp for {record_id}: {timestamp}")]
    TimestampParse {
        record_id: String,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored identifier failed validation.
    #[error("invalid stored identifier: {0}")]
    InvalidId(#[from] ValidationError),
    /// A frame references a project that does not exist.
    #[error("unknown project {project_id} for frame {frame_id}")]
    UnknownProject {
        frame_id: String,
        project_id: String,
    },
    /// A project references a parent that does not exist.
    #[error("unknown parent project {parent_id} for project {project_id}")]
    UnknownParent {
        project_id: String,
        parent_id: String,
    },
    /// A frame ends before it starts.
    #[error("frame {frame_id} ends at {end} before it starts at {start}")]
    InvalidFrameRange {
        frame_id: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
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
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                parent_id TEXT,
                FOREIGN KEY (parent_id) REFERENCES projects(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_projects_parent ON projects(parent_id);

            -- Frames table: recorded time intervals
            -- start_at/end_at: RFC 3339 UTC (e.g., '2024-01-15T10:30:00.000Z')
            -- end_at is NULL while the frame is running
            CREATE TABLE IF NOT EXISTS frames (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL,
                start_at TEXT NOT NULL,
                end_at TEXT,
                archived INTEGER NOT NULL DEFAULT 0,
                notes TEXT,
                FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_frames_start ON frames(start_at);
            CREATE INDEX IF NOT EXISTS idx_frames_project ON frames(project_id);

            CREATE TABLE IF NOT EXISTS frame_tags (
                frame_id TEXT NOT NULL,
                tag TEXT NOT NULL,
                PRIMARY KEY (frame_id, tag),
                FOREIGN KEY (frame_id) REFERENCES frames(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_frame_tags_tag ON frame_tags(tag);
            ",
        )?;
        Ok(())
    }

    /// Inserts or updates a project.
    pub fn insert_project(&mut self, project: &Project) -> Result<(), DbError> {
        if let Some(parent_id) = &project.parent_id {
            if !self.project_exists(parent_id.as_str())? {
                return Err(DbError::UnknownParent {
                    project_id: project.id.to_string(),
                    parent_id: parent_id.to_string(),
                });
            }
        }
        self.conn.execute(
            "
            INSERT INTO projects (id, name, parent_id)
            VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                parent_id = excluded.parent_id
            ",
            params![
                project.id.as_str(),
                project.name,
                project.parent_id.as_ref().map(ProjectId::as_str),
            ],
        )?;
        tracing::debug!(project_id = %project.id, name = %project.name, "stored project");
        Ok(())
    }

    /// Lists all projects ordered by ID.
    pub fn list_projects(&self) -> Result<Vec<Project>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, parent_id FROM projects ORDER BY id ASC")?;
        let rows = stmt.query_map([], |row| {
            let id: String = row.get(0)?;
            let name: String = row.get(1)?;
            let parent_id: Option<String> = row.get(2)?;
            Ok((id, name, parent_id))
        })?;
        let mut projects = Vec::new();
        for row in rows {
            let (id, name, parent_id) = row?;
            projects.push(Project {
                id: ProjectId::new(id)?,
                name,
                parent_id: parent_id.map(ProjectId::new).transpose()?,
            });
        }
        Ok(projects)
    }

    /// Loads the full project hierarchy.
    pub fn project_tree(&self) -> Result<ProjectTree, DbError> {
        Ok(ProjectTree::new(self.list_projects()?))
    }

    /// Inserts a batch of frames in one transaction, replacing frames with
    /// the same ID. Returns the number of frames written.
    pub fn insert_frames(&mut self, frames: &[Frame]) -> Result<usize, DbError> {
        if frames.is_empty() {
            return Ok(0);
        }
        for frame in frames {
            validate_frame_range(frame)?;
            if !self.project_exists(frame.project_id.as_str())? {
                return Err(DbError::UnknownProject {
                    frame_id: frame.id.to_string(),
                    project_id: frame.project_id.to_string(),
                });
            }
        }

        let tx = self.conn.transaction()?;
        let mut written = 0;
        {
            let mut frame_stmt = tx.prepare(
                "
                INSERT INTO frames (id, project_id, start_at, end_at, archived, notes)
                VALUES (?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    project_id = excluded.project_id,
                    start_at = excluded.start_at,
                    end_at = excluded.end_at,
                    archived = excluded.archived,
                    notes = excluded.notes
                ",
            )?;
            let mut clear_tags_stmt = tx.prepare("DELETE FROM frame_tags WHERE frame_id = ?")?;
            let mut tag_stmt =
                tx.prepare("INSERT OR IGNORE INTO frame_tags (frame_id, tag) VALUES (?, ?)")?;
            for frame in frames {
                written += frame_stmt.execute(params![
                    frame.id.as_str(),
                    frame.project_id.as_str(),
                    format_timestamp(frame.start),
                    frame.end.map(format_timestamp),
                    frame.archived,
                    frame.notes,
                ])?;
                clear_tags_stmt.execute([frame.id.as_str()])?;
                for tag in &frame.tags {
                    tag_stmt.execute(params![frame.id.as_str(), tag.as_str()])?;
                }
            }
        }
        tx.commit()?;
        tracing::debug!(frames = written, "stored frames");
        Ok(written)
    }

    /// Lists all frames as a sorted snapshot.
    pub fn list_frames(&self) -> Result<FrameList, DbError> {
        let mut tags = self.list_frame_tags()?;
        let mut stmt = self.conn.prepare(
            "
            SELECT id, project_id, start_at, end_at, archived, notes
            FROM frames
            ORDER BY start_at ASC, id ASC
            ",
        )?;
        let rows = stmt.query_map([], FrameRow::from_row)?;
        let mut frames = Vec::new();
        for row in rows {
            let row = row?;
            let frame_tags = tags.remove(&row.id).unwrap_or_default();
            frames.push(row.into_frame(frame_tags)?);
        }
        Ok(FrameList::new(frames))
    }

    /// Returns the running frame with the latest start, if any.
    pub fn active_frame(&self) -> Result<Option<Frame>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, project_id, start_at, end_at, archived, notes
                FROM frames
                WHERE end_at IS NULL
                ORDER BY start_at DESC, id DESC
                LIMIT 1
                ",
                [],
                FrameRow::from_row,
            )
            .optional()?;
        let Some(row) = row else {
            return Ok(None);
        };
        let tags = self.frame_tags(&row.id)?;
        row.into_frame(tags).map(Some)
    }

    /// Sets the end of a frame. Returns the updated frame, or `None` if no
    /// frame has that ID.
    pub fn stop_frame(
        &mut self,
        id: &FrameId,
        end: DateTime<Utc>,
    ) -> Result<Option<Frame>, DbError> {
        let Some(mut frame) = self.frame_by_id(id)? else {
            return Ok(None);
        };
        frame.end = Some(end);
        validate_frame_range(&frame)?;
        self.conn.execute(
            "UPDATE frames SET end_at = ? WHERE id = ?",
            params![format_timestamp(end), id.as_str()],
        )?;
        tracing::debug!(frame_id = %id, %end, "stopped frame");
        Ok(Some(frame))
    }

    fn frame_by_id(&self, id: &FrameId) -> Result<Option<Frame>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, project_id, start_at, end_at, archived, notes
                FROM frames
                WHERE id = ?
                ",
                [id.as_str()],
                FrameRow::from_row,
            )
            .optional()?;
        let Some(row) = row else {
            return Ok(None);
        };
        let tags = self.frame_tags(&row.id)?;
        row.into_frame(tags).map(Some)
    }

    fn project_exists(&self, id: &str) -> Result<bool, DbError> {
        let exists = self
            .conn
            .query_row("SELECT 1 FROM projects WHERE id = ?", [id], |_| Ok(()))
            .optional()?
            .is_some();
        Ok(exists)
    }

    fn frame_tags(&self, frame_id: &str) -> Result<Vec<String>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT tag FROM frame_tags WHERE frame_id = ? ORDER BY tag ASC")?;
        let rows = stmt.query_map([frame_id], |row| row.get::<_, String>(0))?;
        let mut tags = Vec::new();
        for row in rows {
            tags.push(row?);
        }
        Ok(tags)
    }

    fn list_frame_tags(&self) -> Result<HashMap<String, Vec<String>>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT frame_id, tag
            FROM frame_tags
            ORDER BY frame_id ASC, tag ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            let frame_id: String = row.get(0)?;
            let tag: String = row.get(1)?;
            Ok((frame_id, tag))
        })?;
        let mut tags: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            let (frame_id, tag) = row?;
            tags.entry(frame_id).or_default().push(tag);
        }
        Ok(tags)
    }
}

/// A frame as stored, before timestamps and IDs are parsed.
struct FrameRow {
    id: String,
    project_id: String,
    start_at: String,
    end_at: Option<String>,
    archived: bool,
    notes: Option<String>,
}

impl FrameRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            start_at: row.get(2)?,
            end_at: row.get(3)?,
            archived: row.get(4)?,
            notes: row.get(5)?,
        })
    }

    fn into_frame(self, tags: Vec<String>) -> Result<Frame, DbError> {
        let start = parse_timestamp(&self.start_at, &self.id)?;
        let end = self
            .end_at
            .as_deref()
            .map(|end| parse_timestamp(end, &self.id))
            .transpose()?;
        let tags = tags
            .into_iter()
            .map(TagId::new)
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Frame {
            id: FrameId::new(self.id)?,
            project_id: ProjectId::new(self.project_id)?,
            start,
            end,
            tags,
            archived: self.archived,
            notes: self.notes,
        })
    }
}

fn validate_frame_range(frame: &Frame) -> Result<(), DbError> {
    match frame.end {
        Some(end) if end < frame.start => Err(DbError::InvalidFrameRange {
            frame_id: frame.id.to_string(),
            start: frame.start,
            end,
        }),
        _ => Ok(()),
    }
}

fn parse_timestamp(timestamp: &str, record_id: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(timestamp)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            record_id: record_id.to_string(),
            timestamp: timestamp.to_string(),
            source,
        })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
