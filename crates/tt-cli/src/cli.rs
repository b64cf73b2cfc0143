//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tt_core::RoundingMode;

/// Project time tracker.
///
/// Records time frames against a hierarchy of projects and reports them
/// split by calendar unit or project.
#[derive(Debug, Parser)]
#[command(name = "tt", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage projects.
    #[command(subcommand)]
    Project(ProjectAction),

    /// Start tracking time on a project.
    Start {
        /// Full project name (e.g., work/acme).
        project: String,

        /// Tag to attach (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Free-form notes.
        #[arg(long)]
        notes: Option<String>,

        /// Start time (RFC 3339 or relative, e.g. "10 minutes ago"). Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },

    /// Stop the running frame.
    Stop {
        /// Stop time (RFC 3339 or relative). Defaults to now.
        #[arg(long)]
        at: Option<String>,
    },

    /// Record a finished frame.
    Add {
        /// Full project name (e.g., work/acme).
        project: String,

        /// Start time (RFC 3339 or relative).
        #[arg(long)]
        start: String,

        /// End time (RFC 3339 or relative).
        #[arg(long)]
        end: String,

        /// Tag to attach (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Free-form notes.
        #[arg(long)]
        notes: Option<String>,
    },

    /// Report tracked time as a tree of buckets.
    Report(ReportArgs),

    /// Show own and total time per project for the standard periods.
    Status {
        /// Count running frames up to now.
        #[arg(long)]
        include_active: bool,

        /// Count archived frames.
        #[arg(long)]
        include_archived: bool,
    },
}

/// Project management actions.
#[derive(Debug, Subcommand)]
pub enum ProjectAction {
    /// Create a project.
    Add {
        /// Project name, without separators.
        name: String,

        /// Full name of the parent project.
        #[arg(long)]
        parent: Option<String>,
    },

    /// List all projects by full name.
    List,
}

/// Options for `tt report`.
#[derive(Debug, Default, Args)]
pub struct ReportArgs {
    /// Full project name to report on (repeatable). Defaults to all projects.
    #[arg(short, long = "project")]
    pub projects: Vec<String>,

    /// Include subprojects of the selected projects.
    #[arg(long)]
    pub subprojects: bool,

    /// Range start: RFC 3339, relative, or a local date (YYYY-MM-DD).
    #[arg(long)]
    pub from: Option<String>,

    /// Range end: RFC 3339, relative, or a local date (inclusive).
    #[arg(long)]
    pub to: Option<String>,

    /// Comma-separated splits, e.g. project,year,month.
    #[arg(long)]
    pub split: Option<String>,

    /// Rounding mode for each frame: none, nearest or up.
    #[arg(long)]
    pub round: Option<RoundingMode>,

    /// Rounding size in minutes.
    #[arg(long)]
    pub round_minutes: Option<i64>,

    /// Show calendar buckets without frames.
    #[arg(long)]
    pub show_empty: bool,

    /// Count running frames up to now.
    #[arg(long)]
    pub include_active: bool,

    /// Count archived frames.
    #[arg(long)]
    pub include_archived: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}
