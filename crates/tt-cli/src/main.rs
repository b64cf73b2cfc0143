use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tt_cli::commands::track::FrameSpec;
use tt_cli::commands::util::parse_datetime;
use tt_cli::commands::{project, report, status, track};
use tt_cli::{Cli, Commands, Config, ProjectAction};
use tt_core::SummaryOptions;

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(tt_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = tt_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    let now = Utc::now();
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Some(Commands::Project(action)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            match action {
                ProjectAction::Add { name, parent } => {
                    project::add(&mut stdout, &mut db, name, parent.as_deref())?;
                }
                ProjectAction::List => project::list(&mut stdout, &db)?,
            }
        }
        Some(Commands::Start {
            project,
            tags,
            notes,
            at,
        }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let at = at
                .as_deref()
                .map_or(Ok(now), |s| parse_datetime(s, now))?;
            let spec = FrameSpec {
                project,
                tags,
                notes: notes.as_deref(),
            };
            track::start(&mut stdout, &mut db, &spec, at)?;
        }
        Some(Commands::Stop { at }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let at = at
                .as_deref()
                .map_or(Ok(now), |s| parse_datetime(s, now))?;
            track::stop(&mut stdout, &mut db, at)?;
        }
        Some(Commands::Add {
            project,
            start,
            end,
            tags,
            notes,
        }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let start = parse_datetime(start, now).context("invalid --start")?;
            let end = parse_datetime(end, now).context("invalid --end")?;
            let spec = FrameSpec {
                project,
                tags,
                notes: notes.as_deref(),
            };
            track::add(&mut stdout, &mut db, &spec, start, end)?;
        }
        Some(Commands::Report(args)) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            report::run(&mut stdout, &db, &config, args, now)?;
        }
        Some(Commands::Status {
            include_active,
            include_archived,
        }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            let options = SummaryOptions {
                include_archived: *include_archived,
                include_active: *include_active,
                reference_end: None,
                entry_rounding: config.rounding(None, None)?,
            };
            status::run(&mut stdout, &db, &config, options, now)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
