//! Project commands: `tt project add` and `tt project list`.

use std::io::Write;

use anyhow::{Context, Result};
use tt_core::project::NAME_SEPARATOR;
use tt_core::{Project, ProjectId, ProjectLookup};
use tt_db::Database;
use uuid::Uuid;

use crate::commands::util::resolve_project;

/// Creates a project, optionally under a parent given by full name.
pub fn add<W: Write>(
    writer: &mut W,
    db: &mut Database,
    name: &str,
    parent: Option<&str>,
) -> Result<Project> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("project name cannot be empty");
    }
    if name.contains(NAME_SEPARATOR) {
        anyhow::bail!(
            "project name cannot contain '{NAME_SEPARATOR}'; use --parent to nest projects"
        );
    }

    let tree = db.project_tree()?;
    let parent_id = parent
        .map(|full_name| resolve_project(&tree, full_name))
        .transpose()?;
    let full_name = match parent {
        Some(parent) => format!("{parent}{NAME_SEPARATOR}{name}"),
        None => name.to_string(),
    };
    if tree.find_by_full_name(&full_name).is_some() {
        anyhow::bail!("project already exists: {full_name}");
    }

    let project = Project {
        id: ProjectId::new(Uuid::new_v4().to_string())?,
        name: name.to_string(),
        parent_id,
    };
    db.insert_project(&project)
        .with_context(|| format!("failed to create project {full_name}"))?;

    writeln!(writer, "Created project {full_name}")?;
    Ok(project)
}

/// Lists projects by full name, one per line.
pub fn list<W: Write>(writer: &mut W, db: &Database) -> Result<()> {
    let tree = db.project_tree()?;
    if tree.is_empty() {
        writeln!(writer, "No projects. Create one with 'tt project add <name>'.")?;
        return Ok(());
    }

    let mut names: Vec<String> = tree
        .iter()
        .filter_map(|project| tree.full_name(&project.id))
        .collect();
    names.sort();
    for name in names {
        writeln!(writer, "{name}")?;
    }
    Ok(())
}
