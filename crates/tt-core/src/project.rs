//! Project hierarchy lookup.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::types::ProjectId;

/// Separator between project names in a full hierarchical name.
pub const NAME_SEPARATOR: char = '/';

/// A project, optionally nested under a parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<ProjectId>,
}

/// Read access to the project hierarchy.
///
/// The report engine only needs parent/child relations and names. This
/// trait lets it work against the storage layer or test fixtures.
pub trait ProjectLookup {
    /// Returns the project with the given ID.
    fn project_by_id(&self, id: &ProjectId) -> Option<&Project>;

    /// Returns all known project IDs.
    fn project_ids(&self) -> Vec<ProjectId>;

    /// Returns the direct children of a project.
    fn child_ids(&self, id: &ProjectId) -> Vec<ProjectId>;

    /// Returns all transitive descendants of a project, excluding itself.
    fn collect_subproject_ids(&self, id: &ProjectId) -> Vec<ProjectId> {
        let mut seen: HashSet<ProjectId> = HashSet::from([id.clone()]);
        let mut pending = self.child_ids(id);
        let mut descendants = Vec::new();
        while let Some(child) = pending.pop() {
            if !seen.insert(child.clone()) {
                continue;
            }
            pending.extend(self.child_ids(&child));
            descendants.push(child);
        }
        descendants.sort();
        descendants
    }

    /// Returns `id` followed by its ancestors, nearest first.
    ///
    /// Stops at the root, at an unknown parent, or when a cycle is detected.
    fn ancestor_ids(&self, id: &ProjectId) -> Vec<ProjectId> {
        let mut chain = vec![id.clone()];
        let mut current = id;
        while let Some(parent) = self
            .project_by_id(current)
            .and_then(|project| project.parent_id.as_ref())
        {
            if chain.contains(parent) {
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }
        chain
    }

    /// Returns the nearest project in `candidates` among `id` and its
    /// ancestors.
    fn find_suitable_project(
        &self,
        id: &ProjectId,
        candidates: &HashSet<ProjectId>,
    ) -> Option<ProjectId> {
        self.ancestor_ids(id)
            .into_iter()
            .find(|candidate| candidates.contains(candidate))
    }

    /// Returns the hierarchical name, e.g. `work/acme/backend`.
    fn full_name(&self, id: &ProjectId) -> Option<String> {
        self.project_by_id(id)?;
        let names: Vec<&str> = self
            .ancestor_ids(id)
            .iter()
            .rev()
            .filter_map(|ancestor| self.project_by_id(ancestor))
            .map(|project| project.name.as_str())
            .collect();
        Some(names.join(&NAME_SEPARATOR.to_string()))
    }
}

/// In-memory project hierarchy.
#[derive(Debug, Clone, Default)]
pub struct ProjectTree {
    projects: BTreeMap<ProjectId, Project>,
    children: HashMap<ProjectId, Vec<ProjectId>>,
}

impl ProjectTree {
    pub fn new(projects: impl IntoIterator<Item = Project>) -> Self {
        let mut tree = Self::default();
        for project in projects {
            tree.insert(project);
        }
        tree
    }

    /// Adds or replaces a project.
    pub fn insert(&mut self, project: Project) {
        if let Some(previous) = self.projects.get(&project.id) {
            if let Some(old_parent) = &previous.parent_id {
                if let Some(siblings) = self.children.get_mut(old_parent) {
                    siblings.retain(|id| *id != project.id);
                }
            }
        }
        if let Some(parent) = &project.parent_id {
            self.children
                .entry(parent.clone())
                .or_default()
                .push(project.id.clone());
        }
        self.projects.insert(project.id.clone(), project);
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Project> {
        self.projects.values()
    }

    /// Finds a project by its full hierarchical name.
    pub fn find_by_full_name(&self, full_name: &str) -> Option<&Project> {
        self.projects
            .values()
            .find(|project| self.full_name(&project.id).as_deref() == Some(full_name))
    }
}

impl ProjectLookup for ProjectTree {
    fn project_by_id(&self, id: &ProjectId) -> Option<&Project> {
        self.projects.get(id)
    }

    fn project_ids(&self) -> Vec<ProjectId> {
        self.projects.keys().cloned().collect()
    }

    fn child_ids(&self, id: &ProjectId) -> Vec<ProjectId> {
        self.children.get(id).cloned().unwrap_or_default()
    }
}
