//! Project and worktree records, and path-based pane mapping.
//!
//! Projects and their worktrees are discovered by the host and passed in;
//! this module only matches panes and sessions to them by longest-path
//! prefix. Panes that match nothing are grouped under a synthetic
//! "Other Sessions" project.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::pane::ShellType;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Name of the synthetic catch-all project.
pub const OTHER_SESSIONS: &str = "Other Sessions";

/// A git worktree surfaced as a sub-path of its project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worktree {
    pub id: String,
    pub path: PathBuf,
}

/// A shell slot rolled up onto a project from live tmux state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectShell {
    pub shell_type: ShellType,
    pub session: String,
    pub window_index: usize,
}

/// A logical root path supplied by the host's discovery component.
#[derive(Debug, Clone, Default)]
pub struct Project {
    pub name: String,
    pub path: PathBuf,
    pub worktrees: Vec<Worktree>,
    /// Shell roll-up: keyed by shell-type name for real projects, by
    /// `"<session>:<window>"` for the "Other Sessions" project.
    pub shells: HashMap<String, ProjectShell>,
}

impl Project {
    pub fn new(name: &str, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            path: path.into(),
            ..Default::default()
        }
    }

    /// The synthetic project that absorbs unmatched panes and sessions.
    pub fn other_sessions() -> Self {
        Self::new(OTHER_SESSIONS, PathBuf::new())
    }

    pub fn is_other_sessions(&self) -> bool {
        self.name == OTHER_SESSIONS
    }

    /// Look up a worktree by id.
    pub fn worktree(&self, id: &str) -> Option<&Worktree> {
        self.worktrees.iter().find(|w| w.id == id)
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// The project whose path is the longest component-wise prefix of `path`.
pub fn match_project<'a>(projects: &'a [Project], path: &Path) -> Option<&'a Project> {
    projects
        .iter()
        .filter(|p| !p.is_other_sessions() && !p.path.as_os_str().is_empty())
        .filter(|p| path.starts_with(&p.path))
        .max_by_key(|p| p.path.components().count())
}

/// The worktree of `project` whose path is the longest prefix of `path`.
pub fn match_worktree<'a>(project: &'a Project, path: &Path) -> Option<&'a Worktree> {
    project
        .worktrees
        .iter()
        .filter(|w| path.starts_with(&w.path))
        .max_by_key(|w| w.path.components().count())
}

/// Group key for a pane that matched no project: the last non-empty,
/// non-hidden path segment, walking upward.
pub fn derive_group_key(path: &Path) -> String {
    let mut current = Some(path);
    while let Some(p) = current {
        if let Some(name) = p.file_name().and_then(|n| n.to_str()) {
            if !name.is_empty() && !name.starts_with('.') {
                return name.to_string();
            }
        }
        current = p.parent();
    }
    OTHER_SESSIONS.to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
