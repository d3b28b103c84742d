//! Pane registry: stable mapping from pane targets to original projects.
//!
//! The registry answers "which pane was most recently the zsh for project
//! X" even while discovery keeps rebuilding the live pane map. On every
//! full remap it is cleared and re-populated from current pane state;
//! historical timestamps are deliberately not preserved across remaps --
//! correctness under user `cd` wins over stability.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Duration, Utc};

use crate::pane::{Pane, ShellType};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Entries active within this window sort ahead of everything else.
const RECENT_ACTIVITY_SECS: i64 = 60;

// ---------------------------------------------------------------------------
// RegistryEntry
// ---------------------------------------------------------------------------

/// One registered pane, keyed by its target string.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub target: String,
    pub original_project: String,
    pub original_path: PathBuf,
    pub first_seen: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
    pub shell_type: ShellType,
}

// ---------------------------------------------------------------------------
// PaneRegistry
// ---------------------------------------------------------------------------

/// Index from pane targets to "originally associated project" plus recency.
#[derive(Debug, Default)]
pub struct PaneRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl PaneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: RegistryEntry) {
        self.entries.insert(entry.target.clone(), entry);
    }

    pub fn get(&self, target: &str) -> Option<&RegistryEntry> {
        self.entries.get(target)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Clear and re-populate from current pane state.
    ///
    /// Only panes with a project association are registered; the pane's
    /// own timestamps seed the entry.
    pub fn rebuild<'a>(&mut self, panes: impl Iterator<Item = &'a Pane>) {
        self.entries.clear();
        for pane in panes {
            let project = match &pane.project {
                Some(p) => p.clone(),
                None => continue,
            };
            self.entries.insert(
                pane.target(),
                RegistryEntry {
                    target: pane.target(),
                    original_project: project,
                    original_path: pane.current_path.clone(),
                    first_seen: pane.created_at,
                    last_active: pane.last_activity,
                    shell_type: pane.shell_type,
                },
            );
        }
    }

    /// Entries for `(project, shell_type)`, best candidate first:
    ///
    /// 1. Entries active within the last 60 seconds.
    /// 2. Most recent `last_active`.
    /// 3. Tie-break by earliest `first_seen`.
    pub fn get_project_panes(&self, project: &str, shell_type: ShellType) -> Vec<&RegistryEntry> {
        let now = Utc::now();
        let mut matches: Vec<&RegistryEntry> = self
            .entries
            .values()
            .filter(|e| e.original_project == project && e.shell_type == shell_type)
            .collect();

        matches.sort_by(|a, b| {
            let a_recent = now - a.last_active <= Duration::seconds(RECENT_ACTIVITY_SECS);
            let b_recent = now - b.last_active <= Duration::seconds(RECENT_ACTIVITY_SECS);
            b_recent
                .cmp(&a_recent)
                .then(b.last_active.cmp(&a.last_active))
                .then(a.first_seen.cmp(&b.first_seen))
        });

        matches
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
