//! Best-matching pane selection for navigation.
//!
//! The registry remembers which pane was originally the zsh/claude/nvim
//! for a project; the finder walks those candidates in recency order but
//! guards against staleness -- users `cd` panes away from their project,
//! and a registry hit whose live pane has left the project tree must not
//! win. A linear scan of the live pane map is the fallback.

use std::collections::HashMap;

use crate::pane::{Pane, ShellType};
use crate::project::{Project, Worktree};
use crate::registry::PaneRegistry;

/// Find the best project-level pane for `(project, shell)`.
///
/// Registry candidates with a worktree association are skipped (those are
/// worktree panes, not project panes), as are candidates whose current
/// path no longer begins with the project path.
pub fn find_project_pane<'a>(
    registry: &PaneRegistry,
    panes: &'a HashMap<String, Pane>,
    project: &Project,
    shell: ShellType,
) -> Option<&'a Pane> {
    for entry in registry.get_project_panes(&project.name, shell) {
        let pane = match panes.get(&entry.target) {
            Some(p) => p,
            None => continue,
        };
        if pane.worktree.is_some() {
            continue;
        }
        if !pane.current_path.starts_with(&project.path) {
            continue;
        }
        return Some(pane);
    }

    // Fallback: the registry may be empty or entirely stale.
    panes.values().find(|p| {
        p.shell_type == shell && p.current_path == project.path && p.worktree.is_none()
    })
}

/// Find the best pane for `(project, worktree, shell)`.
///
/// Uses the same registry entries but filters to panes inside the given
/// worktree, preferring the most recently active.
pub fn find_worktree_pane<'a>(
    registry: &PaneRegistry,
    panes: &'a HashMap<String, Pane>,
    project: &Project,
    worktree: &Worktree,
    shell: ShellType,
) -> Option<&'a Pane> {
    let mut candidates: Vec<&Pane> = registry
        .get_project_panes(&project.name, shell)
        .iter()
        .filter_map(|entry| panes.get(&entry.target))
        .filter(|p| p.worktree.as_deref() == Some(worktree.id.as_str()))
        .collect();

    candidates.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
    candidates.first().copied()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryEntry;
    use chrono::{Duration, Utc};
    use std::path::PathBuf;

    fn pane(target_session: &str, window: usize, index: usize, path: &str) -> Pane {
        Pane {
            session_name: target_session.to_string(),
            window_index: window,
            pane_index: index,
            pane_title: String::new(),
            last_command: String::new(),
            current_command: "zsh".to_string(),
            current_path: PathBuf::from(path),
            pane_tty: String::new(),
            shell_type: ShellType::Zsh,
            active: false,
            created_at: Utc::now(),
            last_activity: Utc::now(),
            project: Some("proj".to_string()),
            worktree: None,
        }
    }

    fn register(registry: &mut PaneRegistry, pane: &Pane) {
        registry.insert(RegistryEntry {
            target: pane.target(),
            original_project: pane.project.clone().unwrap(),
            original_path: pane.current_path.clone(),
            first_seen: pane.created_at,
            last_active: pane.last_activity,
            shell_type: pane.shell_type,
        });
    }

    #[test]
    fn test_registry_hit_wins() {
        let project = Project::new("proj", "/home/u/proj");
        let p = pane("dev", 0, 0, "/home/u/proj/src");

        let mut registry = PaneRegistry::new();
        register(&mut registry, &p);
        let mut panes = HashMap::new();
        panes.insert(p.target(), p);

        let hit = find_project_pane(&registry, &panes, &project, ShellType::Zsh).unwrap();
        assert_eq!(hit.target(), "dev:0.0");
    }

    #[test]
    fn test_stale_registry_entry_is_skipped() {
        let project = Project::new("proj", "/home/u/proj");

        // Registered for proj but the user has since cd'd to /tmp.
        let mut strayed = pane("dev", 0, 0, "/tmp");
        strayed.last_activity = Utc::now();
        let mut registry = PaneRegistry::new();
        register(&mut registry, &strayed);

        // A different live pane still sits at the project root.
        let settled = pane("dev", 1, 0, "/home/u/proj");

        let mut panes = HashMap::new();
        panes.insert(strayed.target(), strayed);
        panes.insert(settled.target(), settled);

        let hit = find_project_pane(&registry, &panes, &project, ShellType::Zsh).unwrap();
        assert_eq!(hit.target(), "dev:1.0");
    }

    #[test]
    fn test_worktree_panes_excluded_from_project_search() {
        let project = Project::new("proj", "/home/u/proj");

        let mut wt_pane = pane("dev", 0, 0, "/home/u/proj/.worktrees/a");
        wt_pane.worktree = Some("wt-a".to_string());
        let mut registry = PaneRegistry::new();
        register(&mut registry, &wt_pane);

        let mut panes = HashMap::new();
        panes.insert(wt_pane.target(), wt_pane);

        assert!(find_project_pane(&registry, &panes, &project, ShellType::Zsh).is_none());
    }

    #[test]
    fn test_dead_registry_target_falls_through() {
        let project = Project::new("proj", "/home/u/proj");
        let dead = pane("dev", 0, 0, "/home/u/proj");
        let mut registry = PaneRegistry::new();
        register(&mut registry, &dead);

        // The live map no longer holds the registered target.
        let panes = HashMap::new();
        assert!(find_project_pane(&registry, &panes, &project, ShellType::Zsh).is_none());
    }

    #[test]
    fn test_worktree_pane_most_recent_wins() {
        let project = Project::new("proj", "/home/u/proj");
        let worktree = Worktree {
            id: "wt-a".to_string(),
            path: PathBuf::from("/home/u/proj/.worktrees/a"),
        };

        let mut older = pane("dev", 0, 0, "/home/u/proj/.worktrees/a");
        older.worktree = Some("wt-a".to_string());
        older.last_activity = Utc::now() - Duration::seconds(300);

        let mut newer = pane("dev", 0, 1, "/home/u/proj/.worktrees/a");
        newer.worktree = Some("wt-a".to_string());
        newer.last_activity = Utc::now();

        let mut registry = PaneRegistry::new();
        register(&mut registry, &older);
        register(&mut registry, &newer);

        let mut panes = HashMap::new();
        panes.insert(older.target(), older);
        panes.insert(newer.target(), newer);

        let hit =
            find_worktree_pane(&registry, &panes, &project, &worktree, ShellType::Zsh).unwrap();
        assert_eq!(hit.target(), "dev:0.1");
    }
}
