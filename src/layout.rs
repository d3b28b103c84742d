//! Pane reorganization: per-shell windows or per-project grouped windows.
//!
//! Two modes operate on a discovery snapshot:
//! - **Unsplit**: every pane becomes its own window named
//!   `"<project>:<shell>"`. Panes alone in their window are renamed in
//!   place; the rest are split out with `break-pane`.
//! - **Grouped**: panes sharing a project are consolidated into one window
//!   named `"<project>"` via `rename-window` + `join-pane`, finished with
//!   an `even-horizontal` layout.
//!
//! Index-based targets go stale the moment panes start moving, so each
//! source pane is resolved to its immutable `%id` up front. Windows left
//! empty by either operation are killed afterwards.

use std::collections::HashMap;

use crate::error::Result;
use crate::executor::TmuxExecutor;
use crate::pane::{Pane, ShellType};
use crate::project::{derive_group_key, OTHER_SESSIONS};

// ---------------------------------------------------------------------------
// LayoutMode
// ---------------------------------------------------------------------------

/// The two supported reorganization modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutMode {
    Unsplit,
    Grouped,
}

// ---------------------------------------------------------------------------
// Plan records
// ---------------------------------------------------------------------------

/// A snapshot pane enriched with its immutable tmux pane id.
#[derive(Debug, Clone)]
struct PanePlan {
    session: String,
    window_index: usize,
    pane_index: usize,
    pane_id: String,
    group: String,
    shell: ShellType,
}

// ---------------------------------------------------------------------------
// LayoutOperator
// ---------------------------------------------------------------------------

pub struct LayoutOperator<'a> {
    executor: &'a dyn TmuxExecutor,
}

impl<'a> LayoutOperator<'a> {
    pub fn new(executor: &'a dyn TmuxExecutor) -> Self {
        Self { executor }
    }

    /// Every pane gets its own window named `"<group>:<shell>"`.
    pub fn apply_unsplit(&self, panes: &[Pane]) -> Result<()> {
        let plans = self.resolve_plans(panes)?;

        let mut occupancy: HashMap<(String, usize), usize> = HashMap::new();
        for plan in &plans {
            *occupancy
                .entry((plan.session.clone(), plan.window_index))
                .or_insert(0) += 1;
        }

        for plan in &plans {
            let name = format!("{}:{}", plan.group, plan.shell);
            let key = (plan.session.clone(), plan.window_index);
            let crowded = occupancy.get(&key).copied().unwrap_or(1) > 1;
            if crowded {
                self.executor
                    .run(&["break-pane", "-s", &plan.pane_id, "-n", &name, "-d"])?;
                if let Some(count) = occupancy.get_mut(&key) {
                    *count -= 1;
                }
            } else {
                // Sole remaining pane: renaming the window suffices.
                let window_target = format!("{}:{}", plan.session, plan.window_index);
                self.executor
                    .run(&["rename-window", "-t", &window_target, &name])?;
            }
        }

        self.remove_empty_windows(&plans)
    }

    /// Panes sharing a project are consolidated into one window per project.
    pub fn apply_grouped(&self, panes: &[Pane]) -> Result<()> {
        let plans = self.resolve_plans(panes)?;

        // Group membership in first-seen order.
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<&PanePlan>> = HashMap::new();
        for plan in &plans {
            if !groups.contains_key(&plan.group) {
                order.push(plan.group.clone());
            }
            groups.entry(plan.group.clone()).or_default().push(plan);
        }

        // Which groups still occupy each window, updated as panes move.
        let mut remaining: HashMap<(String, usize), Vec<String>> = HashMap::new();
        for plan in &plans {
            remaining
                .entry((plan.session.clone(), plan.window_index))
                .or_default()
                .push(plan.group.clone());
        }

        for group in &order {
            let members = &groups[group];
            let anchor = members[0];
            let anchor_key = (anchor.session.clone(), anchor.window_index);
            let homogeneous = remaining
                .get(&anchor_key)
                .map(|gs| gs.iter().all(|g| g == group))
                .unwrap_or(false);

            let anchor_target = format!("{}:{}", anchor.session, group);
            if homogeneous {
                let window_target = format!("{}:{}", anchor.session, anchor.window_index);
                self.executor
                    .run(&["rename-window", "-t", &window_target, group])?;
            } else {
                self.executor
                    .run(&["break-pane", "-s", &anchor.pane_id, "-n", group, "-d"])?;
                if let Some(gs) = remaining.get_mut(&anchor_key) {
                    remove_one(gs, group);
                }
            }

            for member in &members[1..] {
                let member_key = (member.session.clone(), member.window_index);
                if homogeneous && member_key == anchor_key {
                    continue;
                }
                self.executor.run(&[
                    "join-pane",
                    "-s",
                    &member.pane_id,
                    "-t",
                    &anchor_target,
                    "-h",
                    "-d",
                ])?;
                if let Some(gs) = remaining.get_mut(&member_key) {
                    remove_one(gs, group);
                }
            }

            if members.len() > 1 {
                self.executor
                    .run(&["select-layout", "-t", &anchor_target, "even-horizontal"])?;
            }
        }

        self.remove_empty_windows(&plans)
    }

    /// Resolve each snapshot pane to its `%id` via per-window listings.
    ///
    /// tmux lists panes in index order, so the id lines are zipped against
    /// the snapshot panes sorted the same way. A pane whose id cannot be
    /// resolved falls back to its index target.
    fn resolve_plans(&self, panes: &[Pane]) -> Result<Vec<PanePlan>> {
        let mut by_window: HashMap<(String, usize), Vec<&Pane>> = HashMap::new();
        for pane in panes {
            by_window
                .entry((pane.session_name.clone(), pane.window_index))
                .or_default()
                .push(pane);
        }

        let mut ids: HashMap<String, String> = HashMap::new();
        let mut windows: Vec<&(String, usize)> = by_window.keys().collect();
        windows.sort();
        for (session, window_index) in windows {
            let window_target = format!("{}:{}", session, window_index);
            let output = self
                .executor
                .execute(&["list-panes", "-t", &window_target, "-F", "#{pane_id}"])?;
            let id_lines: Vec<String> = String::from_utf8_lossy(&output)
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();

            let mut members = by_window[&(session.clone(), *window_index)].clone();
            members.sort_by_key(|p| p.pane_index);
            for (pane, id) in members.iter().zip(id_lines.iter()) {
                ids.insert(pane.target(), id.clone());
            }
        }

        Ok(panes
            .iter()
            .map(|pane| PanePlan {
                session: pane.session_name.clone(),
                window_index: pane.window_index,
                pane_index: pane.pane_index,
                pane_id: ids.get(&pane.target()).cloned().unwrap_or(pane.target()),
                group: group_key_for(pane),
                shell: pane.shell_type,
            })
            .collect())
    }

    /// Kill any window in the touched sessions that no longer holds panes.
    ///
    /// Best effort: listing failures mean the window already disappeared.
    fn remove_empty_windows(&self, plans: &[PanePlan]) -> Result<()> {
        let mut sessions: Vec<&str> = plans.iter().map(|p| p.session.as_str()).collect();
        sessions.sort();
        sessions.dedup();

        for session in sessions {
            let output = match self
                .executor
                .execute(&["list-windows", "-t", session, "-F", "#{window_index}"])
            {
                Ok(o) => o,
                Err(_) => continue,
            };
            for line in String::from_utf8_lossy(&output).lines() {
                let index = line.trim();
                if index.is_empty() {
                    continue;
                }
                let window_target = format!("{}:{}", session, index);
                let panes = match self.executor.execute(&[
                    "list-panes",
                    "-t",
                    &window_target,
                    "-F",
                    "#{pane_id}",
                ]) {
                    Ok(o) => o,
                    Err(_) => continue,
                };
                if String::from_utf8_lossy(&panes).trim().is_empty() {
                    let _ = self.executor.run(&["kill-window", "-t", &window_target]);
                }
            }
        }
        Ok(())
    }
}

/// Window-group key for a pane: its project, or a path-derived fallback.
fn group_key_for(pane: &Pane) -> String {
    match &pane.project {
        Some(name) if name != OTHER_SESSIONS => name.clone(),
        _ => derive_group_key(&pane.current_path),
    }
}

fn remove_one(groups: &mut Vec<String>, group: &str) {
    if let Some(pos) = groups.iter().position(|g| g == group) {
        groups.remove(pos);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
