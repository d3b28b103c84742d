//! The tmux orchestrator.
//!
//! `TmuxManager` holds the canonical pane map, session map, and pane
//! registry behind one read-write lock, and exposes the high-level
//! operations the UI calls: discovery, project mapping, pane finding,
//! window creation, layout application, navigation helpers, and key
//! bindings.
//!
//! Locking discipline: executor calls block on a subprocess and are never
//! made while holding the write lock. Discovery reads the prior state
//! under a read lock, does its parsing and classification unlocked, then
//! takes the write lock only to commit. The registry rewrite during a
//! remap is a single atomic section under that write lock.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::discovery;
use crate::error::{Error, Result};
use crate::executor::TmuxExecutor;
use crate::finder;
use crate::layout::{LayoutMode, LayoutOperator};
use crate::pane::{Pane, ShellType, TtyInspector};
use crate::project::{match_project, match_worktree, Project, ProjectShell, Worktree};
use crate::registry::PaneRegistry;
use crate::session::{TmuxSession, TmuxWindow};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Pane fields carried across a map rebuild.
struct PriorPane {
    project: Option<String>,
    worktree: Option<String>,
    shell_type: ShellType,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
    last_command: String,
    current_command: String,
}

#[derive(Default)]
struct ManagerState {
    panes: HashMap<String, Pane>,
    sessions: HashMap<String, TmuxSession>,
    registry: PaneRegistry,
    /// Raw `list-panes` output from the previous discovery, for the
    /// change-detection short-circuit.
    last_panes_raw: Option<Vec<u8>>,
    last_sessions_raw: Option<Vec<u8>>,
    /// Requested window name -> actual window name, per session.
    window_cache: HashMap<(String, String), String>,
}

// ---------------------------------------------------------------------------
// TmuxManager
// ---------------------------------------------------------------------------

pub struct TmuxManager {
    executor: Arc<dyn TmuxExecutor>,
    inspector: Arc<dyn TtyInspector>,
    state: RwLock<ManagerState>,
    verbose: bool,
}

impl TmuxManager {
    pub fn new(executor: Arc<dyn TmuxExecutor>, inspector: Arc<dyn TtyInspector>) -> Self {
        Self {
            executor,
            inspector,
            state: RwLock::new(ManagerState::default()),
            verbose: false,
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn warn(&self, message: &str) {
        if self.verbose {
            eprintln!("ccmux: warning: {}", message);
        }
    }

    // -- Discovery ----------------------------------------------------------

    /// Inventory all panes of the running tmux server.
    ///
    /// Returns `true` when the pane map was rebuilt, `false` when the raw
    /// output was byte-identical to the previous pass (no parsing, no
    /// remap) or when tmux was unreachable (stale view kept).
    pub fn discover_all_panes(&self) -> Result<bool> {
        let raw = match discovery::list_panes_raw(self.executor.as_ref()) {
            Ok(raw) => raw,
            Err(e) => {
                self.warn(&format!("pane discovery failed: {}", e));
                return Ok(false);
            }
        };

        let prior: HashMap<String, PriorPane> = {
            let state = self.state.read().unwrap();
            if state.last_panes_raw.as_deref() == Some(raw.as_slice()) {
                return Ok(false);
            }
            state
                .panes
                .iter()
                .map(|(target, pane)| {
                    (
                        target.clone(),
                        PriorPane {
                            project: pane.project.clone(),
                            worktree: pane.worktree.clone(),
                            shell_type: pane.shell_type,
                            created_at: pane.created_at,
                            last_activity: pane.last_activity,
                            last_command: pane.last_command.clone(),
                            current_command: pane.current_command.clone(),
                        },
                    )
                })
                .collect()
        };

        let text = String::from_utf8_lossy(&raw).to_string();
        let parsed = discovery::parse_pane_lines(&text, self.verbose);

        // Build the new map unlocked: classification may shell out to ps.
        let now = Utc::now();
        let mut panes: HashMap<String, Pane> = HashMap::with_capacity(parsed.len());
        for entry in parsed {
            let mut pane = Pane {
                session_name: entry.session_name,
                window_index: entry.window_index,
                pane_index: entry.pane_index,
                pane_title: entry.pane_title,
                last_command: String::new(),
                current_command: entry.current_command,
                current_path: entry.current_path,
                pane_tty: entry.pane_tty,
                shell_type: ShellType::Unknown,
                active: entry.active,
                created_at: now,
                last_activity: now,
                project: None,
                worktree: None,
            };

            if let Some(prev) = prior.get(&pane.target()) {
                pane.project = prev.project.clone();
                pane.worktree = prev.worktree.clone();
                pane.shell_type = prev.shell_type;
                pane.created_at = prev.created_at;
                if prev.current_command != pane.current_command {
                    pane.last_command = prev.current_command.clone();
                } else {
                    pane.last_command = prev.last_command.clone();
                }
                if !pane.active {
                    pane.last_activity = prev.last_activity;
                }
            }

            pane.classify_shell(self.inspector.as_ref());
            panes.insert(pane.target(), pane);
        }

        let mut state = self.state.write().unwrap();
        state.panes = panes;
        state.last_panes_raw = Some(raw);
        Ok(true)
    }

    /// Enumerate tmux sessions and their windows.
    ///
    /// After every pass the current session (as tmux reports it) appears
    /// in the session map and is flagged active.
    pub fn discover_existing_sessions(&self) -> Result<bool> {
        let raw = match discovery::list_sessions_raw(self.executor.as_ref()) {
            Ok(raw) => raw,
            Err(e) => {
                self.warn(&format!("session discovery failed: {}", e));
                return Ok(false);
            }
        };
        let current = self.current_session_name().ok();

        let unchanged = {
            let state = self.state.read().unwrap();
            state.last_sessions_raw.as_deref() == Some(raw.as_slice())
        };
        if unchanged {
            // Only the active flag can drift without the listing changing.
            let mut state = self.state.write().unwrap();
            Self::mark_active_session(&mut state.sessions, current.as_deref());
            return Ok(false);
        }

        let text = String::from_utf8_lossy(&raw).to_string();
        let listed = discovery::parse_session_lines(&text);

        // Window listings happen unlocked, one executor call per session.
        let mut windows_by_session: HashMap<String, Vec<discovery::ParsedWindow>> =
            HashMap::new();
        for (name, _path) in &listed {
            match self
                .executor
                .execute(&["list-windows", "-t", name, "-F", discovery::WINDOW_FORMAT])
            {
                Ok(output) => {
                    let parsed =
                        discovery::parse_window_lines(&String::from_utf8_lossy(&output));
                    windows_by_session.insert(name.clone(), parsed);
                }
                Err(e) => {
                    self.warn(&format!("window listing failed for {}: {}", name, e));
                }
            }
        }

        let mut state = self.state.write().unwrap();
        let mut sessions: HashMap<String, TmuxSession> = HashMap::new();
        for (name, _path) in &listed {
            let mut session = state
                .sessions
                .remove(name)
                .unwrap_or_else(|| TmuxSession::new(name));

            if let Some(parsed) = windows_by_session.remove(name) {
                let mut windows = HashMap::new();
                for w in parsed {
                    let worktree_id = session
                        .windows
                        .get(&w.name)
                        .and_then(|prev| prev.worktree_id.clone());
                    windows.insert(
                        w.name.clone(),
                        TmuxWindow {
                            index: w.index,
                            name: w.name,
                            command: w.command,
                            pane_title: w.pane_title,
                            worktree_id,
                            active: w.active,
                        },
                    );
                }
                session.windows = windows;
            }
            sessions.insert(name.clone(), session);
        }

        // The current session must appear even if the listing raced.
        if let Some(ref name) = current {
            sessions
                .entry(name.clone())
                .or_insert_with(|| TmuxSession::new(name));
        }
        Self::mark_active_session(&mut sessions, current.as_deref());

        state.sessions = sessions;
        state.last_sessions_raw = Some(raw);
        Ok(true)
    }

    fn mark_active_session(sessions: &mut HashMap<String, TmuxSession>, current: Option<&str>) {
        for (name, session) in sessions.iter_mut() {
            session.active = Some(name.as_str()) == current;
        }
    }

    /// The session the user's client is currently on.
    pub fn current_session_name(&self) -> Result<String> {
        let output = self
            .executor
            .execute(&["display-message", "-p", "#{session_name}"])?;
        let name = String::from_utf8_lossy(&output).trim().to_string();
        if name.is_empty() {
            return Err(Error::SessionNotFound("(current)".to_string()));
        }
        Ok(name)
    }

    // -- Project mapping ----------------------------------------------------

    /// Associate panes and sessions with the host-supplied project list,
    /// attach shell roll-ups to the projects, and rewrite the registry.
    ///
    /// Panes matching no project land on the synthetic "Other Sessions"
    /// project, which is appended to the list when absent.
    pub fn map_sessions_to_projects(&self, projects: &mut Vec<Project>) -> Result<()> {
        if !projects.iter().any(|p| p.is_other_sessions()) {
            projects.push(Project::other_sessions());
        }

        // Snapshot what we need, then release the lock before any executor
        // call.
        let (pane_paths, session_names): (Vec<(String, PathBuf)>, Vec<String>) = {
            let state = self.state.read().unwrap();
            (
                state
                    .panes
                    .iter()
                    .map(|(t, p)| (t.clone(), p.current_path.clone()))
                    .collect(),
                state.sessions.keys().cloned().collect(),
            )
        };

        // Pane -> (project, worktree) by longest path prefix.
        let mut pane_assoc: HashMap<String, (Option<String>, Option<String>)> = HashMap::new();
        for (target, path) in &pane_paths {
            match match_project(projects, path) {
                Some(project) => {
                    let worktree = match_worktree(project, path).map(|w| w.id.clone());
                    pane_assoc.insert(
                        target.clone(),
                        (Some(project.name.clone()), worktree),
                    );
                }
                None => {
                    pane_assoc.insert(
                        target.clone(),
                        (Some(Project::other_sessions().name), None),
                    );
                }
            }
        }

        // Session -> project via the session's first pane cwd.
        let mut session_assoc: HashMap<String, Option<String>> = HashMap::new();
        for name in &session_names {
            let cwd = self
                .executor
                .execute(&["display-message", "-t", name, "-p", "#{pane_current_path}"])
                .map(|out| PathBuf::from(String::from_utf8_lossy(&out).trim()))
                .ok();
            let project = cwd
                .as_deref()
                .and_then(|p| match_project(projects, p))
                .map(|p| p.name.clone());
            session_assoc.insert(name.clone(), project);
        }

        // Commit associations and rewrite the registry atomically.
        let shells_by_project: HashMap<String, HashMap<String, ProjectShell>>;
        {
            let mut state = self.state.write().unwrap();
            for (target, (project, worktree)) in &pane_assoc {
                if let Some(pane) = state.panes.get_mut(target) {
                    pane.project = project.clone();
                    pane.worktree = worktree.clone();
                }
            }
            for (name, project) in &session_assoc {
                if let Some(session) = state.sessions.get_mut(name) {
                    if session.project.is_none() {
                        session.project = project.clone();
                    }
                }
            }

            shells_by_project = Self::roll_up_shells(&state.panes, &state.sessions);

            let state = &mut *state;
            state.registry.rebuild(state.panes.values());
        }

        for project in projects.iter_mut() {
            if let Some(shells) = shells_by_project.get(&project.name) {
                project.shells = shells.clone();
            } else {
                project.shells.clear();
            }
        }

        Ok(())
    }

    /// Shell roll-up per project: keyed by shell-type name, except the
    /// "Other Sessions" project where each window is its own shell keyed
    /// `"<session>:<window>"`.
    fn roll_up_shells(
        panes: &HashMap<String, Pane>,
        sessions: &HashMap<String, TmuxSession>,
    ) -> HashMap<String, HashMap<String, ProjectShell>> {
        let other = Project::other_sessions().name;
        let mut result: HashMap<String, HashMap<String, ProjectShell>> = HashMap::new();

        for pane in panes.values() {
            let project = match &pane.project {
                Some(p) => p.clone(),
                None => continue,
            };
            let key = if project == other {
                let window_name = sessions
                    .get(&pane.session_name)
                    .and_then(|s| {
                        s.windows
                            .values()
                            .find(|w| w.index == pane.window_index)
                            .map(|w| w.name.clone())
                    })
                    .unwrap_or_else(|| pane.window_index.to_string());
                format!("{}:{}", pane.session_name, window_name)
            } else {
                pane.shell_type.as_str().to_string()
            };

            result.entry(project).or_default().insert(
                key,
                ProjectShell {
                    shell_type: pane.shell_type,
                    session: pane.session_name.clone(),
                    window_index: pane.window_index,
                },
            );
        }

        result
    }

    // -- Finder delegation --------------------------------------------------

    /// Best pane for `(project, shell)`, cloned out of the map.
    pub fn find_project_pane(&self, project: &Project, shell: ShellType) -> Option<Pane> {
        let state = self.state.read().unwrap();
        finder::find_project_pane(&state.registry, &state.panes, project, shell).cloned()
    }

    /// Best pane for `(project, worktree, shell)`.
    pub fn find_worktree_pane(
        &self,
        project: &Project,
        worktree: &Worktree,
        shell: ShellType,
    ) -> Option<Pane> {
        let state = self.state.read().unwrap();
        finder::find_worktree_pane(&state.registry, &state.panes, project, worktree, shell)
            .cloned()
    }

    // -- Session / window operations -----------------------------------------

    /// Associate the *current* tmux session with a project.
    ///
    /// No session is created: multiple projects intentionally share one
    /// session, and only the first sighting wins the association (a later
    /// project on the same session would otherwise confuse navigation).
    pub fn create_project_session(&self, project: &Project) -> Result<TmuxSession> {
        let name = self.current_session_name()?;
        let mut state = self.state.write().unwrap();
        let session = state
            .sessions
            .entry(name.clone())
            .or_insert_with(|| TmuxSession::new(&name));
        session.active = true;
        if session.project.is_none() {
            session.project = Some(project.name.clone());
        }
        Ok(session.clone())
    }

    /// Whether tmux knows a session by this name.
    pub fn has_session(&self, name: &str) -> bool {
        self.executor.run(&["has-session", "-t", name]).is_ok()
    }

    /// Create a detached session rooted at `dir` unless one already
    /// exists. Returns `true` when a session was created.
    pub fn ensure_session(&self, name: &str, dir: &Path) -> Result<bool> {
        if self.has_session(name) {
            return Ok(false);
        }
        let dir = dir.to_string_lossy().to_string();
        self.executor
            .run(&["new-session", "-d", "-s", name, "-c", &dir])?;
        Ok(true)
    }

    /// Route the user to a pane from the live map by target string.
    pub fn attach_pane(&self, navigator: &crate::navigator::Navigator, target: &str) -> Result<()> {
        let pane = self
            .pane(target)
            .ok_or_else(|| Error::PaneNotFound(target.to_string()))?;
        navigator.attach_to_pane(
            self.executor.as_ref(),
            &pane.session_name,
            pane.window_index,
            pane.pane_index,
        )
    }

    /// Find-or-create a window in `session`.
    ///
    /// Reuse order: (1) a live window whose first pane sits under the
    /// target path and whose name carries the requested window type,
    /// (2) the local cache (dropped when the cached window is gone from
    /// live tmux), (3) `new-window`. A `claude` command in a directory
    /// with a `flake.nix` is wrapped as `nix develop --command claude -c`.
    pub fn create_or_get_window(
        &self,
        session: &str,
        name: &str,
        command: &str,
        worktree: Option<&Worktree>,
        project: Option<&Project>,
    ) -> Result<(TmuxWindow, bool)> {
        if !self.has_session(session) {
            return Err(Error::SessionNotFound(session.to_string()));
        }

        let target_path: Option<PathBuf> = worktree
            .map(|w| w.path.clone())
            .or_else(|| project.map(|p| p.path.clone()));
        let window_type = name.rsplit(':').next().unwrap_or(name);

        let output = self.executor.execute(&[
            "list-windows",
            "-t",
            session,
            "-F",
            discovery::WINDOW_FORMAT,
        ])?;
        let live = discovery::parse_window_lines(&String::from_utf8_lossy(&output));

        // 1. Reuse by path + window type.
        if let Some(ref wanted) = target_path {
            for window in &live {
                if !window.name.contains(window_type) {
                    continue;
                }
                let window_target = format!("{}:{}", session, window.index);
                let paths = match self.executor.execute(&[
                    "list-panes",
                    "-t",
                    &window_target,
                    "-F",
                    "#{pane_current_path}",
                ]) {
                    Ok(o) => o,
                    Err(_) => continue,
                };
                let first = String::from_utf8_lossy(&paths)
                    .lines()
                    .next()
                    .unwrap_or("")
                    .trim()
                    .to_string();
                if !first.is_empty() && Path::new(&first).starts_with(wanted) {
                    self.state.write().unwrap().window_cache.insert(
                        (session.to_string(), name.to_string()),
                        window.name.clone(),
                    );
                    return Ok((
                        Self::window_record(window, worktree),
                        false,
                    ));
                }
            }
        }

        // 2. The cache, validated against live state.
        let cache_key = (session.to_string(), name.to_string());
        let cached = {
            let state = self.state.read().unwrap();
            state.window_cache.get(&cache_key).cloned()
        };
        if let Some(cached_name) = cached {
            if let Some(window) = live.iter().find(|w| w.name == cached_name) {
                return Ok((Self::window_record(window, worktree), false));
            }
            self.state.write().unwrap().window_cache.remove(&cache_key);
        }

        // 3. Create.
        let workdir = target_path.unwrap_or_else(|| PathBuf::from("."));
        let full_command = if command == "claude" && workdir.join("flake.nix").exists() {
            "nix develop --command claude -c".to_string()
        } else {
            command.to_string()
        };
        let workdir_str = workdir.to_string_lossy().to_string();
        let mut args: Vec<&str> = vec!["new-window", "-t", session, "-n", name, "-c", &workdir_str];
        if !full_command.is_empty() {
            args.push(&full_command);
        }
        self.executor.run(&args)?;

        self.state
            .write()
            .unwrap()
            .window_cache
            .insert(cache_key, name.to_string());

        // Resolve the index of the window we just created.
        let index = self
            .executor
            .execute(&[
                "list-windows",
                "-t",
                session,
                "-F",
                discovery::WINDOW_FORMAT,
            ])
            .ok()
            .map(|o| discovery::parse_window_lines(&String::from_utf8_lossy(&o)))
            .and_then(|ws| ws.iter().find(|w| w.name == name).map(|w| w.index))
            .unwrap_or(0);

        Ok((
            TmuxWindow {
                index,
                name: name.to_string(),
                command: full_command,
                pane_title: String::new(),
                worktree_id: worktree.map(|w| w.id.clone()),
                active: false,
            },
            true,
        ))
    }

    fn window_record(window: &discovery::ParsedWindow, worktree: Option<&Worktree>) -> TmuxWindow {
        TmuxWindow {
            index: window.index,
            name: window.name.clone(),
            command: window.command.clone(),
            pane_title: window.pane_title.clone(),
            worktree_id: worktree.map(|w| w.id.clone()),
            active: window.active,
        }
    }

    /// Locate or create the window a project's shell should live in.
    ///
    /// Grouped mode reuses a window only when every pane in it sits at the
    /// project path; unsplit mode always creates a fresh
    /// `"<project>:<shell>"` window.
    pub fn ensure_project_window(
        &self,
        project: &Project,
        shell: ShellType,
        mode: LayoutMode,
    ) -> Result<(TmuxWindow, bool)> {
        if mode == LayoutMode::Grouped {
            let found = {
                let state = self.state.read().unwrap();
                let mut by_window: HashMap<(String, usize), Vec<&Pane>> = HashMap::new();
                for pane in state.panes.values() {
                    by_window
                        .entry((pane.session_name.clone(), pane.window_index))
                        .or_default()
                        .push(pane);
                }
                by_window
                    .into_iter()
                    .find(|(_, panes)| {
                        !panes.is_empty()
                            && panes.iter().all(|p| p.current_path == project.path)
                    })
                    .map(|((session, index), _)| (session, index))
            };
            if let Some((session, index)) = found {
                let name = {
                    let state = self.state.read().unwrap();
                    state
                        .sessions
                        .get(&session)
                        .and_then(|s| s.windows.values().find(|w| w.index == index))
                        .map(|w| w.name.clone())
                        .unwrap_or_else(|| project.name.clone())
                };
                return Ok((
                    TmuxWindow {
                        index,
                        name,
                        command: String::new(),
                        pane_title: String::new(),
                        worktree_id: None,
                        active: false,
                    },
                    false,
                ));
            }

            let session = self.current_session_name()?;
            return self.create_or_get_window(&session, &project.name, "", None, Some(project));
        }

        // Unsplit: always a fresh window, no reuse.
        let session = self.current_session_name()?;
        let name = format!("{}:{}", project.name, shell);
        let workdir = project.path.to_string_lossy().to_string();
        self.executor
            .run(&["new-window", "-t", &session, "-n", &name, "-c", &workdir])?;
        Ok((
            TmuxWindow {
                index: 0,
                name,
                command: String::new(),
                pane_title: String::new(),
                worktree_id: None,
                active: false,
            },
            true,
        ))
    }

    // -- Layout --------------------------------------------------------------

    pub fn apply_unsplit_layout(&self) -> Result<()> {
        let snapshot = self.ordered_panes();
        LayoutOperator::new(self.executor.as_ref()).apply_unsplit(&snapshot)?;
        self.invalidate_pane_cache();
        Ok(())
    }

    pub fn apply_grouped_layout(&self) -> Result<()> {
        let snapshot = self.ordered_panes();
        LayoutOperator::new(self.executor.as_ref()).apply_grouped(&snapshot)?;
        self.invalidate_pane_cache();
        Ok(())
    }

    /// Pane snapshot in stable (session, window, pane) order, so layout
    /// operations are deterministic.
    fn ordered_panes(&self) -> Vec<Pane> {
        let mut panes = self.panes();
        panes.sort_by(|a, b| {
            (a.session_name.as_str(), a.window_index, a.pane_index).cmp(&(
                b.session_name.as_str(),
                b.window_index,
                b.pane_index,
            ))
        });
        panes
    }

    /// Layout operations rearrange tmux behind the cache's back; force a
    /// full parse on the next discovery.
    fn invalidate_pane_cache(&self) {
        self.state.write().unwrap().last_panes_raw = None;
    }

    // -- Key bindings and raw keys -------------------------------------------

    /// Install the global navigation bindings. The bound script's behavior
    /// is the script's concern.
    pub fn install_global_bindings(&self, nav_script: &Path, screenshot_cmd: &str) -> Result<()> {
        let script = nav_script.to_string_lossy().to_string();
        self.executor
            .run(&["bind-key", "-T", "root", "C-Space", "run-shell", &script])?;
        self.executor
            .run(&["bind-key", "-T", "root", "C-S", "run-shell", screenshot_cmd])?;
        self.executor
            .run(&["bind-key", "-T", "prefix", "t", "run-shell", &script])?;
        Ok(())
    }

    /// Install the per-session prefix bindings, passing the key through to
    /// the navigation script.
    pub fn install_session_bindings(&self, nav_script: &Path) -> Result<()> {
        let script = nav_script.to_string_lossy();
        for key in ["C-n", "C-c", "C-r", "C-h", "C-l"] {
            let command = format!("{} {}", script, key);
            self.executor
                .run(&["bind-key", "-T", "prefix", key, "run-shell", &command])?;
        }
        Ok(())
    }

    /// Type a command into a window and press Enter.
    pub fn send_keys(&self, target: &str, command: &str) -> Result<()> {
        self.executor
            .run(&["send-keys", "-t", target, command, "Enter"])
    }

    /// Kill a tmux session by name.
    pub fn kill_session(&self, name: &str) -> Result<()> {
        if !self.has_session(name) {
            return Err(Error::SessionNotFound(name.to_string()));
        }
        self.executor.run(&["kill-session", "-t", name])
    }

    // -- Accessors -----------------------------------------------------------

    /// Snapshot of all panes.
    pub fn panes(&self) -> Vec<Pane> {
        self.state.read().unwrap().panes.values().cloned().collect()
    }

    /// Snapshot of the pane map keyed by target.
    pub fn pane_map(&self) -> HashMap<String, Pane> {
        self.state.read().unwrap().panes.clone()
    }

    /// One pane by target.
    pub fn pane(&self, target: &str) -> Option<Pane> {
        self.state.read().unwrap().panes.get(target).cloned()
    }

    /// Snapshot of all sessions.
    pub fn sessions(&self) -> Vec<TmuxSession> {
        self.state
            .read()
            .unwrap()
            .sessions
            .values()
            .cloned()
            .collect()
    }

    /// One session by name.
    pub fn session(&self, name: &str) -> Option<TmuxSession> {
        self.state.read().unwrap().sessions.get(name).cloned()
    }

    /// Targets of all tracked panes, for the activity monitor.
    pub fn pane_targets(&self) -> Vec<String> {
        self.state.read().unwrap().panes.keys().cloned().collect()
    }

    /// Number of registry entries (test probe).
    pub fn registry_len(&self) -> usize {
        self.state.read().unwrap().registry.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
