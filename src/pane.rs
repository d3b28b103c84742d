//! Pane entity and shell-type classification.
//!
//! A `Pane` is the data record for a single tmux pane: identity
//! (`session:window.pane`), title, commands, cwd, tty device, and the
//! semantic role it currently plays (`ShellType`). Classification follows
//! an ordered procedure; once a pane is classified as `claude` it stays
//! `claude` even if the title or command changes (the assistant process
//! keeps running behind whatever tmux reports).

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// ShellType
// ---------------------------------------------------------------------------

/// The semantic role a pane currently plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ShellType {
    Zsh,
    Claude,
    Nvim,
    #[default]
    Unknown,
}

impl ShellType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShellType::Zsh => "zsh",
            ShellType::Claude => "claude",
            ShellType::Nvim => "nvim",
            ShellType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ShellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ---------------------------------------------------------------------------
// TtyInspector
// ---------------------------------------------------------------------------

/// Enumerates the commands running on a tty device.
///
/// The production implementation shells out to `ps`; tests supply a
/// `StaticInspector` with canned process tables. Selection happens at
/// construction time, never via a test flag in production code.
pub trait TtyInspector: Send + Sync {
    /// Command lines of the processes attached to the given tty.
    fn commands_on_tty(&self, tty: &str) -> Vec<String>;
}

/// `ps`-backed inspector: runs `ps -t <tty> -o command=`.
pub struct PsInspector;

impl TtyInspector for PsInspector {
    fn commands_on_tty(&self, tty: &str) -> Vec<String> {
        let output = match Command::new("ps")
            .args(["-t", tty, "-o", "command="])
            .output()
        {
            Ok(o) => o,
            Err(_) => return Vec::new(),
        };
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect()
    }
}

/// Inspector with a fixed tty -> command-lines table.
#[derive(Default)]
pub struct StaticInspector {
    table: HashMap<String, Vec<String>>,
}

impl StaticInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tty(mut self, tty: &str, commands: &[&str]) -> Self {
        self.table.insert(
            tty.to_string(),
            commands.iter().map(|c| c.to_string()).collect(),
        );
        self
    }
}

impl TtyInspector for StaticInspector {
    fn commands_on_tty(&self, tty: &str) -> Vec<String> {
        self.table.get(tty).cloned().unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Pane
// ---------------------------------------------------------------------------

/// Data record for a single tmux pane.
///
/// Created by session discovery from a parsed `list-panes` line, mutated on
/// subsequent discoveries, and dropped when a discovery pass no longer
/// observes its target.
#[derive(Debug, Clone)]
pub struct Pane {
    pub session_name: String,
    pub window_index: usize,
    pub pane_index: usize,
    pub pane_title: String,
    pub last_command: String,
    pub current_command: String,
    pub current_path: PathBuf,
    /// Absolute device path; read-only after discovery when non-empty.
    pub pane_tty: String,
    pub shell_type: ShellType,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    /// Name of the owning project, resolved through the host's project list.
    pub project: Option<String>,
    /// Id of the owning worktree, if the pane sits inside one.
    pub worktree: Option<String>,
}

impl Pane {
    /// Canonical tmux target string `session:window.pane`.
    pub fn target(&self) -> String {
        format!(
            "{}:{}.{}",
            self.session_name, self.window_index, self.pane_index
        )
    }

    /// Assign `shell_type` by the ordered detection procedure:
    ///
    /// 1. `claude` is sticky: once set, keep it.
    /// 2. A process on the pane's tty named `claude` (or `claude ...`).
    /// 3. The `✳` marker in the pane title.
    /// 4. Substring match on `current_command`.
    /// 5. Otherwise `unknown`.
    pub fn classify_shell(&mut self, inspector: &dyn TtyInspector) {
        if self.shell_type == ShellType::Claude {
            return;
        }

        if !self.pane_tty.is_empty() {
            for cmd in inspector.commands_on_tty(&self.pane_tty) {
                let cmd = cmd.trim();
                if cmd == "claude" || cmd.starts_with("claude ") {
                    self.shell_type = ShellType::Claude;
                    return;
                }
            }
        }

        if self.pane_title.contains('✳') {
            self.shell_type = ShellType::Claude;
            return;
        }

        let command = self.current_command.as_str();
        self.shell_type = if command.contains("zsh") {
            ShellType::Zsh
        } else if command.contains("claude") {
            ShellType::Claude
        } else if command.contains("nvim") || command.contains("vim") {
            ShellType::Nvim
        } else {
            ShellType::Unknown
        };
    }

    /// Title shown in the UI.
    ///
    /// The pane title wins unless it is "boring" (a bare shell name or a
    /// `hostname.local` default). Boring zsh panes fall back to the last
    /// command, then the current command, then the shell type name.
    pub fn display_title(&self) -> String {
        if !self.is_boring_title() {
            return self.pane_title.clone();
        }

        if self.shell_type == ShellType::Zsh
            && !self.last_command.is_empty()
            && self.last_command != "zsh"
        {
            return self.last_command.clone();
        }

        if !self.current_command.is_empty() {
            return self.current_command.clone();
        }

        self.shell_type.as_str().to_string()
    }

    fn is_boring_title(&self) -> bool {
        let title = self.pane_title.as_str();
        title.is_empty()
            || matches!(title, "zsh" | "bash" | "sh" | "fish" | "-zsh" | "-bash")
            || title.ends_with(".local")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn make_pane(title: &str, command: &str, tty: &str) -> Pane {
        Pane {
            session_name: "dev".to_string(),
            window_index: 0,
            pane_index: 1,
            pane_title: title.to_string(),
            last_command: String::new(),
            current_command: command.to_string(),
            current_path: PathBuf::from("/home/u/proj"),
            pane_tty: tty.to_string(),
            shell_type: ShellType::Unknown,
            active: false,
            created_at: Utc::now(),
            last_activity: Utc::now(),
            project: None,
            worktree: None,
        }
    }

    // -- Target form --------------------------------------------------------

    #[test]
    fn test_target_form() {
        let pane = make_pane("t", "zsh", "");
        assert_eq!(pane.target(), "dev:0.1");
    }

    // -- Shell detection ordering -------------------------------------------

    #[test]
    fn test_claude_is_sticky() {
        let mut pane = make_pane("zsh", "zsh", "");
        pane.shell_type = ShellType::Claude;
        pane.classify_shell(&StaticInspector::new());
        assert_eq!(pane.shell_type, ShellType::Claude);
    }

    #[test]
    fn test_tty_process_promotes_to_claude() {
        // node process, hostname title -- only the tty scan reveals claude.
        let inspector =
            StaticInspector::new().with_tty("/dev/ttys007", &["-zsh", "claude"]);
        let mut pane = make_pane("hostname.local", "node", "/dev/ttys007");
        pane.classify_shell(&inspector);
        assert_eq!(pane.shell_type, ShellType::Claude);
    }

    #[test]
    fn test_tty_process_with_arguments_promotes() {
        let inspector =
            StaticInspector::new().with_tty("/dev/ttys003", &["claude -c"]);
        let mut pane = make_pane("x", "node", "/dev/ttys003");
        pane.classify_shell(&inspector);
        assert_eq!(pane.shell_type, ShellType::Claude);
    }

    #[test]
    fn test_tty_prefix_requires_word_boundary() {
        let inspector =
            StaticInspector::new().with_tty("/dev/ttys001", &["claudette"]);
        let mut pane = make_pane("x", "node", "/dev/ttys001");
        pane.classify_shell(&inspector);
        assert_ne!(pane.shell_type, ShellType::Claude);
    }

    #[test]
    fn test_title_marker_promotes_to_claude() {
        let mut pane = make_pane("✳ Thinking", "node", "");
        pane.classify_shell(&StaticInspector::new());
        assert_eq!(pane.shell_type, ShellType::Claude);
    }

    #[test]
    fn test_command_substring_classification() {
        let inspector = StaticInspector::new();

        let mut pane = make_pane("t", "-zsh", "");
        pane.classify_shell(&inspector);
        assert_eq!(pane.shell_type, ShellType::Zsh);

        let mut pane = make_pane("t", "claude", "");
        pane.classify_shell(&inspector);
        assert_eq!(pane.shell_type, ShellType::Claude);

        let mut pane = make_pane("t", "nvim", "");
        pane.classify_shell(&inspector);
        assert_eq!(pane.shell_type, ShellType::Nvim);

        let mut pane = make_pane("t", "vim", "");
        pane.classify_shell(&inspector);
        assert_eq!(pane.shell_type, ShellType::Nvim);

        let mut pane = make_pane("t", "htop", "");
        pane.classify_shell(&inspector);
        assert_eq!(pane.shell_type, ShellType::Unknown);
    }

    // -- Display title priority ---------------------------------------------

    #[test]
    fn test_display_title_prefers_interesting_title() {
        let mut pane = make_pane("editing main.rs", "zsh", "");
        pane.shell_type = ShellType::Zsh;
        assert_eq!(pane.display_title(), "editing main.rs");
    }

    #[test]
    fn test_display_title_boring_zsh_uses_last_command() {
        let mut pane = make_pane("zsh", "zsh", "");
        pane.shell_type = ShellType::Zsh;
        pane.last_command = "cargo build".to_string();
        assert_eq!(pane.display_title(), "cargo build");
    }

    #[test]
    fn test_display_title_hostname_is_boring() {
        let mut pane = make_pane("mbp.local", "node", "");
        pane.shell_type = ShellType::Claude;
        assert_eq!(pane.display_title(), "node");
    }

    #[test]
    fn test_display_title_falls_back_to_shell_type() {
        let mut pane = make_pane("zsh", "", "");
        pane.shell_type = ShellType::Zsh;
        assert_eq!(pane.display_title(), "zsh");
    }
}
