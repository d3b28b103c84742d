//! tmux session and window records.
//!
//! These mirror live tmux state as observed by discovery. Windows are
//! keyed by name within a session (tmux enforces nothing here, but the
//! manager keeps names unique when it creates windows itself).

use std::collections::HashMap;

// ---------------------------------------------------------------------------
// TmuxWindow
// ---------------------------------------------------------------------------

/// A window within a tmux session.
#[derive(Debug, Clone)]
pub struct TmuxWindow {
    pub index: usize,
    pub name: String,
    /// Command reported for the window's active pane.
    pub command: String,
    pub pane_title: String,
    /// Id of the worktree this window was created for, if any.
    pub worktree_id: Option<String>,
    pub active: bool,
}

// ---------------------------------------------------------------------------
// TmuxSession
// ---------------------------------------------------------------------------

/// A tmux session: what `attach-session` binds to.
#[derive(Debug, Clone, Default)]
pub struct TmuxSession {
    pub name: String,
    /// Name of the project this session was first associated with.
    pub project: Option<String>,
    /// Windows keyed by window name.
    pub windows: HashMap<String, TmuxWindow>,
    /// Whether this is the session the user's client is currently on.
    pub active: bool,
}

impl TmuxSession {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Look up a window by name.
    pub fn window(&self, name: &str) -> Option<&TmuxWindow> {
        self.windows.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_lookup_by_name() {
        let mut session = TmuxSession::new("dev");
        session.windows.insert(
            "proj:zsh".to_string(),
            TmuxWindow {
                index: 2,
                name: "proj:zsh".to_string(),
                command: "zsh".to_string(),
                pane_title: String::new(),
                worktree_id: None,
                active: false,
            },
        );

        assert!(session.window("proj:zsh").is_some());
        assert_eq!(session.window("proj:zsh").unwrap().index, 2);
        assert!(session.window("missing").is_none());
    }
}
