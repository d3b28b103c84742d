//! Navigation between panes via tmux attachment primitives.
//!
//! Inside tmux (the `TMUX` environment variable is set) the right
//! primitive is `switch-client`; outside it is `attach-session`. The
//! decision is captured at construction so tests can exercise both paths
//! without touching the environment.

use crate::error::Result;
use crate::executor::TmuxExecutor;

/// Resolves attach requests to the correct tmux primitive.
#[derive(Debug, Clone, Copy)]
pub struct Navigator {
    inside_tmux: bool,
}

impl Navigator {
    pub fn new(inside_tmux: bool) -> Self {
        Self { inside_tmux }
    }

    /// Build from the process environment (`TMUX` set and non-empty).
    pub fn from_env() -> Self {
        let inside = std::env::var("TMUX")
            .map(|v| !v.is_empty())
            .unwrap_or(false);
        Self::new(inside)
    }

    pub fn inside_tmux(&self) -> bool {
        self.inside_tmux
    }

    /// Route the user to `session:window`.
    pub fn attach_to_window(
        &self,
        executor: &dyn TmuxExecutor,
        session: &str,
        window_index: usize,
    ) -> Result<()> {
        let target = format!("{}:{}", session, window_index);
        if self.inside_tmux {
            executor.run(&["switch-client", "-t", &target])
        } else {
            executor.run(&["attach-session", "-t", &target])
        }
    }

    /// Route the user to `session:window.pane`.
    pub fn attach_to_pane(
        &self,
        executor: &dyn TmuxExecutor,
        session: &str,
        window_index: usize,
        pane_index: usize,
    ) -> Result<()> {
        let window_target = format!("{}:{}", session, window_index);
        let pane_target = format!("{}:{}.{}", session, window_index, pane_index);
        if self.inside_tmux {
            executor.run(&["switch-client", "-t", &window_target])?;
            executor.run(&["select-pane", "-t", &pane_target])
        } else {
            executor.run(&["attach-session", "-t", &pane_target])
        }
    }

    /// Focus a window without moving the client between sessions.
    pub fn select_window(
        &self,
        executor: &dyn TmuxExecutor,
        session: &str,
        window_index: usize,
    ) -> Result<()> {
        let target = format!("{}:{}", session, window_index);
        executor.run(&["select-window", "-t", &target])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MockExecutor;

    #[test]
    fn test_inside_tmux_uses_switch_client() {
        let mock = MockExecutor::new();
        let nav = Navigator::new(true);

        nav.attach_to_window(&mock, "dev", 2).unwrap();
        assert_eq!(mock.calls(), vec!["switch-client -t dev:2"]);
    }

    #[test]
    fn test_outside_tmux_uses_attach_session() {
        let mock = MockExecutor::new();
        let nav = Navigator::new(false);

        nav.attach_to_window(&mock, "dev", 2).unwrap();
        assert_eq!(mock.calls(), vec!["attach-session -t dev:2"]);
    }

    #[test]
    fn test_pane_attach_inside_selects_pane() {
        let mock = MockExecutor::new();
        let nav = Navigator::new(true);

        nav.attach_to_pane(&mock, "dev", 2, 1).unwrap();
        assert_eq!(
            mock.calls(),
            vec!["switch-client -t dev:2", "select-pane -t dev:2.1"]
        );
    }

    #[test]
    fn test_pane_attach_outside_targets_pane_directly() {
        let mock = MockExecutor::new();
        let nav = Navigator::new(false);

        nav.attach_to_pane(&mock, "dev", 2, 1).unwrap();
        assert_eq!(mock.calls(), vec!["attach-session -t dev:2.1"]);
    }

    #[test]
    fn test_select_window() {
        let mock = MockExecutor::new();
        let nav = Navigator::new(true);

        nav.select_window(&mock, "dev", 4).unwrap();
        assert_eq!(mock.calls(), vec!["select-window -t dev:4"]);
    }
}
