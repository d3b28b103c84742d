//! Crate-wide error type.
//!
//! Every user-visible failure carries a short, stable phrase so scripts can
//! filter on it: "session not found", "session is not active", "tmux
//! executable not found", "command not in whitelist", "pane not found".

use std::fmt;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors from tmux orchestration and PTY session management.
#[derive(Debug)]
pub enum Error {
    /// The requested tmux session does not exist.
    SessionNotFound(String),
    /// The requested pane does not exist in the pane map.
    PaneNotFound(String),
    /// The target PTY session exists but has been torn down.
    SessionNotActive(String),
    /// The tmux binary could not be located or failed to respond.
    TmuxNotFound,
    /// Command validation rejected the input.
    CommandRejected(String),
    /// A tmux invocation exited non-zero; stderr text is preserved.
    CommandFailed { command: String, stderr: String },
    /// A PTY-layer failure (open, spawn, resize, write).
    Pty(String),
    /// An I/O error occurred spawning or communicating with a subprocess.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SessionNotFound(name) => write!(f, "session not found: {}", name),
            Error::PaneNotFound(target) => write!(f, "pane not found: {}", target),
            Error::SessionNotActive(id) => write!(f, "session is not active: {}", id),
            Error::TmuxNotFound => write!(f, "tmux executable not found"),
            Error::CommandRejected(cmd) => write!(f, "command not in whitelist: {}", cmd),
            Error::CommandFailed { command, stderr } => {
                write!(f, "tmux command failed: `{}`: {}", command, stderr)
            }
            Error::Pty(msg) => write!(f, "pty error: {}", msg),
            Error::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stable_phrases() {
        assert!(format!("{}", Error::SessionNotFound("dev".into())).contains("session not found"));
        assert!(format!("{}", Error::SessionNotActive("s1".into()))
            .contains("session is not active"));
        assert_eq!(format!("{}", Error::TmuxNotFound), "tmux executable not found");
        assert!(
            format!("{}", Error::CommandRejected("rm -rf".into()))
                .contains("command not in whitelist")
        );
        assert!(format!("{}", Error::PaneNotFound("dev:0.1".into())).contains("pane not found"));
    }

    #[test]
    fn test_command_failed_carries_stderr() {
        let err = Error::CommandFailed {
            command: "tmux kill-window -t dev:3".to_string(),
            stderr: "can't find window".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("kill-window"));
        assert!(msg.contains("can't find window"));
    }

    #[test]
    fn test_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
