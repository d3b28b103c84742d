//! The sole channel for invoking tmux.
//!
//! Provides a trait-based abstraction (`TmuxExecutor`) so every component
//! that talks to tmux takes a narrow capability interface instead of
//! exec'ing the binary directly. The concrete `CliExecutor` shells out via
//! `std::process::Command`; `MockExecutor` records every invocation and
//! replays scripted responses for tests.
//!
//! Design notes:
//! - Process-based: tmux commands complete in sub-millisecond; no async
//!   needed at this layer and no timeout is imposed.
//! - The binary is located by probing a fixed list of well-known absolute
//!   paths in order, falling back to `PATH`. The first path that exists and
//!   successfully runs `tmux -V` is cached on the executor instance.

use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Mutex;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Narrow capability interface for running tmux.
///
/// All other components use this interface, never `exec` tmux directly.
pub trait TmuxExecutor: Send + Sync {
    /// Run `tmux <args...>`, capture stdout. Non-zero exit is an error.
    fn execute(&self, args: &[&str]) -> Result<Vec<u8>>;

    /// Run `tmux <args...>` with the given bytes piped to stdin.
    fn execute_with_input(&self, input: &[u8], args: &[&str]) -> Result<Vec<u8>>;

    /// Run `tmux <args...>` without capturing output.
    fn run(&self, args: &[&str]) -> Result<()>;
}

// ---------------------------------------------------------------------------
// CliExecutor
// ---------------------------------------------------------------------------

/// Well-known install locations probed before falling back to `PATH`.
const TMUX_CANDIDATE_PATHS: &[&str] = &[
    "/opt/homebrew/bin/tmux",
    "/usr/local/bin/tmux",
    "/usr/bin/tmux",
    "/bin/tmux",
];

/// Concrete executor that shells out to the tmux binary.
///
/// The resolved binary path is cached per instance (never process-global,
/// so test instances stay independent).
pub struct CliExecutor {
    binary: Mutex<Option<PathBuf>>,
}

impl CliExecutor {
    pub fn new() -> Self {
        Self {
            binary: Mutex::new(None),
        }
    }

    /// Locate the tmux binary, probing candidates then `PATH`.
    ///
    /// A candidate qualifies when it exists and `tmux -V` exits zero.
    fn resolve_binary(&self) -> Result<PathBuf> {
        let mut cached = self.binary.lock().unwrap();
        if let Some(ref path) = *cached {
            return Ok(path.clone());
        }

        for candidate in TMUX_CANDIDATE_PATHS {
            let path = PathBuf::from(candidate);
            if !path.exists() {
                continue;
            }
            let ok = Command::new(&path)
                .arg("-V")
                .output()
                .map(|o| o.status.success())
                .unwrap_or(false);
            if ok {
                *cached = Some(path.clone());
                return Ok(path);
            }
        }

        // Fall back to PATH lookup.
        let ok = Command::new("tmux")
            .arg("-V")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if ok {
            let path = PathBuf::from("tmux");
            *cached = Some(path.clone());
            return Ok(path);
        }

        Err(Error::TmuxNotFound)
    }

    fn command_string(args: &[&str]) -> String {
        format!("tmux {}", args.join(" "))
    }
}

impl Default for CliExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TmuxExecutor for CliExecutor {
    fn execute(&self, args: &[&str]) -> Result<Vec<u8>> {
        let binary = self.resolve_binary()?;
        let output = Command::new(&binary).args(args).output()?;

        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: Self::command_string(args),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(output.stdout)
    }

    fn execute_with_input(&self, input: &[u8], args: &[&str]) -> Result<Vec<u8>> {
        let binary = self.resolve_binary()?;
        let mut child = Command::new(&binary)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input)?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(Error::CommandFailed {
                command: Self::command_string(args),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        Ok(output.stdout)
    }

    fn run(&self, args: &[&str]) -> Result<()> {
        self.execute(args).map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// MockExecutor
// ---------------------------------------------------------------------------

/// Test double that records every invocation and replays scripted responses.
///
/// Responses are keyed by the space-joined argv; unscripted invocations
/// return empty output so callers that only care about side effects do not
/// need a full script.
#[derive(Default)]
pub struct MockExecutor {
    responses: Mutex<HashMap<String, Vec<u8>>>,
    failures: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a response for the given space-joined argv.
    pub fn script(&self, argv: &str, response: impl Into<Vec<u8>>) {
        self.responses
            .lock()
            .unwrap()
            .insert(argv.to_string(), response.into());
    }

    /// Script a failure (non-zero exit with the given stderr) for the argv.
    pub fn script_failure(&self, argv: &str, stderr: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(argv.to_string(), stderr.to_string());
    }

    /// All invocations recorded so far, as space-joined argv strings.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded invocations whose argv starts with `prefix`.
    pub fn count_calls_with_prefix(&self, prefix: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .count()
    }

    fn dispatch(&self, args: &[&str]) -> Result<Vec<u8>> {
        let key = args.join(" ");
        self.calls.lock().unwrap().push(key.clone());

        if let Some(stderr) = self.failures.lock().unwrap().get(&key) {
            return Err(Error::CommandFailed {
                command: format!("tmux {}", key),
                stderr: stderr.clone(),
            });
        }

        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default())
    }
}

impl TmuxExecutor for MockExecutor {
    fn execute(&self, args: &[&str]) -> Result<Vec<u8>> {
        self.dispatch(args)
    }

    fn execute_with_input(&self, _input: &[u8], args: &[&str]) -> Result<Vec<u8>> {
        self.dispatch(args)
    }

    fn run(&self, args: &[&str]) -> Result<()> {
        self.dispatch(args).map(|_| ())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_records_invocations() {
        let mock = MockExecutor::new();
        let _ = mock.execute(&["list-panes", "-a"]);
        let _ = mock.run(&["kill-window", "-t", "dev:3"]);

        let calls = mock.calls();
        assert_eq!(calls, vec!["list-panes -a", "kill-window -t dev:3"]);
    }

    #[test]
    fn test_mock_scripted_response() {
        let mock = MockExecutor::new();
        mock.script("display-message -p #{session_name}", "dev\n");

        let out = mock
            .execute(&["display-message", "-p", "#{session_name}"])
            .unwrap();
        assert_eq!(out, b"dev\n");
    }

    #[test]
    fn test_mock_unscripted_returns_empty() {
        let mock = MockExecutor::new();
        let out = mock.execute(&["list-sessions"]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_mock_scripted_failure() {
        let mock = MockExecutor::new();
        mock.script_failure("has-session -t gone", "can't find session: gone");

        let err = mock.run(&["has-session", "-t", "gone"]).unwrap_err();
        match err {
            Error::CommandFailed { stderr, .. } => {
                assert!(stderr.contains("can't find session"));
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_mock_count_calls_with_prefix() {
        let mock = MockExecutor::new();
        let _ = mock.execute(&["capture-pane", "-p", "-e", "-t", "dev:0.0"]);
        let _ = mock.execute(&["capture-pane", "-p", "-e", "-t", "dev:0.1"]);
        let _ = mock.execute(&["list-panes", "-a"]);

        assert_eq!(mock.count_calls_with_prefix("capture-pane"), 2);
        assert_eq!(mock.count_calls_with_prefix("list-panes"), 1);
    }

    #[test]
    fn test_command_string() {
        assert_eq!(
            CliExecutor::command_string(&["new-window", "-t", "dev"]),
            "tmux new-window -t dev"
        );
    }
}
