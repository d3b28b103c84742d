//! Internal PTY-backed shell sessions.
//!
//! Independent of tmux: these are child processes the controller spawns on
//! pseudo-terminals for shells launched inside its own UI. Each session
//! owns a bounded ring buffer of output, a blocking I/O pump feeding it,
//! and a monitor task that watches for child exit or cancellation.
//!
//! Design notes:
//! - The child's environment is synthesized to mimic a tmux child
//!   (`TERM=screen-256color`, fabricated `TMUX`/`TMUX_PANE`), so tools
//!   that sniff for tmux behave the same way in both worlds.
//! - The master fd is switched to non-blocking; the pump treats
//!   would-block as "no data yet", sleeps briefly, and retries. EOF ends
//!   the pump, which is why `SessionTerminated` (emitted after the pump
//!   is joined) never outruns the session's final output.
//! - Worktree sessions run in their own process group so teardown signals
//!   stay scoped to the worktree's children.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{Error, Result};
use crate::project::{Project, Worktree};
use crate::ring_buffer::{RingBuffer, DEFAULT_CAPACITY};
use crate::terminal::RawModeGuard;
use crate::validate::validate_command;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default PTY width in columns.
pub const DEFAULT_COLS: u16 = 120;

/// Default PTY height in rows.
pub const DEFAULT_ROWS: u16 = 30;

/// Pixel dimensions are reported as a fixed multiple of the cell grid.
const CELL_PIXELS: u16 = 16;

/// Read chunk size for the per-session I/O pump.
const READ_CHUNK_SIZE: usize = 4096;

/// Back-off between empty reads.
const READ_RETRY_DELAY: Duration = Duration::from_millis(5);

/// How often the monitor polls the child for exit.
const CHILD_POLL_INTERVAL: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// Lifecycle events emitted on the manager's channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PtyEvent {
    /// Emitted once the session's pumps are running.
    SessionCreated { session_id: String },
    /// Emitted after the session's final output reached its ring buffer
    /// and the id left the manager's map. `exit_code` is the child's exit
    /// status, or -1 for signal/cancel.
    SessionTerminated { session_id: String, exit_code: i32 },
}

// ---------------------------------------------------------------------------
// PtySession
// ---------------------------------------------------------------------------

/// One PTY-backed child process.
pub struct PtySession {
    pub id: String,
    pub project: Option<String>,
    pub worktree_id: Option<String>,
    pub worktree_path: Option<PathBuf>,
    /// Worktree sessions own their process group; teardown signals the
    /// whole group instead of just the immediate child.
    pub scoped_lifetime: bool,
    pid: Option<u32>,
    active: AtomicBool,
    cancelled: AtomicBool,
    output: RingBuffer,
    master: Mutex<Option<Box<dyn MasterPty + Send>>>,
    writer: Mutex<Option<Box<dyn Write + Send>>>,
}

impl PtySession {
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// A fresh copy of the ring buffer contents. Does not consume.
    pub fn output(&self) -> Vec<u8> {
        self.output.read()
    }

    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    fn close_pty(&self) {
        self.master.lock().unwrap().take();
        self.writer.lock().unwrap().take();
    }

    fn resize(&self, cols: u16, rows: u16) -> Result<()> {
        let guard = self.master.lock().unwrap();
        let master = guard
            .as_ref()
            .ok_or_else(|| Error::SessionNotActive(self.id.clone()))?;
        master
            .resize(pty_size(cols, rows))
            .map_err(|e| Error::Pty(format!("resize failed: {}", e)))?;

        // The child only learns about the new size via SIGWINCH.
        #[cfg(unix)]
        if let Some(pid) = self.pid {
            unsafe {
                libc::kill(pid as i32, libc::SIGWINCH);
            }
        }
        Ok(())
    }
}

fn pty_size(cols: u16, rows: u16) -> PtySize {
    PtySize {
        rows,
        cols,
        pixel_width: cols * CELL_PIXELS,
        pixel_height: rows * CELL_PIXELS,
    }
}

// ---------------------------------------------------------------------------
// Shell resolution and environment
// ---------------------------------------------------------------------------

/// Resolve a validated command string to the argv actually spawned.
///
/// `claude` runs resumed (`-c`), wrapped in `nix develop` when the
/// working directory carries a `flake.nix`. Bare/empty commands get an
/// interactive-ish zsh (`-i` inside worktrees); anything else runs under
/// `zsh -c`.
pub fn resolve_shell_command(command: &str, workdir: &Path, worktree: bool) -> Vec<String> {
    let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    match command.trim() {
        "claude" | "claude -c" => {
            if workdir.join("flake.nix").exists() {
                owned(&["nix", "develop", "--command", "claude", "-c"])
            } else {
                owned(&["claude", "-c"])
            }
        }
        "nvim" if !worktree => owned(&["nvim"]),
        "" | "zsh" => {
            if worktree {
                owned(&["zsh", "-i"])
            } else {
                owned(&["zsh"])
            }
        }
        other => owned(&["zsh", "-c", other]),
    }
}

/// Environment exported to PTY children: a tmux child lookalike.
///
/// `PATH`/`HOME`/`USER`/`SHELL` are inherited; everything else is pinned.
fn tmux_like_env(cols: u16, rows: u16) -> Vec<(String, String)> {
    let mut env = Vec::new();
    for key in ["PATH", "HOME", "USER", "SHELL"] {
        if let Ok(value) = std::env::var(key) {
            env.push((key.to_string(), value));
        }
    }
    env.push(("TERM".to_string(), "screen-256color".to_string()));
    env.push(("TMUX".to_string(), "/tmp/tmux-501/default,12345,0".to_string()));
    env.push(("TMUX_PANE".to_string(), "%0".to_string()));
    env.push(("COLUMNS".to_string(), cols.to_string()));
    env.push(("LINES".to_string(), rows.to_string()));
    env.push(("SHLVL".to_string(), "1".to_string()));
    env
}

// ---------------------------------------------------------------------------
// UTF-8 streaming
// ---------------------------------------------------------------------------

/// Push the valid UTF-8 prefix of `carry` into `output`, retaining an
/// incomplete trailing sequence for the next read. Definitely-invalid
/// bytes are replaced rather than stalling the stream.
fn drain_valid_utf8(output: &RingBuffer, carry: &mut Vec<u8>) {
    loop {
        match std::str::from_utf8(carry) {
            Ok(text) => {
                output.write(text.as_bytes());
                carry.clear();
                return;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                match e.error_len() {
                    Some(bad) => {
                        output.write(&carry[..valid]);
                        output.write("\u{FFFD}".as_bytes());
                        carry.drain(..valid + bad);
                    }
                    None => {
                        // Incomplete tail: keep it for the next chunk.
                        output.write(&carry[..valid]);
                        carry.drain(..valid);
                        return;
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Manager configuration
// ---------------------------------------------------------------------------

/// Tunables for spawned sessions.
#[derive(Debug, Clone)]
pub struct PtyManagerConfig {
    pub cols: u16,
    pub rows: u16,
    pub output_capacity: usize,
}

impl Default for PtyManagerConfig {
    fn default() -> Self {
        Self {
            cols: DEFAULT_COLS,
            rows: DEFAULT_ROWS,
            output_capacity: DEFAULT_CAPACITY,
        }
    }
}

impl From<&crate::config::PtyConfig> for PtyManagerConfig {
    fn from(config: &crate::config::PtyConfig) -> Self {
        Self {
            cols: config.cols,
            rows: config.rows,
            output_capacity: config.output_buffer_bytes,
        }
    }
}

// ---------------------------------------------------------------------------
// PtySessionManager
// ---------------------------------------------------------------------------

type SessionMap = Arc<RwLock<HashMap<String, Arc<PtySession>>>>;

/// Spawns, multiplexes, and tears down PTY-backed shell sessions.
pub struct PtySessionManager {
    sessions: SessionMap,
    events_tx: Mutex<Option<mpsc::UnboundedSender<PtyEvent>>>,
    shutting_down: Arc<AtomicBool>,
    raw_mode: Mutex<RawModeGuard>,
    config: PtyManagerConfig,
}

impl PtySessionManager {
    /// Create a manager and the receiving end of its event channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<PtyEvent>) {
        Self::with_config(PtyManagerConfig::default())
    }

    pub fn with_config(config: PtyManagerConfig) -> (Self, mpsc::UnboundedReceiver<PtyEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                sessions: Arc::new(RwLock::new(HashMap::new())),
                events_tx: Mutex::new(Some(tx)),
                shutting_down: Arc::new(AtomicBool::new(false)),
                raw_mode: Mutex::new(RawModeGuard::new()),
                config,
            },
            rx,
        )
    }

    // -- Creation ------------------------------------------------------------

    /// Spawn a session rooted at the project path.
    pub fn create_session(&self, project: &Project, command: &str) -> Result<String> {
        self.spawn_session(project, None, command)
    }

    /// Spawn a session rooted at a worktree path, in its own process group.
    pub fn create_worktree_session(
        &self,
        project: &Project,
        worktree: &Worktree,
        command: &str,
    ) -> Result<String> {
        self.spawn_session(project, Some(worktree), command)
    }

    fn spawn_session(
        &self,
        project: &Project,
        worktree: Option<&Worktree>,
        command: &str,
    ) -> Result<String> {
        if self.shutting_down.load(Ordering::SeqCst) {
            return Err(Error::Pty("manager is shutting down".to_string()));
        }
        validate_command(command)?;

        let workdir = worktree
            .map(|w| w.path.clone())
            .unwrap_or_else(|| project.path.clone());
        let argv = resolve_shell_command(command, &workdir, worktree.is_some());

        let pair = native_pty_system()
            .openpty(pty_size(self.config.cols, self.config.rows))
            .map_err(|e| Error::Pty(format!("failed to open pty: {}", e)))?;

        let mut cmd = CommandBuilder::new(&argv[0]);
        for arg in &argv[1..] {
            cmd.arg(arg);
        }
        cmd.cwd(&workdir);
        cmd.env_clear();
        for (key, value) in tmux_like_env(self.config.cols, self.config.rows) {
            cmd.env(key, value);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| Error::Pty(format!("failed to spawn {}: {}", argv[0], e)))?;
        drop(pair.slave);

        let pid = child.process_id();

        // Scope worktree children to their own process group.
        #[cfg(unix)]
        if worktree.is_some() {
            if let Some(pid) = pid {
                unsafe {
                    libc::setpgid(pid as i32, pid as i32);
                }
            }
        }

        #[cfg(unix)]
        set_nonblocking(pair.master.as_raw_fd());

        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| Error::Pty(format!("failed to clone reader: {}", e)))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| Error::Pty(format!("failed to take writer: {}", e)))?;

        let session = Arc::new(PtySession {
            id: uuid::Uuid::new_v4().to_string(),
            project: Some(project.name.clone()),
            worktree_id: worktree.map(|w| w.id.clone()),
            worktree_path: worktree.map(|w| w.path.clone()),
            scoped_lifetime: worktree.is_some(),
            pid,
            active: AtomicBool::new(true),
            cancelled: AtomicBool::new(false),
            output: RingBuffer::new(self.config.output_capacity),
            master: Mutex::new(Some(pair.master)),
            writer: Mutex::new(Some(writer)),
        });
        let id = session.id.clone();

        self.sessions
            .write()
            .unwrap()
            .insert(id.clone(), Arc::clone(&session));

        let pump = spawn_output_pump(Arc::clone(&session), reader);
        let events = self.events_tx.lock().unwrap().clone();
        spawn_monitor(
            Arc::clone(&session),
            child,
            pump,
            Arc::clone(&self.sessions),
            events.clone(),
            Arc::clone(&self.shutting_down),
        );

        // Pumps are running: announce the session.
        if let Some(tx) = events {
            let _ = tx.send(PtyEvent::SessionCreated {
                session_id: id.clone(),
            });
        }

        Ok(id)
    }

    // -- I/O -----------------------------------------------------------------

    /// Write input bytes to a session's PTY.
    ///
    /// The map lock is released before the potentially blocking write;
    /// only the per-session writer lock is held across it.
    pub fn write_to_session(&self, id: &str, data: &[u8]) -> Result<()> {
        let session = self.lookup(id)?;
        if !session.is_active() {
            return Err(Error::SessionNotActive(id.to_string()));
        }

        let mut guard = session.writer.lock().unwrap();
        let writer = guard
            .as_mut()
            .ok_or_else(|| Error::SessionNotActive(id.to_string()))?;
        writer.write_all(data)?;
        writer.flush()?;
        Ok(())
    }

    /// A fresh copy of a session's buffered output.
    pub fn get_session_output(&self, id: &str) -> Result<Vec<u8>> {
        Ok(self.lookup(id)?.output())
    }

    /// Resize a session's PTY now and notify the child with SIGWINCH.
    pub fn resize_session_immediate(&self, id: &str, cols: u16, rows: u16) -> Result<()> {
        let session = self.lookup(id)?;
        if !session.is_active() {
            return Err(Error::SessionNotActive(id.to_string()));
        }
        session.resize(cols, rows)
    }

    /// Deferred variant of [`resize_session_immediate`]: returns a command
    /// that performs the same work when invoked.
    ///
    /// [`resize_session_immediate`]: Self::resize_session_immediate
    pub fn resize_session(
        &self,
        id: &str,
        cols: u16,
        rows: u16,
    ) -> Box<dyn FnOnce() -> Result<()> + Send> {
        let sessions = Arc::clone(&self.sessions);
        let id = id.to_string();
        Box::new(move || {
            let session = sessions
                .read()
                .unwrap()
                .get(&id)
                .cloned()
                .ok_or_else(|| Error::SessionNotFound(id.clone()))?;
            if !session.is_active() {
                return Err(Error::SessionNotActive(id));
            }
            session.resize(cols, rows)
        })
    }

    // -- Queries -------------------------------------------------------------

    pub fn get_session(&self, id: &str) -> Option<Arc<PtySession>> {
        self.sessions.read().unwrap().get(id).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    fn lookup(&self, id: &str) -> Result<Arc<PtySession>> {
        self.sessions
            .read()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    // -- Host terminal -------------------------------------------------------

    /// Put the controlling terminal's stdin into raw mode.
    pub fn enable_raw_mode(&self) -> Result<()> {
        self.raw_mode.lock().unwrap().enable()?;
        Ok(())
    }

    /// Restore the controlling terminal. Idempotent.
    pub fn restore_terminal_mode(&self) -> Result<()> {
        self.raw_mode.lock().unwrap().restore()?;
        Ok(())
    }

    // -- Shutdown ------------------------------------------------------------

    /// Cancel every session, release PTYs, and close the event channel.
    ///
    /// Safe to call concurrently with session creation: creations that
    /// lose the race fail cleanly instead of panicking, and no event is
    /// written after the channel closes.
    pub fn shutdown(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);

        let snapshot: Vec<Arc<PtySession>> = self
            .sessions
            .read()
            .unwrap()
            .values()
            .cloned()
            .collect();
        for session in snapshot {
            session.cancel();
            session.active.store(false, Ordering::SeqCst);
            session.close_pty();
        }

        // Monitors check `shutting_down` before sending; dropping our
        // sender lets the receiver observe the close once they finish.
        self.events_tx.lock().unwrap().take();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Pump and monitor tasks
// ---------------------------------------------------------------------------

/// Blocking read loop: PTY -> ring buffer, UTF-8 safe.
fn spawn_output_pump(
    session: Arc<PtySession>,
    mut reader: Box<dyn Read + Send>,
) -> JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        let mut carry: Vec<u8> = Vec::new();
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break, // EOF: child side closed
                Ok(n) => {
                    carry.extend_from_slice(&chunk[..n]);
                    drain_valid_utf8(&session.output, &mut carry);
                }
                Err(e)
                    if e.kind() == io::ErrorKind::WouldBlock
                        || e.kind() == io::ErrorKind::TimedOut =>
                {
                    if session.cancelled.load(Ordering::SeqCst) {
                        break;
                    }
                    std::thread::sleep(READ_RETRY_DELAY);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break, // pty torn down under us
            }
        }
    })
}

/// Waits for child exit or cancellation; on either, finishes the session.
fn spawn_monitor(
    session: Arc<PtySession>,
    mut child: Box<dyn Child + Send + Sync>,
    pump: JoinHandle<()>,
    sessions: SessionMap,
    events: Option<mpsc::UnboundedSender<PtyEvent>>,
    shutting_down: Arc<AtomicBool>,
) {
    tokio::spawn(async move {
        let mut killed = false;
        let exit_code = loop {
            if session.cancelled.load(Ordering::SeqCst) && !killed {
                #[cfg(unix)]
                if session.scoped_lifetime {
                    if let Some(pid) = session.pid {
                        unsafe {
                            libc::kill(-(pid as i32), libc::SIGTERM);
                        }
                    }
                }
                let _ = child.kill();
                killed = true;
            }
            match child.try_wait() {
                Ok(Some(status)) => {
                    if killed || session.cancelled.load(Ordering::SeqCst) {
                        break -1;
                    }
                    break status.exit_code() as i32;
                }
                Ok(None) => tokio::time::sleep(CHILD_POLL_INTERVAL).await,
                Err(_) => break -1,
            }
        };

        // Stop the pump and join it: the termination event must come
        // after the session's last output reached the ring buffer.
        session.active.store(false, Ordering::SeqCst);
        session.cancel();
        let _ = pump.await;
        session.close_pty();

        // The id leaves the map before the event goes out.
        sessions.write().unwrap().remove(&session.id);

        if !shutting_down.load(Ordering::SeqCst) {
            if let Some(tx) = events {
                let _ = tx.send(PtyEvent::SessionTerminated {
                    session_id: session.id.clone(),
                    exit_code,
                });
            }
        }
    });
}

#[cfg(unix)]
fn set_nonblocking(fd: Option<std::os::unix::io::RawFd>) {
    if let Some(fd) = fd {
        unsafe {
            let flags = libc::fcntl(fd, libc::F_GETFL, 0);
            if flags != -1 {
                libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn stub_session(id: &str, active: bool) -> Arc<PtySession> {
        Arc::new(PtySession {
            id: id.to_string(),
            project: Some("proj".to_string()),
            worktree_id: None,
            worktree_path: None,
            scoped_lifetime: false,
            pid: None,
            active: AtomicBool::new(active),
            cancelled: AtomicBool::new(false),
            output: RingBuffer::with_default_capacity(),
            master: Mutex::new(None),
            writer: Mutex::new(None),
        })
    }

    fn manager_with_stub(id: &str, active: bool) -> (PtySessionManager, mpsc::UnboundedReceiver<PtyEvent>) {
        let (manager, rx) = PtySessionManager::new();
        manager
            .sessions
            .write()
            .unwrap()
            .insert(id.to_string(), stub_session(id, active));
        (manager, rx)
    }

    // -- Shell resolution -----------------------------------------------------

    #[test]
    fn test_claude_without_flake_resumes_directly() {
        let dir = TempDir::new().unwrap();
        let argv = resolve_shell_command("claude", dir.path(), false);
        assert_eq!(argv, vec!["claude", "-c"]);
        assert_eq!(argv.len(), 2);
    }

    #[test]
    fn test_claude_with_flake_wraps_in_nix_develop() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("flake.nix"), "{}").unwrap();

        let argv = resolve_shell_command("claude", dir.path(), false);
        assert_eq!(argv, vec!["nix", "develop", "--command", "claude", "-c"]);
        assert_eq!(argv.len(), 5);
        assert_eq!(argv[0], "nix");
    }

    #[test]
    fn test_claude_dash_c_resolves_like_claude() {
        let dir = TempDir::new().unwrap();
        let argv = resolve_shell_command("claude -c", dir.path(), false);
        assert_eq!(argv, vec!["claude", "-c"]);
    }

    #[test]
    fn test_empty_command_is_plain_zsh() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_shell_command("", dir.path(), false), vec!["zsh"]);
        assert_eq!(resolve_shell_command("zsh", dir.path(), false), vec!["zsh"]);
    }

    #[test]
    fn test_worktree_shell_is_interactive() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            resolve_shell_command("", dir.path(), true),
            vec!["zsh", "-i"]
        );
    }

    #[test]
    fn test_nvim_spawns_directly_outside_worktrees() {
        let dir = TempDir::new().unwrap();
        assert_eq!(resolve_shell_command("nvim", dir.path(), false), vec!["nvim"]);
    }

    #[test]
    fn test_arbitrary_command_runs_under_zsh() {
        let dir = TempDir::new().unwrap();
        assert_eq!(
            resolve_shell_command("git status", dir.path(), false),
            vec!["zsh", "-c", "git status"]
        );
    }

    // -- Environment synthesis ------------------------------------------------

    #[test]
    fn test_env_mimics_tmux_child() {
        let env = tmux_like_env(120, 30);
        let get = |key: &str| {
            env.iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("TERM"), Some("screen-256color"));
        assert_eq!(get("TMUX"), Some("/tmp/tmux-501/default,12345,0"));
        assert_eq!(get("TMUX_PANE"), Some("%0"));
        assert_eq!(get("COLUMNS"), Some("120"));
        assert_eq!(get("LINES"), Some("30"));
        assert_eq!(get("SHLVL"), Some("1"));
        // PATH is inherited on any sane system.
        assert!(get("PATH").is_some());
    }

    // -- UTF-8 streaming ------------------------------------------------------

    #[test]
    fn test_drain_splits_incomplete_sequence() {
        let output = RingBuffer::with_default_capacity();
        let mut carry: Vec<u8> = Vec::new();

        // "héllo" split mid-codepoint across two chunks.
        let bytes = "héllo".as_bytes();
        carry.extend_from_slice(&bytes[..2]); // 'h' + first byte of 'é'
        drain_valid_utf8(&output, &mut carry);
        assert_eq!(output.read(), b"h");
        assert_eq!(carry.len(), 1);

        carry.extend_from_slice(&bytes[2..]);
        drain_valid_utf8(&output, &mut carry);
        assert_eq!(output.read(), "héllo".as_bytes());
        assert!(carry.is_empty());
    }

    #[test]
    fn test_drain_replaces_invalid_bytes() {
        let output = RingBuffer::with_default_capacity();
        let mut carry: Vec<u8> = vec![b'a', 0xFF, b'b'];

        drain_valid_utf8(&output, &mut carry);
        let text = String::from_utf8(output.read()).unwrap();
        assert_eq!(text, "a\u{FFFD}b");
        assert!(carry.is_empty());
    }

    // -- Error paths ----------------------------------------------------------

    #[test]
    fn test_write_to_unknown_session() {
        let (manager, _rx) = PtySessionManager::new();
        let err = manager.write_to_session("nope", b"x").unwrap_err();
        assert!(format!("{}", err).contains("session not found"));
    }

    #[test]
    fn test_write_to_inactive_session() {
        let (manager, _rx) = manager_with_stub("s1", false);
        let err = manager.write_to_session("s1", b"x").unwrap_err();
        assert!(format!("{}", err).contains("session is not active"));
    }

    #[test]
    fn test_resize_unknown_session() {
        let (manager, _rx) = PtySessionManager::new();
        let err = manager.resize_session_immediate("nope", 80, 24).unwrap_err();
        assert!(format!("{}", err).contains("session not found"));
    }

    #[test]
    fn test_resize_inactive_session() {
        let (manager, _rx) = manager_with_stub("s1", false);
        let err = manager.resize_session_immediate("s1", 80, 24).unwrap_err();
        assert!(format!("{}", err).contains("session is not active"));
    }

    #[test]
    fn test_deferred_resize_resolves_at_invocation_time() {
        let (manager, _rx) = manager_with_stub("s1", true);
        let deferred = manager.resize_session("s1", 80, 24);

        // The session disappears before the deferred command runs.
        manager.sessions.write().unwrap().remove("s1");
        let err = deferred().unwrap_err();
        assert!(format!("{}", err).contains("session not found"));
    }

    #[test]
    fn test_get_output_of_stub_session() {
        let (manager, _rx) = manager_with_stub("s1", true);
        manager
            .get_session("s1")
            .unwrap()
            .output
            .write(b"some output");

        assert_eq!(manager.get_session_output("s1").unwrap(), b"some output");
        // Reads do not consume.
        assert_eq!(manager.get_session_output("s1").unwrap(), b"some output");
    }

    // -- Validation gate ------------------------------------------------------

    #[test]
    fn test_create_session_rejects_unvalidated_command() {
        let (manager, _rx) = PtySessionManager::new();
        let project = Project::new("proj", "/tmp");

        let err = manager.create_session(&project, "rm -rf /").unwrap_err();
        assert!(format!("{}", err).contains("command not in whitelist"));
        assert_eq!(manager.session_count(), 0);
    }

    // -- Shutdown -------------------------------------------------------------

    #[test]
    fn test_create_after_shutdown_fails_cleanly() {
        let (manager, mut rx) = PtySessionManager::new();
        manager.shutdown();

        let project = Project::new("proj", "/tmp");
        assert!(manager.create_session(&project, "").is_err());

        // Channel closed, nothing was written to it.
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_shutdown_deactivates_sessions() {
        let (manager, _rx) = manager_with_stub("s1", true);
        manager.shutdown();

        assert!(manager.is_shutting_down());
        let session = manager.get_session("s1").unwrap();
        assert!(!session.is_active());
        assert!(session.cancelled.load(Ordering::SeqCst));
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let (manager, _rx) = PtySessionManager::new();
        manager.shutdown();
        manager.shutdown();
        assert!(manager.is_shutting_down());
    }
}
