//! Host-terminal raw-mode control.
//!
//! Raw mode routes keystrokes straight to whichever internal PTY session
//! has focus. Enable/restore are idempotent against a stored prior-state
//! slot, and the guard restores on drop so a panic never leaves the
//! user's shell in raw mode.

use std::io;

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Idempotent raw-mode switch for the controlling terminal's stdin.
#[derive(Debug, Default)]
pub struct RawModeGuard {
    enabled: bool,
}

impl RawModeGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put stdin into raw mode. A no-op when already raw.
    pub fn enable(&mut self) -> io::Result<()> {
        if !self.enabled {
            enable_raw_mode()?;
            self.enabled = true;
        }
        Ok(())
    }

    /// Restore the saved terminal state. A no-op when not raw.
    pub fn restore(&mut self) -> io::Result<()> {
        if self.enabled {
            disable_raw_mode()?;
            self.enabled = false;
        }
        Ok(())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // Best-effort restore; ignore errors.
        let _ = self.restore();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_disabled() {
        let guard = RawModeGuard::new();
        assert!(!guard.is_enabled());
    }

    #[test]
    fn test_restore_without_enable_is_noop() {
        let mut guard = RawModeGuard::new();
        // Never enabled: restore must not touch the terminal or fail.
        assert!(guard.restore().is_ok());
        assert!(!guard.is_enabled());
    }
}
