//! Parsing of tmux discovery output.
//!
//! Discovery issues a single `list-panes -a` per pass with a
//! colon-delimited format string and parses each line into a
//! [`ParsedPane`]. The four trailing fields (command, path, active flag,
//! tty) are positional, so a pane title that itself contains `:` is
//! rejoined from the middle fields. Lines with fewer than eight fields
//! are logged and skipped; discovery prefers a partial view to no view.

use std::path::PathBuf;

use crate::error::Result;
use crate::executor::TmuxExecutor;

// ---------------------------------------------------------------------------
// Format strings
// ---------------------------------------------------------------------------

/// Format for the all-panes inventory.
pub const PANE_FORMAT: &str = "#{session_name}:#{window_index}:#{pane_index}:#{pane_title}:#{pane_current_command}:#{pane_current_path}:#{pane_active}:#{pane_tty}";

/// Format for the session listing.
pub const SESSION_FORMAT: &str = "#{session_name}:#{pane_current_path}";

/// Format for per-session window listings.
pub const WINDOW_FORMAT: &str =
    "#{window_index}:#{window_name}:#{pane_current_command}:#{pane_title}:#{window_active}";

// ---------------------------------------------------------------------------
// ParsedPane
// ---------------------------------------------------------------------------

/// One successfully parsed `list-panes` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPane {
    pub session_name: String,
    pub window_index: usize,
    pub pane_index: usize,
    pub pane_title: String,
    pub current_command: String,
    pub current_path: PathBuf,
    pub active: bool,
    pub pane_tty: String,
}

/// One successfully parsed `list-windows` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedWindow {
    pub index: usize,
    pub name: String,
    pub command: String,
    pub pane_title: String,
    pub active: bool,
}

// ---------------------------------------------------------------------------
// Raw listings
// ---------------------------------------------------------------------------

/// Raw bytes of the all-panes inventory (for change-detection caching).
pub fn list_panes_raw(executor: &dyn TmuxExecutor) -> Result<Vec<u8>> {
    executor.execute(&["list-panes", "-a", "-F", PANE_FORMAT])
}

/// Raw bytes of the session listing.
pub fn list_sessions_raw(executor: &dyn TmuxExecutor) -> Result<Vec<u8>> {
    executor.execute(&["list-sessions", "-F", SESSION_FORMAT])
}

// ---------------------------------------------------------------------------
// Line parsers
// ---------------------------------------------------------------------------

/// Parse one pane line. Returns `None` (with an optional warning) for
/// malformed lines.
pub fn parse_pane_line(line: &str, verbose: bool) -> Option<ParsedPane> {
    let parts: Vec<&str> = line.split(':').collect();
    if parts.len() < 8 {
        if verbose && !line.trim().is_empty() {
            eprintln!("ccmux: warning: skipping malformed pane line: {}", line);
        }
        return None;
    }

    let n = parts.len();
    let window_index = match parts[1].parse::<usize>() {
        Ok(i) => i,
        Err(_) => {
            if verbose {
                eprintln!("ccmux: warning: bad window index in pane line: {}", line);
            }
            return None;
        }
    };
    let pane_index = match parts[2].parse::<usize>() {
        Ok(i) => i,
        Err(_) => {
            if verbose {
                eprintln!("ccmux: warning: bad pane index in pane line: {}", line);
            }
            return None;
        }
    };

    Some(ParsedPane {
        session_name: parts[0].to_string(),
        window_index,
        pane_index,
        // Titles may embed ':'; everything between the fixed head and the
        // four fixed trailing fields belongs to the title.
        pane_title: parts[3..n - 4].join(":"),
        current_command: parts[n - 4].to_string(),
        current_path: PathBuf::from(parts[n - 3]),
        active: parts[n - 2] == "1",
        pane_tty: parts[n - 1].to_string(),
    })
}

/// Parse the full all-panes output into pane records.
pub fn parse_pane_lines(text: &str, verbose: bool) -> Vec<ParsedPane> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(|l| parse_pane_line(l, verbose))
        .collect()
}

/// Parse one session line into `(name, first_pane_path)`.
pub fn parse_session_line(line: &str) -> Option<(String, PathBuf)> {
    let (name, path) = line.split_once(':')?;
    if name.is_empty() {
        return None;
    }
    Some((name.to_string(), PathBuf::from(path)))
}

/// Parse the session listing output.
pub fn parse_session_lines(text: &str) -> Vec<(String, PathBuf)> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(parse_session_line)
        .collect()
}

/// Parse one window line.
///
/// Window names the manager creates embed `:` (`"proj:zsh"`), so extra
/// fields are folded back into the name; the trailing three fields are
/// positional.
pub fn parse_window_line(line: &str) -> Option<ParsedWindow> {
    let parts: Vec<&str> = line.split(':').collect();
    if parts.len() < 5 {
        return None;
    }
    let n = parts.len();
    Some(ParsedWindow {
        index: parts[0].parse().ok()?,
        name: parts[1..n - 3].join(":"),
        command: parts[n - 3].to_string(),
        pane_title: parts[n - 2].to_string(),
        active: parts[n - 1] == "1",
    })
}

/// Parse a full `list-windows` output.
pub fn parse_window_lines(text: &str) -> Vec<ParsedWindow> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(parse_window_line)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
