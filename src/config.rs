//! Configuration loading and merging.
//!
//! Settings come from three layers, strongest first: CLI flags, the TOML
//! config file (`~/.config/ccmux/config.toml` by default), and built-in
//! defaults. Missing keys fall through; unknown keys are ignored.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::cli::Cli;

// ---------------------------------------------------------------------------
// TOML-deserializable config (intermediate representation)
// ---------------------------------------------------------------------------

/// Raw config as parsed from the TOML file.
/// All fields are optional so that missing keys fall through to defaults.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileConfig {
    verbose: Option<bool>,
    monitor: FileMonitorConfig,
    pty: FilePtyConfig,
    tmux: FileTmuxConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileMonitorConfig {
    poll_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FilePtyConfig {
    cols: Option<u16>,
    rows: Option<u16>,
    output_buffer_bytes: Option<usize>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct FileTmuxConfig {
    nav_script: Option<PathBuf>,
    screenshot_command: Option<String>,
}

// ---------------------------------------------------------------------------
// Effective (merged) config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub verbose: bool,
    pub monitor: MonitorConfig,
    pub pty: PtyConfig,
    pub tmux: TmuxConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonitorConfig {
    pub poll_interval_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PtyConfig {
    pub cols: u16,
    pub rows: u16,
    pub output_buffer_bytes: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TmuxConfig {
    pub nav_script: Option<PathBuf>,
    pub screenshot_command: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            monitor: MonitorConfig::default(),
            pty: PtyConfig::default(),
            tmux: TmuxConfig::default(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
        }
    }
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            cols: 120,
            rows: 30,
            output_buffer_bytes: 64 * 1024,
        }
    }
}

impl Default for TmuxConfig {
    fn default() -> Self {
        Self {
            nav_script: None,
            screenshot_command: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Returns the default config file path: `~/.config/ccmux/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("ccmux").join("config.toml"))
}

/// Load the config file from the given path.
/// Returns `None` if the file does not exist or cannot be parsed.
fn load_file_config(path: &Path) -> Option<FileConfig> {
    if !path.exists() {
        return None;
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str::<FileConfig>(&contents) {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                eprintln!(
                    "ccmux: warning: failed to parse config file {}: {}",
                    path.display(),
                    e
                );
                None
            }
        },
        Err(e) => {
            eprintln!(
                "ccmux: warning: failed to read config file {}: {}",
                path.display(),
                e
            );
            None
        }
    }
}

/// Merge CLI flags over the config file over defaults.
pub fn build_config(cli: &Cli) -> AppConfig {
    let file = cli
        .config
        .clone()
        .or_else(default_config_path)
        .and_then(|p| load_file_config(&p))
        .unwrap_or_default();

    let defaults = AppConfig::default();

    AppConfig {
        verbose: cli.verbose || file.verbose.unwrap_or(defaults.verbose),
        monitor: MonitorConfig {
            poll_interval_ms: file
                .monitor
                .poll_interval_ms
                .unwrap_or(defaults.monitor.poll_interval_ms),
        },
        pty: PtyConfig {
            cols: file.pty.cols.unwrap_or(defaults.pty.cols),
            rows: file.pty.rows.unwrap_or(defaults.pty.rows),
            output_buffer_bytes: file
                .pty
                .output_buffer_bytes
                .unwrap_or(defaults.pty.output_buffer_bytes),
        },
        tmux: TmuxConfig {
            nav_script: file.tmux.nav_script,
            screenshot_command: file.tmux.screenshot_command,
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert!(!cfg.verbose);
        assert_eq!(cfg.monitor.poll_interval_ms, 1000);
        assert_eq!(cfg.pty.cols, 120);
        assert_eq!(cfg.pty.rows, 30);
        assert_eq!(cfg.pty.output_buffer_bytes, 64 * 1024);
        assert!(cfg.tmux.nav_script.is_none());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "verbose = true\n[pty]\ncols = 200\n[monitor]\npoll_interval_ms = 500"
        )
        .unwrap();

        let cli = Cli::parse_from(["ccmux", "--config", file.path().to_str().unwrap()]);
        let cfg = build_config(&cli);

        assert!(cfg.verbose);
        assert_eq!(cfg.pty.cols, 200);
        assert_eq!(cfg.pty.rows, 30); // untouched key keeps its default
        assert_eq!(cfg.monitor.poll_interval_ms, 500);
    }

    #[test]
    fn test_cli_verbose_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "verbose = false").unwrap();

        let cli = Cli::parse_from([
            "ccmux",
            "--verbose",
            "--config",
            file.path().to_str().unwrap(),
        ]);
        assert!(build_config(&cli).verbose);
    }

    #[test]
    fn test_unparseable_file_falls_back_to_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml [").unwrap();

        let cli = Cli::parse_from(["ccmux", "--config", file.path().to_str().unwrap()]);
        let cfg = build_config(&cli);
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "future_option = 42\n[pty]\nrows = 40").unwrap();

        let cli = Cli::parse_from(["ccmux", "--config", file.path().to_str().unwrap()]);
        let cfg = build_config(&cli);
        assert_eq!(cfg.pty.rows, 40);
    }
}
