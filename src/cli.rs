use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// tmux-aware workspace controller for Claude Code sessions
#[derive(Parser, Debug)]
#[command(name = "ccmux", about = "tmux-aware workspace controller for Claude Code sessions")]
pub struct Cli {
    /// Write debug info to stderr.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    /// Path to config file
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inventory all panes of the running tmux server
    Panes(PanesArgs),
    /// List tmux sessions and their windows
    Sessions,
    /// Attach or switch to a pane or window
    Attach(AttachArgs),
    /// Reorganize panes into per-shell or per-project windows
    Layout(LayoutArgs),
    /// Watch tracked panes for Claude activity and print transitions
    Watch(WatchArgs),
}

#[derive(Args, Debug)]
pub struct PanesArgs {
    /// Project root to map panes against (repeatable): NAME=PATH
    #[arg(long = "project", value_name = "NAME=PATH")]
    pub projects: Vec<String>,
}

#[derive(Args, Debug)]
pub struct AttachArgs {
    /// Target session name
    pub session: String,

    /// Window index within the session
    #[arg(long, default_value_t = 0)]
    pub window: usize,

    /// Pane index within the window
    #[arg(long)]
    pub pane: Option<usize>,
}

#[derive(Args, Debug)]
pub struct LayoutArgs {
    /// Layout mode to apply
    #[arg(value_enum)]
    pub mode: LayoutModeArg,

    /// Project root to group panes by (repeatable): NAME=PATH
    #[arg(long = "project", value_name = "NAME=PATH")]
    pub projects: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, ValueEnum)]
pub enum LayoutModeArg {
    /// One window per pane, named "<project>:<shell>"
    Unsplit,
    /// One window per project
    Grouped,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Pane targets to watch (defaults to every discovered pane)
    pub targets: Vec<String>,
}

/// Parse a repeatable `NAME=PATH` project flag value.
pub fn parse_project_flag(value: &str) -> Option<(String, PathBuf)> {
    let (name, path) = value.split_once('=')?;
    if name.is_empty() || path.is_empty() {
        return None;
    }
    Some((name.to_string(), PathBuf::from(path)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_project_flag() {
        let (name, path) = parse_project_flag("proj=/home/u/proj").unwrap();
        assert_eq!(name, "proj");
        assert_eq!(path, PathBuf::from("/home/u/proj"));

        assert!(parse_project_flag("no-equals").is_none());
        assert!(parse_project_flag("=path").is_none());
    }

    #[test]
    fn test_cli_parses_layout_mode() {
        let cli = Cli::parse_from(["ccmux", "layout", "grouped"]);
        match cli.command {
            Some(Commands::Layout(args)) => assert_eq!(args.mode, LayoutModeArg::Grouped),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_cli_parses_attach_pane() {
        let cli = Cli::parse_from(["ccmux", "attach", "dev", "--window", "2", "--pane", "1"]);
        match cli.command {
            Some(Commands::Attach(args)) => {
                assert_eq!(args.session, "dev");
                assert_eq!(args.window, 2);
                assert_eq!(args.pane, Some(1));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
