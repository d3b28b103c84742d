use std::sync::Arc;

use clap::Parser;

use ccmux::activity::ActivityMonitor;
use ccmux::cli::{parse_project_flag, AttachArgs, Cli, Commands, LayoutArgs, LayoutModeArg, PanesArgs, WatchArgs};
use ccmux::config::{build_config, AppConfig};
use ccmux::error::Result;
use ccmux::executor::{CliExecutor, TmuxExecutor};
use ccmux::manager::TmuxManager;
use ccmux::navigator::Navigator;
use ccmux::pane::PsInspector;
use ccmux::project::Project;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let app_config = build_config(&cli);

    if app_config.verbose {
        eprintln!("ccmux: effective config: {:?}", app_config);
    }

    let result = match cli.command {
        Some(Commands::Panes(ref args)) => run_panes(args, &app_config),
        Some(Commands::Sessions) => run_sessions(&app_config),
        Some(Commands::Attach(ref args)) => run_attach(args),
        Some(Commands::Layout(ref args)) => run_layout(args, &app_config),
        Some(Commands::Watch(ref args)) => run_watch(args, &app_config).await,
        None => run_panes(&PanesArgs { projects: vec![] }, &app_config),
    };

    if let Err(e) = result {
        eprintln!("ccmux: {}", e);
        std::process::exit(1);
    }
}

fn build_manager(config: &AppConfig) -> TmuxManager {
    TmuxManager::new(Arc::new(CliExecutor::new()), Arc::new(PsInspector))
        .with_verbose(config.verbose)
}

fn projects_from_flags(flags: &[String]) -> Vec<Project> {
    flags
        .iter()
        .filter_map(|f| match parse_project_flag(f) {
            Some((name, path)) => Some(Project::new(&name, path)),
            None => {
                eprintln!("ccmux: warning: ignoring malformed --project flag: {}", f);
                None
            }
        })
        .collect()
}

fn run_panes(args: &PanesArgs, config: &AppConfig) -> Result<()> {
    let manager = build_manager(config);
    manager.discover_all_panes()?;
    manager.discover_existing_sessions()?;

    let mut projects = projects_from_flags(&args.projects);
    manager.map_sessions_to_projects(&mut projects)?;

    let mut panes = manager.panes();
    panes.sort_by(|a, b| a.target().cmp(&b.target()));
    for pane in panes {
        let marker = if pane.active { "*" } else { " " };
        println!(
            "{} {:<16} {:<8} {:<20} {}",
            marker,
            pane.target(),
            pane.shell_type,
            pane.project.as_deref().unwrap_or("-"),
            pane.display_title(),
        );
    }
    Ok(())
}

fn run_sessions(config: &AppConfig) -> Result<()> {
    let manager = build_manager(config);
    manager.discover_existing_sessions()?;

    let mut sessions = manager.sessions();
    sessions.sort_by(|a, b| a.name.cmp(&b.name));
    for session in sessions {
        let marker = if session.active { "*" } else { " " };
        println!(
            "{} {:<20} {}",
            marker,
            session.name,
            session.project.as_deref().unwrap_or("-"),
        );
        let mut windows: Vec<_> = session.windows.values().collect();
        windows.sort_by_key(|w| w.index);
        for window in windows {
            println!("    {}:{} [{}]", window.index, window.name, window.command);
        }
    }
    Ok(())
}

fn run_attach(args: &AttachArgs) -> Result<()> {
    let executor = CliExecutor::new();
    let navigator = Navigator::from_env();
    match args.pane {
        Some(pane) => navigator.attach_to_pane(&executor, &args.session, args.window, pane),
        None => navigator.attach_to_window(&executor, &args.session, args.window),
    }
}

fn run_layout(args: &LayoutArgs, config: &AppConfig) -> Result<()> {
    let manager = build_manager(config);
    manager.discover_all_panes()?;

    let mut projects = projects_from_flags(&args.projects);
    manager.map_sessions_to_projects(&mut projects)?;

    match args.mode {
        LayoutModeArg::Unsplit => manager.apply_unsplit_layout(),
        LayoutModeArg::Grouped => manager.apply_grouped_layout(),
    }
}

async fn run_watch(args: &WatchArgs, config: &AppConfig) -> Result<()> {
    let executor: Arc<dyn TmuxExecutor> = Arc::new(CliExecutor::new());
    let manager = TmuxManager::new(Arc::clone(&executor), Arc::new(PsInspector))
        .with_verbose(config.verbose);

    let targets = if args.targets.is_empty() {
        manager.discover_all_panes()?;
        manager.pane_targets()
    } else {
        args.targets.clone()
    };

    let monitor = Arc::new(
        ActivityMonitor::new(executor)
            .with_interval(std::time::Duration::from_millis(config.monitor.poll_interval_ms)),
    );
    monitor.set_callback(Arc::new(|target, status| {
        if status.active {
            if status.duration_text.is_empty() {
                println!("{} active", target);
            } else {
                println!("{} active {}", target, status.duration_text);
            }
        } else {
            println!("{} idle", target);
        }
    }));
    monitor.set_panes(targets);
    monitor.start();

    tokio::signal::ctrl_c().await?;
    monitor.stop();
    Ok(())
}
