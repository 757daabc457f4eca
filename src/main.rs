//! vc-console - command line front end for a Volttron Central instance
//!
//! Every command builds one `Console`, restores the saved session and runs
//! the matching action creators, then prints what the stores hold.
//!
//! Module structure:
//! - `domain/` - Core data types (Platform, Chart, PanelNode, Action)
//! - `io/` - JSON-RPC transport and exchange bookkeeping
//! - `services/` - Stores reducing dispatched actions
//! - `actions/` - Async action creators
//! - `infra/` - Config, dispatcher, store plumbing, session storage

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use vc_console::actions::{ChartPoller, RegistrationMethod};
use vc_console::domain::{NodeType, Status};
use vc_console::infra::Config;
use vc_console::services::panel_items::platform_path;
use vc_console::Console;

/// Volttron Central console
#[derive(Parser, Debug)]
#[command(name = "vc-console", version, about)]
struct Args {
    /// Path to TOML configuration file (default: $CONFIG_FILE, then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and keep the session token
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Drop the saved session
    Logout,
    /// List registered platforms and their agents
    Platforms,
    /// Print the platforms panel tree
    Tree {
        /// Only load this platform's children
        #[arg(long)]
        platform: Option<String>,
        /// Filter term, e.g. `temp` or `type:point`
        #[arg(long, default_value = "")]
        filter: String,
        /// Status filter: GOOD, BAD or UNKNOWN
        #[arg(long, default_value = "")]
        status: String,
    },
    /// List the saved charts
    Charts,
    /// Poll a saved chart and print its latest values until Ctrl+C
    Watch { chart_key: String },
    /// Register a platform
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        address: String,
        /// `discovery` or `advanced`
        #[arg(long, default_value = "discovery")]
        method: String,
    },
    /// Deregister a platform by uuid
    Deregister { platform: String },
    /// Start an agent
    StartAgent { platform: String, agent: String },
    /// Stop an agent
    StopAgent { platform: String, agent: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Default: INFO, use RUST_LOG=debug to see every exchange
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(|| Config::resolve_config_path(&[]));
    let config = Config::load_from_path(&config_path);
    info!(
        git_hash = env!("GIT_HASH"),
        config_file = %config.config_file(),
        server_url = %config.server_url(),
        session_file = %config.session_file().display(),
        "vc_console_starting"
    );

    let console = Arc::new(Console::new(config)?);
    let result = run(&console, args.command).await;
    print_banner(&console);
    result
}

async fn run(console: &Arc<Console>, command: Command) -> anyhow::Result<()> {
    let manager = console.platform_manager();

    match command {
        Command::Login { username, password } => {
            manager.request_authorization(&username, &password).await?;
            require_session(console)?;
            print_platforms(console);
        }
        Command::Logout => {
            manager.clear_authorization()?;
            println!("Logged out.");
        }
        Command::Platforms => {
            require_session(console)?;
            manager.initialize().await?;
            print_platforms(console);
        }
        Command::Tree { platform, filter, status } => {
            require_session(console)?;
            manager.initialize().await?;
            let uuids: Vec<String> = match platform {
                Some(uuid) => vec![uuid],
                None => console.platforms().read().get_platforms().iter().map(|p| p.uuid.clone()).collect(),
            };
            let panel = console.platforms_panel_actions();
            for uuid in &uuids {
                panel.load_children(NodeType::Platform, uuid).await?;
            }
            if !filter.is_empty() || !status.is_empty() {
                panel.load_filtered_items(&filter, &status)?;
            }
            print_tree(console, &uuids);
        }
        Command::Charts => {
            require_session(console)?;
            manager.initialize().await?;
            print_charts(console);
        }
        Command::Watch { chart_key } => {
            require_session(console)?;
            manager.initialize().await?;
            watch_chart(console, chart_key).await?;
        }
        Command::Register { name, address, method } => {
            require_session(console)?;
            let method: RegistrationMethod = method.parse().map_err(anyhow::Error::msg)?;
            manager.register_platform(&name, &address, method).await?;
        }
        Command::Deregister { platform } => {
            require_session(console)?;
            manager.initialize().await?;
            let found = console.platforms().read().get_platform(&platform).cloned();
            let Some(platform) = found else {
                bail!("Unknown platform {platform}");
            };
            manager.deregister_platform(&platform).await?;
        }
        Command::StartAgent { platform, agent } => {
            require_session(console)?;
            manager.initialize().await?;
            console.platform().start_agent(&platform, &agent).await?;
            print_platforms(console);
        }
        Command::StopAgent { platform, agent } => {
            require_session(console)?;
            manager.initialize().await?;
            console.platform().stop_agent(&platform, &agent).await?;
            print_platforms(console);
        }
    }
    Ok(())
}

fn require_session(console: &Console) -> anyhow::Result<()> {
    if console.authorization().read().get_authorization().is_none() {
        bail!("Not logged in; run `vc-console login` first");
    }
    Ok(())
}

async fn watch_chart(console: &Arc<Console>, chart_key: String) -> anyhow::Result<()> {
    let Some(chart) = console.charts().read().get_chart(&chart_key) else {
        bail!("No saved chart named {chart_key}");
    };
    if chart.refresh_interval.is_none() {
        warn!(chart = %chart_key, "chart_refresh_off");
    }

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    let mut changes = console.charts().subscribe();
    let poller = ChartPoller::spawn(Arc::clone(console), chart_key.clone());
    loop {
        tokio::select! {
            changed = changes.changed() => {
                changed.context("Chart store closed")?;
                print_latest(console, &chart_key);
                if poller.is_finished() {
                    warn!(chart = %chart_key, "chart_no_longer_available");
                    break;
                }
            }
            _ = shutdown_rx.changed() => break,
        }
    }
    poller.stop().await;
    Ok(())
}

fn print_banner(console: &Console) {
    let store = console.status_indicator_store().read();
    if let (Some(status), Some(message)) = (store.get_status(), store.get_status_message()) {
        eprintln!("[{}] {}", status.as_str(), message);
    }
}

fn status_text(status: Option<Status>) -> &'static str {
    status.map(|s| s.label()).unwrap_or("-")
}

fn print_platforms(console: &Console) {
    let platforms = console.platforms().read();
    for platform in platforms.get_platforms() {
        println!("{}  {}", platform.uuid, platform.name);
        for agent in platform.agents.iter().flatten() {
            let state = if agent.is_running() { "running" } else { "stopped" };
            println!("    {:<36}  {:<30}  {}", agent.uuid, agent.name, state);
        }
    }
}

fn print_tree(console: &Console, uuids: &[String]) {
    let items = console.panel_items().read();
    for uuid in uuids {
        print_node(&items, &platform_path(uuid), 0);
    }
}

fn print_node(items: &vc_console::services::PlatformsPanelItemsStore, path: &[String], depth: usize) {
    let Some(node) = items.get_item(path) else {
        return;
    };
    if !node.visible {
        return;
    }
    let mark = match node.point() {
        Some(point) if point.checked => "[x] ",
        Some(_) => "[ ] ",
        None => "",
    };
    println!("{:indent$}{}{}  ({})", "", mark, node.name, status_text(node.status), indent = depth * 2);
    for child in items.get_children_sorted(path) {
        print_node(items, &child.path, depth + 1);
    }
}

fn print_charts(console: &Console) {
    let charts = console.charts().read();
    for chart in charts.get_data() {
        let refresh = chart.refresh_interval.map(|ms| format!("{ms} ms")).unwrap_or_else(|| "off".to_string());
        println!(
            "{}  type={} refresh={} length={} pinned={}",
            chart.chart_key, chart.chart_type, refresh, chart.data_length, chart.pinned
        );
        for series in &chart.series {
            println!("    {}  {}", series.topic, series.parent_path);
        }
    }
}

fn print_latest(console: &Console, chart_key: &str) {
    let Some(chart) = console.charts().read().get_chart(chart_key) else {
        return;
    };
    for series in &chart.series {
        match series.data.last() {
            Some(sample) => println!("{}  {}", series.topic, sample.value),
            None => println!("{}  -", series.topic),
        }
    }
}
