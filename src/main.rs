use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;

use feedview::api::{EntryState, FeedPk, HttpApi, Order};
use feedview::app::{App, AppEvent};
use feedview::config::Config;
use feedview::ui;
use feedview::view::{DisplayMode, ViewEvent};

/// Get the config directory path (~/.config/feedview/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    let config_dir = PathBuf::from(home).join(".config").join("feedview");
    Ok(config_dir)
}

#[derive(Parser, Debug)]
#[command(name = "feedview", about = "Terminal client for yarr feed readers")]
struct Args {
    /// Root of the yarr JSON API (overrides config)
    #[arg(long, value_name = "URL")]
    api_url: Option<String>,

    /// Show only this feed
    #[arg(long, value_name = "PK")]
    feed: Option<i64>,

    /// Entry filter: all, unread, read or saved
    #[arg(long, value_parser = parse_state, default_value = "all")]
    state: StateFilter,

    /// Sort order: asc or desc
    #[arg(long, value_parser = parse_order, default_value = "desc")]
    order: Order,

    /// Display mode: expanded or list (overrides config)
    #[arg(long, value_parser = parse_mode)]
    mode: Option<DisplayMode>,

    /// Config file (default: ~/.config/feedview/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

/// `None` shows entries in every state.
#[derive(Debug, Clone, Copy)]
struct StateFilter(Option<EntryState>);

fn parse_state(s: &str) -> Result<StateFilter, String> {
    match s {
        "all" => Ok(StateFilter(None)),
        other => EntryState::from_name(other)
            .map(|state| StateFilter(Some(state)))
            .ok_or_else(|| format!("unknown state '{}' (all, unread, read, saved)", other)),
    }
}

fn parse_order(s: &str) -> Result<Order, String> {
    match s {
        "asc" => Ok(Order::Asc),
        "desc" => Ok(Order::Desc),
        other => Err(format!("unknown order '{}' (asc, desc)", other)),
    }
}

fn parse_mode(s: &str) -> Result<DisplayMode, String> {
    DisplayMode::from_name(s).ok_or_else(|| format!("unknown mode '{}' (expanded, list)", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up config directory
    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
    }

    // SEC-007: Set directory permissions on Unix (user-only access)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = std::fs::metadata(&config_dir) {
            let mut perms = metadata.permissions();
            perms.set_mode(0o700);
            // Logging is not up yet; a failure here is not fatal
            let _ = std::fs::set_permissions(&config_dir, perms);
        }
    }

    // The terminal belongs to the TUI, so logs go to a file
    let log_path = config_dir.join("feedview.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .init();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| config_dir.join("config.toml"));
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let api_url = args.api_url.clone().or_else(|| config.api_url.clone());
    let api = HttpApi::new(
        api_url.as_deref(),
        config.session_secret(),
        config.request_timeout(),
    )
    .context("Failed to create API client")?;
    if !api.is_enabled() {
        tracing::warn!("No API URL configured, starting with the API disabled");
        eprintln!("Warning: no API URL configured; pass --api-url or set api_url in config.toml");
    }

    let mut options = config.view_options();
    options.order = args.order;
    options.state = args.state.0;
    if let Some(mode) = args.mode {
        options.mode = mode;
    }

    let (view_tx, view_rx) = mpsc::channel::<ViewEvent>(32);
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);

    let mut app = App::new(Arc::new(api), view_tx, options, config.show_feeds);
    for warning in app.keybindings.apply_overrides(&config.keybindings) {
        tracing::warn!("{}", warning);
    }

    app.load_feed_directory(&event_tx);
    app.view.load_feed(args.feed.map(FeedPk));

    // Run the TUI
    ui::run(&mut app, view_rx, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}
