use anyhow::Context;
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{fs::OpenOptions, io, path::Path, sync::Arc, sync::Mutex, time::Duration};
use tracing_subscriber::EnvFilter;

mod api;
mod app;
mod config;
mod contacts;
mod dashboard;
mod error;
mod forms;
mod http_api;
mod kanban_board;
mod notify;
mod profile;
mod session;
mod sync;
mod task;
mod ui;

use crate::app::App;
use crate::config::{AppConfig, Cli};
use crate::http_api::HttpApi;
use crate::session::SessionStore;
use crate::sync::SyncClient;

fn init_tracing(path: &Path) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dealtrack=info"));
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false);
    if json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from(Cli::parse());
    init_tracing(&config.log_path)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let guard = runtime.enter();

    let api = HttpApi::new(&config.api_base_url, config.request_timeout)
        .context("failed to set up the api client")?;
    tracing::info!(api = %config.api_base_url, "starting dealtrack");
    let (sync, mut events) = SyncClient::new(Arc::new(api), runtime.handle().clone());
    let mut app = App::new(
        sync,
        SessionStore::new(&config.session_path),
        config.report_url.clone(),
    );

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = ui::run_app(&mut terminal, &mut app, &mut events);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        tracing::error!(error = %err, "ui loop failed");
        eprintln!("{:?}", err);
    }
    drop(app);
    drop(guard);
    runtime.shutdown_timeout(Duration::from_millis(500));
    Ok(())
}
