use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::{io, time::Duration};

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::prelude::*;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use hackers::app::{self, App};
use hackers::config::{Config, ThemeKind};
use hackers::source::{HackerNewsService, PostType};

#[derive(Parser, Debug)]
#[command(name = "hackers", version, about = "Read Hacker News in the terminal")]
struct Args {
    /// Feed to open: news, newest, ask, show or jobs
    #[arg(long)]
    post_type: Option<PostType>,

    /// Config file (default: ~/.config/hackers/hackers.conf)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log file (default: hackers/hackers.log in the user data dir)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Use the light theme
    #[arg(long)]
    light: bool,
}

/// Logs go to a file: the terminal belongs to the UI. Without a usable file
/// nothing is logged.
fn init_logging(path: Option<PathBuf>) {
    let Some(path) = path.or_else(|| dirs::data_dir().map(|d| d.join("hackers/hackers.log"))) else {
        return;
    };
    if let Some(dir) = path.parent() {
        let _ = std::fs::create_dir_all(dir);
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };
    let filter = EnvFilter::try_from_env("HACKERS_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
}

async fn run<B: Backend>(terminal: &mut Terminal<B>, args: Args) -> Result<()> {
    let config_path = args.config.or_else(Config::default_path);
    let mut config = config_path.as_deref().map(Config::load).unwrap_or_default();
    if let Some(post_type) = args.post_type {
        config.post_type = post_type;
    }
    let theme_override = args.light.then_some(ThemeKind::Light);
    if let Some(kind) = theme_override {
        config.theme = kind;
    }
    tracing::info!(?config, "starting");

    let (action_tx, action_rx) = mpsc::unbounded_channel();
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let source = Arc::new(HackerNewsService::new(config.page_size));
    let mut app = App::new(&config, action_tx);
    tokio::spawn(app::run_network_loop(source, action_rx, event_tx.clone()));
    if let Some(path) = config_path {
        tokio::spawn(app::run_config_watcher(path, theme_override, event_tx));
    }
    app.load_posts();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| hackers::ui::ui(f, &mut app))?;
        if event::poll(tick_rate.checked_sub(last_tick.elapsed()).unwrap_or(Duration::from_secs(0)))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key(key.code) {
                    break;
                }
            }
        }
        while let Ok(e) = event_rx.try_recv() {
            app.on_network_event(e);
        }
        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = std::time::Instant::now();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.clone());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, args).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    if let Err(err) = &result {
        tracing::error!(%err, "exiting with error");
    }
    result
}
