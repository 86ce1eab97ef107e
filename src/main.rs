// src/main.rs
use std::{fs, io, path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context;
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use quickexplain::background::{self, RequestGate};
use quickexplain::config::{Overrides, Settings};
use quickexplain::content::ContentScript;
use quickexplain::input::App;
use quickexplain::network::HttpExplainer;
use quickexplain::page::Page;
use quickexplain::popup::Popup;
use quickexplain::prefs::{FileStore, PreferenceStore};
use quickexplain::theme::Theme;
use quickexplain::ui;

const TICK: Duration = Duration::from_millis(50);

#[derive(Parser, Debug)]
#[command(name = "quickexplain", version, about = "Select text, get a short explanation")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Text file to open as the page
    page: Option<PathBuf>,

    /// Base URL of the explain service
    #[arg(long)]
    endpoint: Option<String>,

    /// Where the on/off preference is stored
    #[arg(long)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Turn explanations on
    Enable,
    /// Turn explanations off
    Disable,
    /// Show whether explanations are on
    Status,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let overrides = Overrides {
        endpoint: cli.endpoint.clone(),
        storage_path: cli.storage.clone(),
    };
    let settings = Settings::new(&overrides).context("failed to load configuration")?;
    init_tracing(&settings)?;

    let storage_path = settings
        .storage_path()
        .context("could not determine where to store preferences")?;
    let store: Arc<dyn PreferenceStore> = Arc::new(FileStore::new(storage_path));
    let popup = Popup::new(store.clone());

    match cli.command {
        Some(Command::Enable) => {
            popup.set_checked(true)?;
            println!("QuickExplain is on");
            return Ok(());
        }
        Some(Command::Disable) => {
            popup.set_checked(false)?;
            println!("QuickExplain is off");
            return Ok(());
        }
        Some(Command::Status) => {
            let state = if popup.checked()? { "on" } else { "off" };
            println!("QuickExplain is {state}");
            return Ok(());
        }
        None => {}
    }

    let Some(path) = cli.page else {
        anyhow::bail!("no page given, try `quickexplain <FILE>`");
    };
    let text = fs::read_to_string(&path).with_context(|| format!("could not read {}", path.display()))?;

    let rt = Runtime::new()?;
    let shutdown = CancellationToken::new();
    let gate = RequestGate::new(Arc::new(HttpExplainer::new(&settings.endpoint)));
    let handle = background::spawn(rt.handle(), gate, shutdown.clone());
    let content = ContentScript::new(store, handle, rt.handle().clone(), settings.limits(), settings.layout());

    let (cols, rows) = terminal::size()?;
    let page = Page::new(&text, cols, rows.saturating_sub(1));
    let mut app = App::new(page, content, popup);
    info!(page = %path.display(), endpoint = %settings.endpoint, "starting");

    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app);

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    app.content.dismiss();
    shutdown.cancel();
    result
}

fn run<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> anyhow::Result<()> {
    let theme = Theme::default();
    loop {
        app.content.tick();
        terminal.draw(|f| ui::render(f, app, &theme))?;

        if event::poll(TICK)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key.code),
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                Event::Resize(cols, rows) => app.page.resize(cols, rows.saturating_sub(1)),
                _ => {}
            }
        }

        if app.should_quit() {
            return Ok(());
        }
    }
}

/// Logs go to a daily rolling file; the terminal belongs to the UI.
fn init_tracing(settings: &Settings) -> anyhow::Result<()> {
    let Some(log_dir) = settings.log_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("quickexplain")
        .filename_suffix("log")
        .max_log_files(7)
        .build(&log_dir)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> = std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    Ok(())
}
