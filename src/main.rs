//! gread-feed: browse a GRead feed in the terminal.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌───────────┐  LoadMsg   ┌──────────┐  draw()  ┌──────────┐
//! │ loader.rs │ ─────────► │  app.rs  │ ───────► │  ui.rs   │
//! │  (tokio)  │  (channel) │ (state)  │          │ (render) │
//! └───────────┘            └──────────┘          └──────────┘
//!       ▲ spawn(kind)           ▲
//!       │                       │ handle_key_event()
//!   main loop              ┌──────────┐
//!                          │ input.rs │
//!                          └──────────┘
//! ```
//!
//! * **`loader`**: runs `load_initial` / `load_more` on the tokio runtime.
//! * **`app`**: display state copied from the synchronizer each tick.
//! * **`ui`**: pure rendering: reads `App` state and draws widgets.
//! * **`input`**: maps key events to `App` mutations and load requests.
//! * **`main`**: wires everything together: config, logging, the terminal,
//!   and the event loop.
//!
//! Usage: `gread-feed [books|activity]`, or `gread-feed post <text>` to post
//! an activity update.  See `Config::from_env` for the
//! environment variables; set `GREAD_LOG=path` to write logs to a file.

mod app;
mod input;
mod loader;
mod ui;

use std::io;
use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::runtime::Runtime;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gread_feed::feed::{FeedSynchronizer, PageFetcher};
use gread_feed::source::{ActivityFeedSource, BookDirectorySource, StaticToken};
use gread_feed::Config;

use app::{App, ListEntry};
use loader::LoadKind;

// ---------------------------------------------------------------------------
// RAII terminal guard, restored even on panic
// ---------------------------------------------------------------------------

/// Manages terminal raw-mode and alternate-screen lifetime via [`Drop`].
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalGuard {
    fn new() -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Restore the terminal before printing a panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

/// Log to the file named by `GREAD_LOG`; the terminal belongs to the UI.
fn init_logging() -> Result<()> {
    let Ok(path) = std::env::var("GREAD_LOG") else {
        return Ok(());
    };
    let file = std::fs::File::create(&path).with_context(|| format!("creating log file {path}"))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gread_feed=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    install_panic_hook();
    init_logging()?;

    // -- parse arguments -----------------------------------------------------
    let feed = std::env::args().nth(1).unwrap_or_else(|| "books".into());
    let config = Config::from_env().context("loading configuration")?;
    info!(feed = %feed, base_url = %config.base_url, per_page = config.per_page, "starting");

    let runtime = Runtime::new()?;
    match feed.as_str() {
        "books" => run(&runtime, BookDirectorySource::new(&config)?),
        "activity" => {
            let credentials = Arc::new(StaticToken::from(config.token.clone()));
            run(&runtime, ActivityFeedSource::new(&config, credentials)?)
        }
        "post" => {
            let text = std::env::args().skip(2).collect::<Vec<_>>().join(" ");
            let credentials = Arc::new(StaticToken::from(config.token.clone()));
            let source = ActivityFeedSource::new(&config, credentials)?;
            runtime
                .block_on(source.post_update(&text))
                .context("posting activity update")?;
            println!("Posted.");
            Ok(())
        }
        other => bail!("unknown command {other:?}; expected \"books\", \"activity\" or \"post\""),
    }
}

fn run<F>(runtime: &Runtime, source: F) -> Result<()>
where
    F: PageFetcher + 'static,
    F::Item: ListEntry,
{
    let mut app: App<F::Item> = App::new(source.name());
    let sync = Arc::new(FeedSynchronizer::new(source));
    let (tx, rx) = mpsc::channel();

    // -- first page, like a screen appearing ---------------------------------
    loader::spawn(runtime.handle(), sync.clone(), LoadKind::Initial, tx.clone());

    // -- terminal setup (Drop restores on exit or panic) ---------------------
    let mut guard = TerminalGuard::new()?;

    // -- main event loop -----------------------------------------------------
    // Runs at ~10 fps (100 ms tick).  Each iteration:
    //   1. Copy the feed snapshot and drain finished loads.
    //   2. Start any load the user asked for.
    //   3. Render the UI.
    //   4. Poll for keyboard input (non-blocking, up to tick_rate).
    let tick_rate = Duration::from_millis(100);

    loop {
        // 1. Sync state (drain first so the snapshot includes those loads)
        let finished: Vec<_> = rx.try_iter().collect();
        app.apply_snapshot(sync.snapshot());
        for msg in finished {
            app.record_outcome(msg.kind, msg.outcome);
        }

        // 2. Start requested loads
        if let Some(kind) = app.take_request() {
            loader::spawn(runtime.handle(), sync.clone(), kind, tx.clone());
        }

        // 3. Render
        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        // 4. Handle input
        if event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                input::handle_key_event(&mut app, key);
            }
        }

        if app.quit {
            break;
        }
    }

    // `guard` is dropped here, restoring the terminal.
    Ok(())
}
