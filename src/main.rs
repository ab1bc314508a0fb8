//! trendboard: a live terminal dashboard for a trending-topics service.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌───────────┐ fetch ┌──────────┐ snapshot ┌──────────┐  view   ┌──────────┐
//! │ source/   │ ◄──── │ poll.rs  │ ───────► │ store.rs │ ──────► │  app.rs  │
//! │ (HTTP)    │       │ (task)   │          │ (watch)  │         │ (state)  │
//! └───────────┘       └──────────┘          └──────────┘         └──────────┘
//!                       │    ▲ refresh_now()                   draw() │ ▲ keys
//!                       ▼    │                                       ▼ │
//!                  normalize.rs                               ui.rs   input.rs
//! ```
//!
//! * **`source/`**: the `TrendSource` trait, the typed item model and the
//!   HTTP implementation.
//! * **`normalize`**: buckets items by platform and computes aggregates.
//! * **`poll`**: the single refresh task: cadence, manual triggers, events.
//! * **`store`**: latest snapshot, cycle state and error, behind a watch.
//! * **`app`** / **`ui`** / **`input`**: the terminal front end.
//! * **`main`**: wires everything together: parse args, start logging and
//!   the scheduler, set up the terminal, and run the event loop.

mod app;
mod config;
mod error;
mod input;
mod normalize;
mod poll;
mod source;
mod store;
mod ui;

use std::io;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{Event, EventStream},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::broadcast::error::TryRecvError;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

use app::App;
use config::Args;
use normalize::Normalizer;
use poll::PollScheduler;
use source::HttpSource;

// ---------------------------------------------------------------------------
// RAII terminal guard, restored on drop and on panic
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

/// Install a panic hook that restores the terminal before printing the
/// panic message.
fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(info);
    }));
}

/// Log to `--log-file` when given.  Stdout and stderr belong to the TUI, so
/// without a file nothing is logged.
fn init_tracing(args: &Args) -> Result<()> {
    let Some(path) = &args.log_file else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&args.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // -- configuration -------------------------------------------------------
    let args = Args::parse();
    init_tracing(&args)?;
    let config = args.into_config()?;
    tracing::info!(base_url = %config.base_url, interval = ?config.refresh_interval, "starting");

    // -- start background polling --------------------------------------------
    let source = HttpSource::new(&config).context("building HTTP client")?;
    let scheduler = PollScheduler::new(
        source,
        Normalizer::from_config(&config),
        config.refresh_interval,
    );
    let mut events = scheduler.subscribe();
    let handle = scheduler.spawn();

    // -- terminal setup (Drop restores on exit or panic) ---------------------
    install_panic_hook();
    let mut guard = TerminalGuard::new()?;
    let mut views = handle.store().subscribe();
    let mut app = App::new(handle.store().view());
    let mut keys = EventStream::new();

    // -- main event loop -----------------------------------------------------
    // Redraws at least every 100 ms so the countdown keeps moving.  Each
    // iteration:
    //   1. Pick up a changed store view and any cycle events.
    //   2. Render the UI.
    //   3. Wait for the next key or tick.
    //   4. Forward a pending refresh request to the scheduler.
    let mut tick = tokio::time::interval(Duration::from_millis(100));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        // 1. Process scheduler output
        if views.has_changed().unwrap_or(false) {
            app.apply_view(views.borrow_and_update().clone());
        }
        loop {
            match events.try_recv() {
                Ok(event) => app.apply_event(&event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "status line skipped cycle events");
                }
                Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            }
        }

        // 2. Render
        guard.terminal.draw(|f| ui::draw(&mut app, f))?;

        // 3. Handle input
        tokio::select! {
            _ = tick.tick() => {}
            event = keys.next() => match event {
                Some(Ok(Event::Key(key))) => input::handle_key_event(&mut app, key),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e).context("reading terminal events"),
                None => break,
            },
        }

        // 4. Manual refresh
        if app.take_refresh_request() && !handle.refresh_now() {
            app.status = "Refresh skipped: a cycle is running or starting".into();
        }

        if app.quit {
            break;
        }
    }

    drop(guard);
    // Give an in-flight cycle a moment to settle; the runtime drops it otherwise.
    let _ = tokio::time::timeout(Duration::from_secs(1), handle.stop()).await;
    Ok(())
}
