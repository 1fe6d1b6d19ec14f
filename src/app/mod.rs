mod state;
mod event_loop;
mod render;
mod input;

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, Clear, ClearType},
};

use crate::api::ComposeApi;
use crate::config::Config;
use crate::monitor::ServiceMonitor;
use crate::reconcile::SyncSettings;
use crate::view::Presenter;

pub use input::{handle_key, InputResult};
pub use state::{PendingAction, PendingActionKind, CONFIRM_TIMEOUT};

/// Restore the terminal to normal mode. Safe to call multiple times.
pub fn restore_terminal() {
    let _ = execute!(io::stdout(), LeaveAlternateScreen);
    let _ = disable_raw_mode();
}

/// Dashboard behavior taken from configuration.
#[derive(Clone, Debug)]
pub struct AppOptions {
    pub api_url: String,
    pub confirm_destructive: bool,
    pub refresh_interval: Option<Duration>,
}

impl AppOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_url: config.api.base_url.clone(),
            confirm_destructive: config.dashboard.confirm_destructive,
            refresh_interval: config.sync.refresh_interval(),
        }
    }
}

/// Main application state and event loop.
pub struct App {
    pub monitor: ServiceMonitor,
    pub options: AppOptions,
    pub pending_action: Option<PendingAction>,
    pub last_clock: Instant,
}

impl App {
    pub fn new(monitor: ServiceMonitor, options: AppOptions) -> Self {
        Self {
            monitor,
            options,
            pending_action: None,
            last_clock: Instant::now(),
        }
    }
}

/// Run the dashboard. Sets up terminal, runs the main loop, restores terminal on exit.
pub fn run(should_quit: Arc<AtomicBool>, api: Arc<dyn ComposeApi>, config: &Config) -> io::Result<()> {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .build()?;

    let monitor = ServiceMonitor::new(
        api,
        rt.handle().clone(),
        SyncSettings::from(&config.sync),
        &config.dashboard.services,
        config.api.compose_key.clone(),
    );
    let mut app = App::new(monitor, AppOptions::from_config(config));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, Clear(ClearType::All))?;

    let result = event_loop(&mut app, &should_quit);
    restore_terminal();
    tracing::info!("dashboard closed");
    result
}

fn event_loop(app: &mut App, should_quit: &AtomicBool) -> io::Result<()> {
    app.monitor.load();
    let mut needs_render = true;

    loop {
        if should_quit.load(Ordering::Relaxed) {
            break;
        }

        if app.expire_pending_action() {
            needs_render = true;
        }
        if app.poll_events() {
            needs_render = true;
        }
        if app.auto_refresh(Instant::now()) {
            needs_render = true;
        }
        if app.tick_clock() {
            needs_render = true;
        }

        if needs_render {
            if Presenter::render_size_guard()? {
                needs_render = false;
                if crossterm::event::poll(Duration::from_millis(100))? {
                    let _ = crossterm::event::read()?;
                    needs_render = true;
                }
                continue;
            }

            render::render(app)?;
            needs_render = false;
        }

        if crossterm::event::poll(Duration::from_millis(100))? {
            match crossterm::event::read()? {
                crossterm::event::Event::Key(key_event) => match input::handle_key(app, key_event) {
                    Some(InputResult::Quit) => break,
                    Some(InputResult::Consumed) => needs_render = true,
                    None => {}
                },
                crossterm::event::Event::Resize(_, _) => needs_render = true,
                _ => {}
            }
        }
    }

    Ok(())
}
