// ============================================================================
// GLOBALWELL - Personal AI Wellness Buddy for the Terminal
// ============================================================================
//
// MODULE STRUCTURE:
// 1. profile / prompt       - Form data and the text sent to the model
// 2. generation             - Gemini client behind the Generator trait
// 3. session                - State store: actions, reducer, dispatch
// 4. ambient / surface      - Noise, chime and Pomodoro, and their terminal side
// 5. daily / export         - Tips, facts, quiz, hydration and the PDF download
// 6. ui                     - Form state, key handling, drawing
// 7. main (this file)       - Config, logging, terminal setup and event loop
// ============================================================================

mod ambient;
mod config;
mod daily;
mod error;
mod export;
mod generation;
mod profile;
mod prompt;
mod session;
mod surface;
mod ui;

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use chrono::{Local, Utc};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use tracing::{info, info_span};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::config::Config;
use crate::generation::{GeminiClient, Generator};
use crate::session::Session;
use crate::surface::{SurfaceEvent, TerminalSurface};
use crate::ui::{App, Flow};

const LOG_FILE: &str = "globalwell.log";

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:?}");
    }
}

/// Logs go to a file; the terminal belongs to the UI.
fn init_logging(config: &Config) -> Result<WorkerGuard> {
    fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("could not create log directory {}", config.log_dir.display()))?;
    let appender = tracing_appender::rolling::never(&config.log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_new(&config.log_filter)
        .with_context(|| format!("GLOBALWELL_LOG is not a valid filter: {:?}", config.log_filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow!("could not install logger: {e}"))?;
    Ok(guard)
}

fn run() -> Result<()> {
    let config = Config::from_env()?;
    let _log_guard = init_logging(&config)?;
    let span = info_span!("session", id = %Uuid::new_v4());
    let _entered = span.enter();

    let generator = GeminiClient::new(&config.api_base, &config.api_key, &config.model, config.timeout)?;
    let surface = TerminalSurface::new(config.sounds_dir.clone(), config.player.clone());
    info!(model = generator.model(), sounds = %config.sounds_dir.display(), "session starting");
    let mut session = Session::new(generator, surface, Utc::now().timestamp());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, event::EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut session, &config.export_dir);

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        event::DisableMouseCapture
    )
    .ok();
    terminal.show_cursor().ok();

    info!("session ended");
    res
}

fn run_app<G: Generator>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    session: &mut Session<G, TerminalSurface>,
    export_dir: &Path,
) -> Result<()> {
    let mut app = App::new(Local::now().date_naive(), Instant::now());
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| {
            ui::draw(frame, &mut app, session.state(), session.surface(), Utc::now().timestamp())
        })?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::from_secs(0));

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    match ui::handle_key(&mut app, key, session.state()) {
                        Flow::Quit => break,
                        Flow::Continue => {}
                        Flow::Dispatch(action) => {
                            // Requests block; show the banner before making them.
                            if let Some(label) = action.busy_label() {
                                app.busy = Some(label);
                                terminal.draw(|frame| {
                                    ui::draw(frame, &mut app, session.state(), session.surface(), Utc::now().timestamp())
                                })?;
                            }
                            let outcome = session.dispatch(action);
                            app.busy = None;
                            app.absorb(outcome);
                        }
                        Flow::Export => app.export_plan(session.state(), export_dir),
                        Flow::OpenExport => app.open_export(),
                    }
                }
                Event::Mouse(mouse) => ui::handle_mouse(&mut app, mouse),
                _ => {}
            }
        }

        if last_tick.elapsed() >= tick_rate {
            let now = Instant::now();
            for event in session.surface_mut().tick(now) {
                match event {
                    SurfaceEvent::Bell => {
                        let backend = terminal.backend_mut();
                        backend.write_all(b"\x07")?;
                        backend.flush()?;
                    }
                    SurfaceEvent::NoiseEnded(reason) => {
                        if let Some(action) = session.state().noise_ended(reason) {
                            let outcome = session.dispatch(action);
                            app.absorb(outcome);
                        }
                    }
                }
            }
            app.check_hydration(now);
            app.roll_day(Local::now().date_naive());
            last_tick = now;
        }
    }

    Ok(())
}
