mod app;
mod config;
mod countdown;
mod display;
mod error;
mod ui;

use app::AppState;
use clap::Parser;
use config::ConfigStore;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use display::TICK_RATE;
use ratatui::prelude::*;
use simplelog::{LevelFilter, WriteLogger};
use std::{fs::File, io, path::PathBuf, time::Instant};

// ============================================================================
// Type Aliases & Constants
// ============================================================================

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;
const LOG_FILE_NAME: &str = ".countdownclock.log";

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Clone)]
#[command(author, version, about = "⏰ deskclock - current time and a countdown to a target time of day")]
struct Args {
    /// Config file (default: ~/.countdownclock_config.json)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Log file (default: ~/.countdownclock.log)
    #[arg(long)]
    log_file: Option<PathBuf>,
    /// Disable logging
    #[arg(short, long)]
    quiet: bool,
    /// Don't send a desktop notification when the countdown finishes
    #[arg(long)]
    no_notify: bool,
}

fn init_logging(args: &Args) {
    if args.quiet {
        return;
    }

    let path = args.log_file.clone().unwrap_or_else(|| {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(LOG_FILE_NAME)
    });
    let file = match File::create(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: could not create log file {}: {}", path.display(), e);
            return;
        }
    };

    if let Err(e) = WriteLogger::init(LevelFilter::Info, simplelog::Config::default(), file) {
        eprintln!("Warning: could not initialize logger: {}", e);
        return;
    }
    log::info!("Logging for deskclock {} initialized (tick interval: {}ms)", env!("CARGO_PKG_VERSION"), TICK_RATE.as_millis());
}

fn now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}

// ============================================================================
// Main
// ============================================================================

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args);

    let store = ConfigStore::new(args.config.clone().unwrap_or_else(config::default_path));
    let mut app = AppState::new(store, !args.no_notify, now());

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(e) = &res {
        log::error!("Exiting on error: {}", e);
    }
    res
}

fn run(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut AppState) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| {
            app.screen = f.size();
            ui::render_ui(f, app);
        })?;

        let timeout = TICK_RATE.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key(key, now()) {
                        app.save_on_quit();
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.update(now());
            last_tick = Instant::now();
        }
    }
}
