use anyhow::Result;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info};
use ratatui::{backend::Backend, backend::CrosstermBackend, Terminal};
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use stickies_tui::{load_config, App, Config, Event, EventHandler};

const TICK_RATE_MS: u64 = 100;

/// What the main loop is showing
enum Screen {
    Running(Box<App>),
    /// A draw or handler panicked; the user may reload or quit
    Crashed,
}

fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));
    let config = load_config(&config_path)?;

    if let Err(err) = stickies_core::logging::init_logging(&config.logging.level, &config.logging.directory) {
        eprintln!("Logging disabled: {}", err);
    }

    // Create app before touching the terminal so startup errors print normally
    let app = App::new(config.clone())?;

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let event_handler = EventHandler::new(TICK_RATE_MS);

    // Main loop
    let result = run_app(&mut terminal, Screen::Running(Box::new(app)), &config, &event_handler);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = result {
        error!("event=app_exit_error error={:?}", err);
        eprintln!("Error: {:?}", err);
    } else {
        info!("event=app_exit");
    }

    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut screen: Screen,
    config: &Config,
    event_handler: &EventHandler,
) -> Result<()> {
    loop {
        screen = match screen {
            Screen::Running(mut app) => {
                // A panic anywhere in a frame drops to the recovery screen
                // instead of tearing down the terminal.
                let step = panic::catch_unwind(AssertUnwindSafe(|| run_frame(terminal, &mut app, event_handler)));
                match step {
                    Ok(Ok(())) if app.should_quit => return Ok(()),
                    Ok(Ok(())) => Screen::Running(app),
                    Ok(Err(err)) => return Err(err),
                    Err(_) => {
                        error!("event=ui_crashed");
                        terminal.clear()?;
                        Screen::Crashed
                    }
                }
            }
            Screen::Crashed => {
                terminal.draw(|f| stickies_tui::ui::render_recovery_screen(f))?;
                match event_handler.next()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            info!("event=ui_reload");
                            terminal.clear()?;
                            Screen::Running(Box::new(App::new(config.clone())?))
                        }
                        _ => Screen::Crashed,
                    },
                    _ => Screen::Crashed,
                }
            }
        };
    }
}

/// Draw once, then handle one event
fn run_frame<B: Backend>(terminal: &mut Terminal<B>, app: &mut App, event_handler: &EventHandler) -> Result<()> {
    terminal.draw(|f| stickies_tui::ui::render(f, app))?;

    match event_handler.next()? {
        Event::Key(key) => stickies_tui::event::handle_key_event(key, app),
        Event::Mouse(mouse) => stickies_tui::event::handle_mouse_event(mouse, app),
        Event::Tick => app.tick(),
    }
    Ok(())
}
