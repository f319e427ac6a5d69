use color_eyre::Result;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, sync::Arc, time::Duration};
use tabemono_tui::{
    app::App,
    catalog::Catalog,
    config::Config,
    effects::Effects,
    events::{Event, EventHandler},
    location::GeolocationProvider,
    logging,
    store::{KeyValueStore, MemoryStore, PersistedSelection, SqliteStore},
    ui,
};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Instrumentation and safety
    let _log_guard = logging::initialize_logging();
    install_panic_hook();
    color_eyre::install()?;

    let config = Config::load();
    let catalog = Arc::new(Catalog::embedded()?);

    let store: Box<dyn KeyValueStore> = match SqliteStore::open(&config.storage.db_path) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!("Selection store unavailable ({}); choices won't be remembered.", e);
            Box::new(MemoryStore::default())
        }
    };
    let selection = PersistedSelection::new(
        store,
        config.storage.selection_key.clone(),
        config.content.default_city.clone(),
    );

    let mut app = App::new(
        catalog.cities().to_vec(),
        selection.default_slug(),
        Duration::from_millis(config.content.switch_delay_ms),
    )?;

    // Ready terminal and event plumbing
    let mut terminal = setup_terminal()?;
    let mut events = EventHandler::new(config.ui.tick_rate_ms);
    let provider = Arc::new(GeolocationProvider::from_config(&config.location));
    let effects = Effects::new(events.tx.clone(), catalog, provider, selection);

    let restored = effects.selection().load();
    effects.run(app.start(&restored));

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, &app))?;

        if let Some(event) = events.next().await {
            match event {
                Event::Tick => app.on_tick(),
                Event::Input(key) => effects.run(app.handle_key(key)),
                Event::DishesLoaded { ticket, dishes } => app.dishes_loaded(ticket, dishes),
                Event::LocationUpdate(outcome) => app.location_resolved(outcome),
            }
        }
    }

    info!("Leaving {}", app.current_city().name_romanized);
    restore_terminal(terminal)?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    crossterm::terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, crossterm::terminal::EnterAlternateScreen, crossterm::cursor::Hide)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    crossterm::terminal::disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show)?;
    Ok(())
}

fn install_panic_hook() {
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        // Force terminal cleanup!
        crossterm::terminal::disable_raw_mode().ok();
        crossterm::execute!(std::io::stdout(), crossterm::terminal::LeaveAlternateScreen, crossterm::cursor::Show).ok();
        original_hook(panic_info);
    }));
}
