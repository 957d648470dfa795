// ============================================================================
// LazyTicker - Widget de cotations en rotation
// ============================================================================
// Affiche un ticker à la fois dans le terminal, en rotation toutes les 15
// secondes. Les prix sont rafraîchis en arrière-plan depuis Yahoo Finance,
// en respectant les heures d'ouverture de chaque marché.
//
// CONCEPTS RUST CLÉS :
// 1. Runtime tokio explicite : l'UI reste synchrone, le moteur est async
// 2. Canal watch : le moteur publie, la boucle d'UI lit la dernière valeur
// 3. Event loop : boucle qui gère événements et rendering
// ============================================================================

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::watch;
use tracing::{debug, error, info};

use lazyticker::api::YahooClient;
use lazyticker::app::App;
use lazyticker::cache::QuoteCache;
use lazyticker::config::WidgetConfig;
use lazyticker::display::{DisplayState, WatchSink};
use lazyticker::fetcher::Fetcher;
use lazyticker::rotator::Rotator;
use lazyticker::scheduler::Scheduler;
use lazyticker::ui::events::{is_escape_event, is_quit_event};
use lazyticker::ui::{render, Event, EventHandler};

// ============================================================================
// Initialisation du logging
// ============================================================================
// CONCEPT : Logging dans une app TUI
// - Les println! ne fonctionnent pas une fois le TUI lancé
// - On log vers un fichier à la place, avec rotation quotidienne
// ============================================================================

/// Initialise le système de logging vers fichier
///
/// Les logs sont écrits dans ./logs/lazyticker.log
///
/// # Utilisation
/// ```bash
/// tail -f logs/lazyticker.log
/// RUST_LOG=lazyticker=trace cargo run
/// ```
fn init_logging() -> Result<()> {
    use tracing_appender::rolling::{RollingFileAppender, Rotation};
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let log_dir = PathBuf::from("./logs");
    std::fs::create_dir_all(&log_dir).context("Échec de la création du répertoire de logs")?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir.clone(), "lazyticker.log");

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false) // Pas de codes couleur dans le fichier
                .with_target(true)
                .with_thread_ids(true) // Utile : les fetchs tournent sur plusieurs threads
                .with_line_number(true),
        )
        .with(
            // Par défaut : debug pour lazyticker, info pour les dépendances
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lazyticker=debug,info".into()),
        )
        .init();

    info!(?log_dir, "Logging initialisé");
    Ok(())
}

// ============================================================================
// Point d'entrée du programme
// ============================================================================

fn main() -> Result<()> {
    init_logging().unwrap_or_else(|e| {
        eprintln!("⚠️  Warning: Failed to initialize logging: {}", e);
        eprintln!("   Continuing without logging...");
    });

    info!("LazyTicker starting up");

    // Configuration : erreur fatale avant d'ouvrir le terminal
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = WidgetConfig::discover(config_path)?;
    info!(
        tickers = ?config.tickers,
        polling = ?config.polling_interval,
        markets = config.markets.len(),
        "Configuration ready"
    );

    let runtime = tokio::runtime::Runtime::new().context("Échec de la création du runtime tokio")?;

    // Assemblage du moteur
    // CONCEPT RUST : Arc pour partage entre tâches
    // - Le cache est partagé par le fetcher (écriture) et le rotator (lecture)
    // - Le sink est partagé par le cache (changements) et le fetcher (démarrage)
    let (sink, display_rx) = WatchSink::new();
    let sink = Arc::new(sink);
    let cache = Arc::new(QuoteCache::new(sink.clone()));
    let source = Arc::new(YahooClient::new()?);
    let fetcher = Arc::new(Fetcher::new(
        source,
        cache.clone(),
        sink,
        config.tickers.clone(),
        config.market_hours(),
    ));
    let rotator = Arc::new(Rotator::new(cache, config.tickers.clone()));
    let scheduler = Arc::new(Scheduler::new(fetcher, rotator, config.polling_interval));

    // Démarrage en arrière-plan : l'UI affiche "Démarrage..." en attendant
    let startup = runtime.spawn({
        let scheduler = scheduler.clone();
        async move {
            scheduler.startup().await;
        }
    });

    debug!("Setting up terminal");
    let mut terminal = setup_terminal()?;

    let mut app = App::new(config.tickers.len());
    let events = EventHandler::default();

    info!("Starting event loop");
    let result = run(&mut terminal, &mut app, &events, display_rx);

    // Arrêt : on attend la fin de la tâche de démarrage avant stop(),
    // sinon un start() encore en cours pourrait relancer les déclencheurs
    startup.abort();
    let _ = runtime.block_on(startup);
    scheduler.stop();

    debug!("Restoring terminal");
    restore_terminal(&mut terminal)?;

    match &result {
        Ok(_) => info!("Application exited normally"),
        Err(e) => error!(error = ?e, "Application exited with error"),
    }

    result
}

// ============================================================================
// Event Loop Principal
// ============================================================================
// À chaque itération :
//   1. Recopier l'état publié par le moteur (si changé)
//   2. Dessiner l'interface
//   3. Traiter les événements clavier
// ============================================================================

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &EventHandler,
    mut display_rx: watch::Receiver<DisplayState>,
) -> Result<()> {
    while app.is_running() {
        // CONCEPT : has_changed + borrow_and_update
        // - Ne recopie que si le moteur a publié depuis le dernier tour
        // - Les valeurs intermédiaires sont perdues : seule la dernière compte
        if display_rx.has_changed().unwrap_or(false) {
            let state = display_rx.borrow_and_update().clone();
            app.apply_display(&state);
        }

        terminal.draw(|frame| render(frame, app))?;

        match events.next() {
            Ok(event) => handle_event(app, event),
            Err(e) => debug!(error = ?e, "Failed to read terminal event"),
        }
    }

    Ok(())
}

/// Traite un événement et met à jour l'état de l'application
fn handle_event(app: &mut App, event: Event) {
    match event {
        Event::Key(_) if is_quit_event(&event) || is_escape_event(&event) => {
            // Touche 'q' : quit confirmation two-step
            if app.is_awaiting_quit_confirmation() {
                info!("User confirmed quit");
                app.quit();
            } else {
                info!("User requested quit (awaiting confirmation)");
                app.request_quit();
            }
        }
        Event::Key(_) => {
            // Toute autre touche : annule la confirmation si active
            app.cancel_quit();
        }
        Event::Tick => {}
    }
}

// ============================================================================
// Setup et restauration du terminal
// ============================================================================

/// Configure le terminal en mode TUI
fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(|e| e.into())
}

/// Restaure le terminal à son état normal
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
