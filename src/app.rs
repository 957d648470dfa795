// ============================================================================
// Structure : App
// ============================================================================
// Gère l'état global de l'application TUI
//
// CONCEPTS RUST :
// 1. State Management : centraliser l'état dans une seule structure
// 2. Mutabilité contrôlée : &mut self pour modifier l'état
//
// PATTERN : Cette structure suit le pattern "Application State"
// - L'UI lit depuis App
// - Le moteur ne touche jamais App : il publie dans un canal watch, et la
//   boucle d'UI recopie la dernière valeur ici (apply_display)
// ============================================================================

use crate::display::DisplayState;
use crate::models::DisplayQuote;

/// État principal de l'application
pub struct App {
    /// Indique si l'application doit continuer à tourner
    pub running: bool,

    /// Indique si l'utilisateur a demandé à quitter (attend confirmation)
    /// CONCEPT : Two-step quit pour éviter les sorties accidentelles
    /// - Première pression de 'q' : confirm_quit = true
    /// - Deuxième pression de 'q' : running = false (quit réel)
    /// - N'importe quelle autre touche : confirm_quit = false (annulation)
    pub confirm_quit: bool,

    /// Cotation actuellement affichée
    pub current: Option<DisplayQuote>,

    /// true tant que le premier cycle de fetch n'est pas terminé
    pub starting: bool,

    /// Nombre de tickers suivis (affiché dans le footer)
    pub tracked: usize,
}

impl App {
    /// Crée une nouvelle instance de App, en phase de démarrage
    pub fn new(tracked: usize) -> Self {
        Self {
            running: true,
            confirm_quit: false,
            current: None,
            starting: true,
            tracked,
        }
    }

    /// Quitte l'application
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Vérifie si l'application doit continuer
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Demande la confirmation de quitter
    pub fn request_quit(&mut self) {
        self.confirm_quit = true;
    }

    /// Annule la demande de quit
    pub fn cancel_quit(&mut self) {
        self.confirm_quit = false;
    }

    /// Vérifie si on attend la confirmation de quit
    pub fn is_awaiting_quit_confirmation(&self) -> bool {
        self.confirm_quit
    }

    /// Recopie l'état publié par le moteur
    ///
    /// Une fois une cotation affichée, un état sans cotation ne l'efface pas
    /// (pas de clignotement vers un écran vide).
    pub fn apply_display(&mut self, state: &DisplayState) {
        self.starting = state.starting;
        if let Some(quote) = &state.quote {
            self.current = Some(quote.clone());
        }
    }

    /// Vérifie si le démarrage est encore en cours
    pub fn is_starting(&self) -> bool {
        self.starting
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
