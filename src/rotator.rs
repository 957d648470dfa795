// ============================================================================
// Structure : Rotator
// ============================================================================
// Fait défiler les tickers suivis un par un : à chaque appel, sélectionne
// le ticker suivant (round-robin) et publie sa cotation si elle existe
//
// La rotation ne dépend pas des heures d'ouverture : seul le contenu
// affiché (drapeau fermé, prix figé) change selon le marché.
// ============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::cache::QuoteCache;
use crate::models::DisplayQuote;

/// Rotation de l'affichage
pub struct Rotator {
    cache: Arc<QuoteCache>,
    symbols: Arc<[String]>,

    /// Position du prochain ticker à afficher
    index: AtomicUsize,
}

impl Rotator {
    pub fn new(cache: Arc<QuoteCache>, symbols: Vec<String>) -> Self {
        Self {
            cache,
            symbols: symbols.into(),
            index: AtomicUsize::new(0),
        }
    }

    /// Passe au ticker suivant et le publie
    ///
    /// Retourne la cotation publiée, ou None si aucun ticker n'est suivi ou
    /// si le ticker choisi n'a pas encore de cotation (l'affichage courant
    /// reste alors inchangé).
    pub fn rotate_once(&self) -> Option<DisplayQuote> {
        if self.symbols.is_empty() {
            return None;
        }

        // CONCEPT : fetch_update
        // - Lecture + écriture atomiques de l'index
        // - L'index est gardé modulo len : il ne déborde jamais
        let len = self.symbols.len();
        let slot = match self
            .index
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |i| Some((i % len + 1) % len))
        {
            Ok(previous) | Err(previous) => previous % len,
        };
        let symbol = &self.symbols[slot];

        match self.cache.select_for_display(symbol) {
            Some(quote) => {
                trace!(ticker = %symbol, "Rotated display");
                Some(quote)
            }
            None => {
                debug!(ticker = %symbol, "No quote yet, keeping current display");
                None
            }
        }
    }

    /// Ticker qui sera sélectionné au prochain appel
    #[cfg(test)]
    fn next_symbol(&self) -> Option<&str> {
        if self.symbols.is_empty() {
            return None;
        }
        let slot = self.index.load(Ordering::SeqCst) % self.symbols.len();
        Some(&self.symbols[slot])
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
