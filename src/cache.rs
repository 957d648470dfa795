// ============================================================================
// Structure : QuoteCache
// ============================================================================
// Dernière cotation connue par ticker, partagée entre les cycles de fetch
// (écrivains) et la rotation (lecteur)
//
// CONCEPTS RUST :
// 1. Verrou par clé : HashMap<String, Arc<Mutex<Slot>>>
//    - La map elle-même est sous RwLock, mais on ne la verrouille que le
//      temps de récupérer (ou créer) le slot du ticker
//    - Deux tickers différents ne se bloquent jamais l'un l'autre
//    - Deux écritures sur le même ticker sont sérialisées par son Mutex
// 2. Copy-on-write : le slot contient une DisplayQuote complète, remplacée
//    en bloc, jamais modifiée champ par champ
//
// Ordre des verrous : slot du ticker, puis `displayed`. Tous les chemins qui
// notifient le DisplaySink le font en tenant `displayed`, ce qui ordonne les
// notifications entre écritures et rotations.
// ============================================================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use tracing::{debug, trace};

use crate::display::DisplaySink;
use crate::models::{round_price, DisplayQuote, Movement};

type Slot = Arc<Mutex<Option<DisplayQuote>>>;

/// Cache des cotations
pub struct QuoteCache {
    slots: RwLock<HashMap<String, Slot>>,

    /// Ticker actuellement affiché
    displayed: Mutex<Option<String>>,

    sink: Arc<dyn DisplaySink>,
}

/// Un Mutex empoisonné (panic d'un autre thread) garde une valeur valide :
/// chaque écriture remplace la cotation en entier, donc on la récupère.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl QuoteCache {
    /// Crée un cache vide
    pub fn new(sink: Arc<dyn DisplaySink>) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            displayed: Mutex::new(None),
            sink,
        }
    }

    /// Retourne le slot d'un ticker, en le créant si besoin
    fn slot(&self, symbol: &str) -> Slot {
        {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(slot) = slots.get(symbol) {
                return slot.clone();
            }
        }

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        slots
            .entry(symbol.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Dernière cotation connue d'un ticker
    pub fn get(&self, symbol: &str) -> Option<DisplayQuote> {
        let slot = {
            let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
            slots.get(symbol)?.clone()
        };
        let quote = lock(&slot).clone();
        quote
    }

    /// Nombre de tickers ayant une cotation
    #[cfg(test)]
    fn len(&self) -> usize {
        let slots = self.slots.read().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| lock(slot).is_some()).count()
    }

    /// Enregistre un prix fraîchement récupéré
    ///
    /// - Arrondit le prix à 3 décimales
    /// - Calcule le mouvement par rapport au prix précédent (Initial sinon)
    /// - Remplace la cotation et notifie l'affichage si ce ticker est affiché
    ///
    /// Retourne la nouvelle cotation, ou None si le prix est invalide
    /// (NaN, infini) : dans ce cas le cache n'est pas modifié.
    pub fn record_fetch(
        &self,
        symbol: &str,
        raw_price: f64,
        sample_time: DateTime<Utc>,
        market_open: bool,
    ) -> Option<DisplayQuote> {
        let price = round_price(raw_price)?;
        let slot = self.slot(symbol);
        let mut current = lock(&slot);

        let quote = DisplayQuote {
            ticker: symbol.to_string(),
            price,
            as_of: sample_time,
            movement: Movement::classify(current.as_ref().map(|q| q.price), price),
            market_open,
        };
        trace!(ticker = %symbol, price = %quote.price, movement = ?quote.movement, "Recording fetched price");

        *current = Some(quote.clone());
        self.notify_if_displayed(symbol, &quote);
        Some(quote)
    }

    /// Marque le marché d'un ticker comme fermé
    ///
    /// - Cotation existante : copie avec market_open = false, le reste figé
    /// - Pas de cotation : crée un placeholder (prix 0, Initial, fermé)
    pub fn mark_closed(&self, symbol: &str, at: DateTime<Utc>) -> DisplayQuote {
        let slot = self.slot(symbol);
        let mut current = lock(&slot);

        let quote = match current.as_ref() {
            Some(existing) => existing.closed(),
            None => {
                debug!(ticker = %symbol, "No price yet, storing closed placeholder");
                DisplayQuote::placeholder(symbol, at)
            }
        };

        *current = Some(quote.clone());
        self.notify_if_displayed(symbol, &quote);
        quote
    }

    /// Sélectionne un ticker pour l'affichage et publie sa cotation
    ///
    /// Si le ticker n'a pas encore de cotation, rien ne change : l'affichage
    /// précédent reste en place. Retourne la cotation publiée.
    pub fn select_for_display(&self, symbol: &str) -> Option<DisplayQuote> {
        let slot = self.slot(symbol);
        let current = lock(&slot);
        let quote = current.as_ref()?.clone();

        let mut displayed = lock(&self.displayed);
        *displayed = Some(symbol.to_string());
        self.sink.on_display_changed(quote.clone());
        Some(quote)
    }

    /// Ticker actuellement affiché
    pub fn displayed_symbol(&self) -> Option<String> {
        lock(&self.displayed).clone()
    }

    // Appelé en tenant le verrou du slot de `symbol`
    fn notify_if_displayed(&self, symbol: &str, quote: &DisplayQuote) {
        let displayed = lock(&self.displayed);
        if displayed.as_deref() == Some(symbol) {
            self.sink.on_display_changed(quote.clone());
        }
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
