// ============================================================================
// Structure : Fetcher
// ============================================================================
// Exécute un cycle de fetch : pour chaque ticker suivi, décide (via
// l'horloge des marchés) s'il faut interroger la source ou simplement
// marquer le marché fermé, lance les requêtes en parallèle et écrit les
// résultats dans le cache
//
// CONCEPTS RUST :
// 1. JoinSet : un groupe de tâches tokio dont on attend la fin
// 2. AtomicBool : drapeau partagé sans verrou (premier cycle terminé)
// 3. Erreurs contenues : une erreur par ticker est loggée, jamais propagée
// ============================================================================

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use crate::api::QuoteSource;
use crate::cache::QuoteCache;
use crate::config::MarketHours;
use crate::display::DisplaySink;
use crate::market;
use crate::models::{QUOTE_INTERVAL, QUOTE_RANGE};

/// Résumé d'un cycle (pour les logs et les tests)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Requêtes lancées vers la source
    pub fetched: usize,
    /// Tickers mis à jour avec un nouveau prix
    pub updated: usize,
    /// Tickers marqués fermés sans requête
    pub marked_closed: usize,
    /// Requêtes en échec (erreur, réponse vide, tâche avortée)
    pub failed: usize,
}

/// Pilote des cycles de fetch
pub struct Fetcher {
    source: Arc<dyn QuoteSource>,
    cache: Arc<QuoteCache>,
    sink: Arc<dyn DisplaySink>,
    symbols: Arc<[String]>,
    hours: MarketHours,

    /// false jusqu'à la fin du premier cycle
    initial_cycle_done: AtomicBool,
}

impl Fetcher {
    pub fn new(
        source: Arc<dyn QuoteSource>,
        cache: Arc<QuoteCache>,
        sink: Arc<dyn DisplaySink>,
        symbols: Vec<String>,
        hours: MarketHours,
    ) -> Self {
        Self {
            source,
            cache,
            sink,
            symbols: symbols.into(),
            hours,
            initial_cycle_done: AtomicBool::new(false),
        }
    }

    /// Tickers suivis
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// Vrai une fois le premier cycle terminé
    pub fn initial_cycle_done(&self) -> bool {
        self.initial_cycle_done.load(Ordering::SeqCst)
    }

    /// Exécute un cycle complet
    ///
    /// - Premier cycle : tous les tickers sont interrogés, même marché fermé,
    ///   pour avoir un prix à afficher tout de suite
    /// - Cycles suivants : marché fermé → pas de requête, mark_closed
    ///
    /// Attend la fin de toutes les requêtes du cycle. Les échecs sont
    /// comptés dans le rapport, jamais propagés.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self, now: DateTime<Utc>) -> CycleReport {
        let first_cycle = !self.initial_cycle_done();
        // Termine le cycle même si la future est abandonnée ou panique
        let _completion = CycleCompletion(self);
        let mut report = CycleReport::default();
        let mut tasks = JoinSet::new();

        for symbol in self.symbols.iter() {
            let market_open = market::is_market_open(symbol, now, &self.hours);

            if first_cycle || market_open {
                report.fetched += 1;
                let source = self.source.clone();
                let cache = self.cache.clone();
                let symbol = symbol.clone();
                tasks.spawn(async move { fetch_one(&*source, &cache, &symbol, market_open).await });
            } else {
                debug!(ticker = %symbol, "Market closed, skipping fetch");
                self.cache.mark_closed(symbol, now);
                report.marked_closed += 1;
            }
        }

        // CONCEPT : join_next
        // - Récupère les tâches dans l'ordre où elles se terminent
        // - Une tâche qui panique donne Err(JoinError) : on le logge et on continue
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(true) => report.updated += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    error!(error = %e, "Fetch task aborted");
                    report.failed += 1;
                }
            }
        }

        info!(
            fetched = report.fetched,
            updated = report.updated,
            closed = report.marked_closed,
            failed = report.failed,
            "Fetch cycle finished"
        );
        report
    }

    /// Interroge la source pour un ticker et écrit le dernier échantillon
    pub async fn fetch_one(&self, symbol: &str, market_open: bool) -> bool {
        fetch_one(&*self.source, &self.cache, symbol, market_open).await
    }

    // Marque le premier cycle terminé et prévient l'UI, une seule fois
    fn complete_cycle(&self) {
        if !self.initial_cycle_done.swap(true, Ordering::SeqCst) {
            info!("Initial fetch cycle completed");
            self.sink.on_startup_complete();
        }
    }
}

/// Appelle complete_cycle au drop
struct CycleCompletion<'a>(&'a Fetcher);

impl Drop for CycleCompletion<'_> {
    fn drop(&mut self) {
        self.0.complete_cycle();
    }
}

/// Requête d'un ticker ; true si le cache a reçu un nouveau prix
///
/// Réponse vide, erreur ou prix invalide : le cache n'est pas touché.
async fn fetch_one(
    source: &dyn QuoteSource,
    cache: &QuoteCache,
    symbol: &str,
    market_open: bool,
) -> bool {
    match source.recent_samples(symbol, QUOTE_INTERVAL, QUOTE_RANGE).await {
        Ok(samples) => match samples.last() {
            Some(last) => {
                match cache.record_fetch(symbol, last.close, last.timestamp, market_open) {
                    Some(quote) => {
                        debug!(ticker = %symbol, price = %quote.price, movement = ?quote.movement, "Price updated");
                        true
                    }
                    None => {
                        warn!(ticker = %symbol, close = last.close, "Ignoring non-finite price");
                        false
                    }
                }
            }
            None => {
                warn!(ticker = %symbol, "Source returned no samples");
                false
            }
        },
        Err(e) => {
            warn!(ticker = %symbol, error = ?e, "Failed to fetch quote");
            false
        }
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
