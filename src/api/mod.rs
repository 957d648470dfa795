// ============================================================================
// Module : api
// ============================================================================
// Ce module contient les sources de cotations. Le reste de l'application ne
// connaît que le trait QuoteSource : Yahoo Finance en production, une source
// scriptée en mémoire dans les tests.
// ============================================================================

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Interval, PriceSample, Range};

pub mod yahoo;  // Client API Yahoo Finance

// Re-export du client principal
pub use yahoo::YahooClient;

/// Source de cotations
///
/// CONCEPT RUST : Trait + async_trait
/// - Un trait async ne peut pas (encore) être utilisé en `dyn` directement
/// - #[async_trait] transforme `async fn` en `Pin<Box<dyn Future>>`
/// - Send + Sync : la source est partagée entre les tâches tokio
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Récupère les échantillons récents d'un symbole, du plus ancien au plus récent
    ///
    /// # Retourne
    /// * `Ok(samples)` - éventuellement vide
    /// * `Err(e)` - erreur réseau, statut HTTP, JSON invalide
    async fn recent_samples(
        &self,
        symbol: &str,
        interval: Interval,
        range: Range,
    ) -> Result<Vec<PriceSample>>;
}
