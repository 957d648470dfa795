// ============================================================================
// Outils de test partagés
// ============================================================================
// - ScriptedSource : QuoteSource en mémoire, réponses programmées par ticker
// - RecordingSink : DisplaySink qui garde tout ce qu'on lui envoie
// ============================================================================

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration as StdDuration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::api::QuoteSource;
use crate::display::DisplaySink;
use crate::models::{DisplayQuote, Interval, PriceSample, Range};

/// Réponse programmée pour un appel
#[derive(Debug, Clone)]
pub enum Scripted {
    Prices(Vec<f64>),
    /// Prix renvoyés après un délai
    Slow(StdDuration, Vec<f64>),
    /// Ne répond jamais
    Hang,
    Empty,
    Fail,
    Panic,
}

/// Source de cotations programmable
///
/// Chaque ticker a une file de réponses ; une file vide répond Fail.
#[derive(Default)]
pub struct ScriptedSource {
    scripts: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<String>>,
    total: AtomicUsize,
}

impl ScriptedSource {
    /// Programme les prochaines réponses d'un ticker
    pub fn script(&self, symbol: &str, responses: Vec<Scripted>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(symbol.to_string())
            .or_default()
            .extend(responses);
    }

    /// Nombre total d'appels
    pub fn call_count(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// Nombre d'appels pour un ticker
    pub fn calls_for(&self, symbol: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|s| *s == symbol).count()
    }
}

/// Horodatage de base des échantillons programmés
pub fn sample_base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap()
}

/// Un échantillon toutes les 15 minutes à partir de sample_base()
fn samples(prices: Vec<f64>) -> Vec<PriceSample> {
    prices
        .into_iter()
        .enumerate()
        .map(|(i, close)| PriceSample::new(sample_base() + Duration::minutes(15 * i as i64), close))
        .collect()
}

#[async_trait]
impl QuoteSource for ScriptedSource {
    async fn recent_samples(
        &self,
        symbol: &str,
        _interval: Interval,
        _range: Range,
    ) -> Result<Vec<PriceSample>> {
        self.calls.lock().unwrap().push(symbol.to_string());
        self.total.fetch_add(1, Ordering::SeqCst);

        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(symbol)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(Scripted::Fail);

        tokio::task::yield_now().await;

        match next {
            Scripted::Prices(prices) => Ok(samples(prices)),
            Scripted::Slow(delay, prices) => {
                tokio::time::sleep(delay).await;
                Ok(samples(prices))
            }
            Scripted::Hang => std::future::pending().await,
            Scripted::Empty => Ok(Vec::new()),
            Scripted::Fail => anyhow::bail!("scripted failure for {}", symbol),
            Scripted::Panic => panic!("scripted panic for {}", symbol),
        }
    }
}

/// DisplaySink qui enregistre les notifications
#[derive(Default)]
pub struct RecordingSink {
    quotes: Mutex<Vec<DisplayQuote>>,
    startups: AtomicUsize,
}

impl RecordingSink {
    pub fn quotes(&self) -> Vec<DisplayQuote> {
        self.quotes.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<DisplayQuote> {
        self.quotes.lock().unwrap().last().cloned()
    }

    pub fn startup_count(&self) -> usize {
        self.startups.load(Ordering::SeqCst)
    }
}

impl DisplaySink for RecordingSink {
    fn on_display_changed(&self, quote: DisplayQuote) {
        self.quotes.lock().unwrap().push(quote);
    }

    fn on_startup_complete(&self) {
        self.startups.fetch_add(1, Ordering::SeqCst);
    }
}
