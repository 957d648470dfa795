// ============================================================================
// API Client : Yahoo Finance
// ============================================================================
// Récupère les derniers prix intraday depuis l'endpoint "chart" de Yahoo
//
// CONCEPTS RUST :
// 1. async/await : programmation asynchrone (non-bloquante)
// 2. Result<T, E> : gestion d'erreurs avec contexte
// 3. Serde : désérialisation JSON automatique
// ============================================================================

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::api::QuoteSource;
use crate::models::{Interval, PriceSample, Range};

const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

// Ajout d'un User-Agent pour éviter le blocage par Yahoo
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Durée max d'une requête : au-delà, le ticker compte comme un échec du cycle
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Structures pour parser la réponse JSON de Yahoo Finance
// ============================================================================
// On ne garde que ce dont on a besoin : les timestamps et les clôtures
// ============================================================================

/// Réponse complète de l'API Yahoo Finance
#[derive(Debug, Deserialize)]
struct YahooResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

// ============================================================================
// Client
// ============================================================================

/// Client Yahoo Finance
///
/// CONCEPT : Réutilisation du client HTTP
/// - reqwest::Client garde un pool de connexions
/// - On le crée une seule fois, puis on le clone à bas coût si besoin
#[derive(Debug, Clone)]
pub struct YahooClient {
    http: reqwest::Client,
    base_url: String,
}

impl YahooClient {
    /// Crée un client pointant vers Yahoo Finance
    ///
    /// Une requête bloquée est coupée après REQUEST_TIMEOUT.
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(REQUEST_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Échec de la création du client HTTP")?;

        Ok(Self {
            http,
            base_url: YAHOO_CHART_URL.to_string(),
        })
    }

    /// Construit l'URL de l'API Yahoo Finance
    fn build_url(&self, symbol: &str, interval: Interval, range: Range) -> String {
        format!(
            "{}/{}?interval={}&range={}",
            self.base_url,
            symbol,
            interval.to_yahoo_string(),
            range.to_yahoo_string()
        )
    }
}

#[async_trait]
impl QuoteSource for YahooClient {
    /// CONCEPT RUST : #[instrument]
    /// - Ajoute automatiquement un span avec le symbole
    /// - Tous les logs à l'intérieur auront ce contexte
    #[instrument(skip(self, interval, range))]
    async fn recent_samples(
        &self,
        symbol: &str,
        interval: Interval,
        range: Range,
    ) -> Result<Vec<PriceSample>> {
        let url = self.build_url(symbol, interval, range);
        debug!(url = %url, "Sending HTTP request to Yahoo Finance");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Échec de la requête HTTP vers Yahoo Finance")?;

        let status = response.status();
        debug!(status = %status, "Received HTTP response");

        // Vérifie que la réponse est un succès HTTP (200-299)
        if !status.is_success() {
            anyhow::bail!("Yahoo Finance a retourné une erreur : HTTP {}", status);
        }

        let body = response
            .text()
            .await
            .context("Échec de la lecture de la réponse Yahoo")?;

        let samples = parse_chart(&body)?;
        debug!(samples = samples.len(), "Parsed Yahoo chart");
        Ok(samples)
    }
}

/// Parse le JSON "chart" de Yahoo en échantillons chronologiques
///
/// - Les clôtures nulles (intervalle sans transaction) sont ignorées
/// - Pas de résultat ou pas de clôtures → liste vide (pas une erreur)
/// - Un champ "error" renseigné → erreur
fn parse_chart(body: &str) -> Result<Vec<PriceSample>> {
    let response: YahooResponse =
        serde_json::from_str(body).context("Échec du parsing JSON de la réponse Yahoo")?;

    if let Some(error) = response.chart.error {
        if !error.is_null() {
            anyhow::bail!("Yahoo Finance a retourné une erreur : {}", error);
        }
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let timestamps = result.timestamp.unwrap_or_default();
    let closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .and_then(|q| q.close)
        .unwrap_or_default();

    let mut samples = Vec::with_capacity(timestamps.len());
    let mut skipped = 0;
    for (i, &timestamp) in timestamps.iter().enumerate() {
        let Some(close) = closes.get(i).and_then(|&v| v) else {
            skipped += 1;
            continue;
        };
        let datetime = DateTime::from_timestamp(timestamp, 0).context("Timestamp invalide")?;
        samples.push(PriceSample::new(datetime, close));
    }

    if skipped > 0 {
        warn!(skipped, total = timestamps.len(), "Skipped samples with missing close");
    }

    Ok(samples)
}

// ============================================================================
// Tests unitaires
// ============================================================================
