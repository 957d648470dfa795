// ============================================================================
// Module : config
// ============================================================================
// Configuration du widget, chargée depuis un fichier JSON
//
// {
//   "polling_interval": "00:00:02",
//   "tickers": ["MSFT", "VWS.CO"],
//   "active_hours": { "start": "09:00", "end": "17:00" },
//   "markets": { "US": { "start": "09:30", "end": "16:00" } }
// }
//
// CONCEPTS RUST :
// 1. Serde avec #[serde(default)] : chaque champ est optionnel
// 2. deserialize_with : parsing personnalisé ("HH:MM:SS" → Duration)
// 3. Validation explicite après chargement (Result + bail!)
// ============================================================================

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

/// Nom du fichier cherché dans le répertoire courant
pub const CONFIG_FILE_NAME: &str = "lazyticker.json";

/// Variables d'environnement reconnues
pub const ENV_POLLING_INTERVAL: &str = "LAZYTICKER_POLLING_INTERVAL";
pub const ENV_TICKERS: &str = "LAZYTICKER_TICKERS";

/// Tickers suivis par défaut
pub const DEFAULT_TICKERS: [&str; 5] = ["MSFT", "PLTR", "VWS.CO", "ISS.CO", "NETC.CO"];

/// Plage horaire quotidienne d'ouverture d'un marché (heure locale du marché)
///
/// Intervalle [start, end) sur une même journée : pas de passage à minuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ActiveHours {
    #[serde(deserialize_with = "deserialize_time")]
    pub start: NaiveTime,
    #[serde(deserialize_with = "deserialize_time")]
    pub end: NaiveTime,
}

impl ActiveHours {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Vrai si l'heure locale est dans [start, end)
    pub fn is_within(&self, local_time: NaiveTime) -> bool {
        local_time >= self.start && local_time < self.end
    }
}

impl Default for ActiveHours {
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            end: NaiveTime::from_hms_opt(17, 0, 0).unwrap_or_default(),
        }
    }
}

/// Table des plages horaires par code marché, avec une plage par défaut
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketHours {
    pub default: ActiveHours,
    pub markets: HashMap<String, ActiveHours>,
}

impl MarketHours {
    pub fn new(default: ActiveHours) -> Self {
        Self {
            default,
            markets: HashMap::new(),
        }
    }

    /// Ajoute (ou remplace) la plage d'un marché
    pub fn with_market(mut self, code: &str, hours: ActiveHours) -> Self {
        self.markets.insert(code.to_uppercase(), hours);
        self
    }

    /// Plage applicable à un code marché (insensible à la casse)
    pub fn window_for(&self, code: &str) -> &ActiveHours {
        self.markets
            .get(&code.to_uppercase())
            .unwrap_or(&self.default)
    }
}

/// Configuration complète du widget
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Intervalle entre deux cycles de fetch
    #[serde(deserialize_with = "deserialize_duration")]
    pub polling_interval: Duration,

    /// Symboles suivis (fixés au démarrage)
    pub tickers: Vec<String>,

    /// Plage horaire par défaut
    pub active_hours: ActiveHours,

    /// Plages horaires par marché (clé = code marché, ex: "DK", "US")
    pub markets: HashMap<String, ActiveHours>,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            polling_interval: Duration::from_secs(2),
            tickers: DEFAULT_TICKERS.iter().map(|t| t.to_string()).collect(),
            active_hours: ActiveHours::default(),
            markets: HashMap::new(),
        }
    }
}

impl WidgetConfig {
    /// Parse et valide une configuration JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let mut config: WidgetConfig =
            serde_json::from_str(json).context("Configuration JSON invalide")?;

        // Clés de marché insensibles à la casse
        config.markets = config
            .markets
            .into_iter()
            .map(|(code, hours)| (code.trim().to_uppercase(), hours))
            .collect();
        config.tickers = config
            .tickers
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        config.validate()?;
        Ok(config)
    }

    /// Charge la configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Impossible de lire {}", path.display()))?;
        let config = Self::from_json(&json)
            .with_context(|| format!("Configuration invalide dans {}", path.display()))?;
        info!(path = %path.display(), tickers = config.tickers.len(), "Configuration loaded");
        Ok(config)
    }

    /// Cherche le fichier de configuration, sinon retourne la configuration par défaut
    ///
    /// Ordre : chemin explicite, ./lazyticker.json, <config_dir>/lazyticker/config.json.
    /// Les variables d'environnement LAZYTICKER_* s'appliquent ensuite.
    pub fn discover(explicit: Option<PathBuf>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::load(&path)?,
            None => Self::discover_file()?,
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    fn discover_file() -> Result<Self> {
        let candidates = [
            Some(PathBuf::from(CONFIG_FILE_NAME)),
            dirs::config_dir().map(|dir| dir.join("lazyticker").join("config.json")),
        ];

        for path in candidates.into_iter().flatten() {
            if path.is_file() {
                return Self::load(&path);
            }
        }

        info!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Surcharge la configuration par des variables d'environnement
    ///
    /// - LAZYTICKER_POLLING_INTERVAL : "HH:MM:SS", "MM:SS" ou secondes
    /// - LAZYTICKER_TICKERS : symboles séparés par des virgules
    ///
    /// `lookup` lit une variable (std::env::var en production).
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_POLLING_INTERVAL) {
            self.polling_interval = parse_env_duration(&raw)
                .with_context(|| format!("{} invalide", ENV_POLLING_INTERVAL))?;
            info!(polling = ?self.polling_interval, "Polling interval overridden from environment");
        }

        if let Some(raw) = lookup(ENV_TICKERS) {
            self.tickers = raw
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
            info!(tickers = ?self.tickers, "Tickers overridden from environment");
        }

        self.validate()?;
        Ok(self)
    }

    /// Vérifie les invariants de la configuration
    ///
    /// - polling_interval > 0
    /// - start != end pour chaque plage
    pub fn validate(&self) -> Result<()> {
        if self.polling_interval.is_zero() {
            anyhow::bail!("polling_interval doit être > 0");
        }

        check_window("active_hours", &self.active_hours)?;
        for (code, hours) in &self.markets {
            check_window(&format!("markets.{}", code), hours)?;
        }

        if self.tickers.is_empty() {
            warn!("No tickers configured, nothing will be displayed");
        }
        Ok(())
    }

    /// Table des plages horaires dérivée de la configuration
    pub fn market_hours(&self) -> MarketHours {
        MarketHours {
            default: self.active_hours,
            markets: self.markets.clone(),
        }
    }
}

fn check_window(name: &str, hours: &ActiveHours) -> Result<()> {
    if hours.start == hours.end {
        anyhow::bail!("{} : start et end ne peuvent pas être égaux", name);
    }
    if hours.start > hours.end {
        warn!(window = %name, start = %hours.start, end = %hours.end, "Window wraps past midnight, it will never be open");
    }
    Ok(())
}

// ============================================================================
// Désérialisation personnalisée
// ============================================================================
// CONCEPT RUST : deserialize_with
// - Serde appelle notre fonction au lieu du Deserialize par défaut
// - On accepte un format "humain" dans le fichier
// ============================================================================

/// Valeur brute acceptée pour une durée : "HH:MM:SS", "MM:SS" ou secondes
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDuration {
    Seconds(f64),
    Text(String),
}

fn deserialize_duration<'de, D>(deserializer: D) -> std::result::Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = RawDuration::deserialize(deserializer)?;
    match raw {
        RawDuration::Seconds(secs) => Duration::try_from_secs_f64(secs)
            .map_err(|_| serde::de::Error::custom(format!("durée invalide : {}", secs))),
        RawDuration::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

/// Durée venant de l'environnement : nombre de secondes ou "HH:MM:SS"
fn parse_env_duration(text: &str) -> Result<Duration> {
    match text.trim().parse::<f64>() {
        Ok(secs) => Duration::try_from_secs_f64(secs)
            .with_context(|| format!("durée invalide : {}", secs)),
        Err(_) => parse_duration(text),
    }
}

/// Parse "HH:MM:SS" ou "MM:SS"
pub fn parse_duration(text: &str) -> Result<Duration> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    let numbers = parts
        .iter()
        .map(|p| p.parse::<u64>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("durée invalide : {:?}", text))?;

    let secs = match numbers.as_slice() {
        [h, m, s] => h
            .saturating_mul(3600)
            .saturating_add(m.saturating_mul(60))
            .saturating_add(*s),
        [m, s] => m.saturating_mul(60).saturating_add(*s),
        _ => anyhow::bail!("durée invalide : {:?} (attendu HH:MM:SS ou MM:SS)", text),
    };
    Ok(Duration::from_secs(secs))
}

fn deserialize_time<'de, D>(deserializer: D) -> std::result::Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let text = String::deserialize(deserializer)?;
    parse_time(&text).map_err(serde::de::Error::custom)
}

/// Parse "HH:MM" ou "HH:MM:SS"
pub fn parse_time(text: &str) -> Result<NaiveTime> {
    let text = text.trim();
    let time = NaiveTime::parse_from_str(text, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M"))
        .with_context(|| format!("heure invalide : {:?} (attendu HH:MM)", text))?;
    // Pas de fractions de seconde dans une plage horaire
    Ok(time.with_nanosecond(0).unwrap_or(time))
}

// ============================================================================
// Tests unitaires
// ============================================================================
