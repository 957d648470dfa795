// ============================================================================
// Module : market
// ============================================================================
// Horloge des marchés : à partir d'un symbole, retrouve le code marché, le
// fuseau horaire de la place de cotation, et décide si le marché est ouvert
//
// CONCEPTS RUST :
// 1. Fonctions pures : pas d'I/O, pas d'état, faciles à tester
// 2. chrono-tz : fuseaux IANA compilés dans le binaire
// 3. Enum pour le fallback : un fuseau connu OU l'heure locale de la machine
// ============================================================================

use chrono::{DateTime, Local, NaiveTime, Utc};
use chrono_tz::Tz;

use crate::config::MarketHours;

/// Code marché attribué aux symboles sans suffixe connu
pub const DEFAULT_MARKET: &str = "US";

/// Suffixe du symbole → code marché
const SUFFIXES: [(&str, &str); 9] = [
    (".CO", "DK"),
    (".ST", "SE"),
    (".OL", "NO"),
    (".HE", "FI"),
    (".DE", "DE"),
    (".PA", "FR"),
    (".AS", "NL"),
    (".L", "UK"),
    (".TO", "CA"),
];

/// Code marché → fuseau horaire de la place
const TIMEZONES: [(&str, Tz); 10] = [
    ("US", chrono_tz::America::New_York),
    ("DK", chrono_tz::Europe::Copenhagen),
    ("SE", chrono_tz::Europe::Stockholm),
    ("NO", chrono_tz::Europe::Oslo),
    ("FI", chrono_tz::Europe::Helsinki),
    ("DE", chrono_tz::Europe::Berlin),
    ("FR", chrono_tz::Europe::Paris),
    ("NL", chrono_tz::Europe::Amsterdam),
    ("UK", chrono_tz::Europe::London),
    ("CA", chrono_tz::America::Toronto),
];

/// Fuseau horaire d'un marché
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketZone {
    /// Fuseau IANA connu
    Named(Tz),
    /// Fuseau local de la machine (code inconnu)
    Local,
}

impl MarketZone {
    /// Heure locale du marché à un instant UTC donné
    pub fn local_time(&self, instant: DateTime<Utc>) -> NaiveTime {
        match self {
            MarketZone::Named(tz) => instant.with_timezone(tz).time(),
            MarketZone::Local => instant.with_timezone(&Local).time(),
        }
    }
}

/// Retrouve le code marché d'un symbole à partir de son suffixe
///
/// Comparaison insensible à la casse : "vws.co" → "DK"
pub fn resolve_market_code(symbol: &str) -> &'static str {
    let upper = symbol.trim().to_uppercase();
    SUFFIXES
        .iter()
        .find(|(suffix, _)| upper.ends_with(suffix))
        .map(|&(_, code)| code)
        .unwrap_or(DEFAULT_MARKET)
}

/// Fuseau horaire d'un code marché
///
/// N'échoue jamais : un code inconnu retombe sur le fuseau local.
pub fn resolve_timezone(market_code: &str) -> MarketZone {
    TIMEZONES
        .iter()
        .find(|(code, _)| code.eq_ignore_ascii_case(market_code))
        .map(|&(_, tz)| MarketZone::Named(tz))
        .unwrap_or(MarketZone::Local)
}

/// Le marché du symbole est-il ouvert à cet instant ?
///
/// Convertit l'instant en heure locale du marché puis teste la plage
/// horaire du marché (ou la plage par défaut).
pub fn is_market_open(symbol: &str, instant: DateTime<Utc>, hours: &MarketHours) -> bool {
    let code = resolve_market_code(symbol);
    let local_time = resolve_timezone(code).local_time(instant);
    hours.window_for(code).is_within(local_time)
}

// ============================================================================
// Tests unitaires
// ============================================================================
