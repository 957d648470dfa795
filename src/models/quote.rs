// ============================================================================
// Structure : DisplayQuote
// ============================================================================
// Dernière cotation connue pour un ticker, telle qu'elle est affichée
//
// CONCEPTS RUST :
// 1. Valeur immuable remplacée en bloc : on ne modifie jamais un champ
//    d'une cotation déjà publiée, on en crée une nouvelle (copy-on-write)
// 2. rust_decimal::Decimal : prix exacts, pas d'erreurs d'arrondi flottant
// ============================================================================

use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Nombre de décimales conservées pour un prix
pub const PRICE_DECIMALS: u32 = 3;

/// Sens du mouvement d'un prix par rapport au précédent prix en cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// Premier prix connu depuis le démarrage
    Initial,
    Up,
    Down,
    Unchanged,
}

impl Movement {
    /// Classe un nouveau prix par rapport au prix précédent (s'il existe)
    ///
    /// CONCEPT RUST : match sur un tuple avec Ordering
    /// - None : pas de prix précédent → Initial
    /// - Some(prev) : comparaison exacte des décimaux
    pub fn classify(previous: Option<Decimal>, current: Decimal) -> Self {
        match previous {
            None => Movement::Initial,
            Some(prev) => match current.cmp(&prev) {
                std::cmp::Ordering::Greater => Movement::Up,
                std::cmp::Ordering::Less => Movement::Down,
                std::cmp::Ordering::Equal => Movement::Unchanged,
            },
        }
    }

    /// Flèche affichée à côté du prix
    pub fn arrow(&self) -> &'static str {
        match self {
            Movement::Initial => "•",
            Movement::Up => "▲",
            Movement::Down => "▼",
            Movement::Unchanged => "=",
        }
    }
}

/// Cotation affichable d'un ticker
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayQuote {
    /// Symbole du ticker (ex: "MSFT", "VWS.CO")
    pub ticker: String,

    /// Prix arrondi à 3 décimales
    pub price: Decimal,

    /// Horodatage (UTC) de l'échantillon renvoyé par la source
    pub as_of: DateTime<Utc>,

    /// Mouvement par rapport au prix précédent
    pub movement: Movement,

    /// true si le marché était ouvert lors de la dernière décision
    pub market_open: bool,
}

impl DisplayQuote {
    /// Cotation "vide" utilisée quand un marché est fermé avant tout fetch réussi
    ///
    /// Prix à zéro, mouvement Initial, marché fermé : la rotation a toujours
    /// quelque chose à montrer.
    pub fn placeholder(ticker: &str, at: DateTime<Utc>) -> Self {
        Self {
            ticker: ticker.to_string(),
            price: Decimal::ZERO,
            as_of: at,
            movement: Movement::Initial,
            market_open: false,
        }
    }

    /// Copie de la cotation marquée "marché fermé"
    ///
    /// Prix, horodatage et mouvement restent figés.
    pub fn closed(&self) -> Self {
        Self {
            market_open: false,
            ..self.clone()
        }
    }
}

/// Arrondit un prix brut à 3 décimales (arrondi bancaire, midpoint → pair)
///
/// Retourne None si le prix n'est pas représentable (NaN, infini).
pub fn round_price(raw: f64) -> Option<Decimal> {
    let value = Decimal::from_f64(raw)?;
    Some(value.round_dp_with_strategy(PRICE_DECIMALS, RoundingStrategy::MidpointNearestEven))
}

// ============================================================================
// Tests unitaires
// ============================================================================
