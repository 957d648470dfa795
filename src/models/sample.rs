// ============================================================================
// Structure : PriceSample
// ============================================================================
// Un échantillon (timestamp, prix de clôture) renvoyé par une source de
// cotations, plus les paramètres de requête (granularité, plage)
// ============================================================================

use chrono::{DateTime, Utc};

/// Échantillon de prix : horodatage UTC + prix de clôture brut
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceSample {
    pub timestamp: DateTime<Utc>,
    pub close: f64,
}

impl PriceSample {
    pub fn new(timestamp: DateTime<Utc>, close: f64) -> Self {
        Self { timestamp, close }
    }
}

/// Granularité des échantillons intraday
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interval {
    /// 15 minutes
    M15,
}

impl Interval {
    /// Convertit l'intervalle en string pour l'API Yahoo Finance
    ///
    /// CONCEPT RUST : &'static str
    /// - Retourne une string littérale (dans le binaire)
    /// - Pas d'allocation
    pub fn to_yahoo_string(&self) -> &'static str {
        match self {
            Interval::M15 => "15m",
        }
    }
}

/// Plage de temps demandée à la source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Range {
    /// Dernière journée de cotation
    OneDay,
}

impl Range {
    pub fn to_yahoo_string(&self) -> &'static str {
        match self {
            Range::OneDay => "1d",
        }
    }
}

/// Paramètres fixes utilisés par le rafraîchissement : 15 minutes sur 1 jour
pub const QUOTE_INTERVAL: Interval = Interval::M15;
pub const QUOTE_RANGE: Range = Range::OneDay;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yahoo_strings() {
        assert_eq!(QUOTE_INTERVAL.to_yahoo_string(), "15m");
        assert_eq!(QUOTE_RANGE.to_yahoo_string(), "1d");
    }
}
