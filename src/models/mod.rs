// ============================================================================
// Module : models
// ============================================================================
// Ce module contient toutes les structures de données de l'application
//
// CONCEPT RUST : Modules et visibilité
// - "pub mod" : déclare un sous-module publique (accessible depuis l'extérieur)
// - Sans "pub", le module serait privé au crate
// ============================================================================

pub mod quote;  // Cotation affichable + mouvement
pub mod sample; // Échantillons renvoyés par la source

// Re-export des structures principales pour simplifier les imports
// Au lieu de : use lazyticker::models::quote::DisplayQuote;
// On peut faire : use lazyticker::models::DisplayQuote;
pub use quote::{round_price, DisplayQuote, Movement, PRICE_DECIMALS};
pub use sample::{Interval, PriceSample, Range, QUOTE_INTERVAL, QUOTE_RANGE};
