// ============================================================================
// LazyTicker - Library
// ============================================================================
// Expose les modules publics pour le binaire et les tests
// ============================================================================

pub mod api;       // Sources de cotations (Yahoo Finance)
pub mod app;       // État de l'application TUI
pub mod cache;     // Dernière cotation par ticker
pub mod config;    // Configuration (JSON)
pub mod display;   // Frontière moteur → présentation
pub mod fetcher;   // Cycles de fetch
pub mod market;    // Heures d'ouverture par marché
pub mod models;    // Structures de données
pub mod rotator;   // Rotation de l'affichage
pub mod scheduler; // Déclencheurs périodiques
pub mod ui;        // Interface utilisateur

#[cfg(test)]
pub(crate) mod testing;
