// ============================================================================
// Module : display
// ============================================================================
// Frontière entre le moteur de cotations et la présentation
//
// Le moteur (cache, fetcher, rotator) tourne sur les threads du runtime
// tokio. L'interface, elle, vit dans sa propre boucle. Tous les chemins qui
// changent la cotation affichée passent par DisplaySink, et l'implémentation
// WatchSink se contente de déposer la valeur dans un canal lu par l'UI :
// aucun code du moteur ne touche directement à l'état de l'interface.
//
// CONCEPT RUST : tokio::sync::watch
// - Canal "dernière valeur" : un seul slot, chaque envoi écrase le précédent
// - Le lecteur voit toujours la valeur la plus récente (coalescing gratuit)
// ============================================================================

use tokio::sync::watch;

use crate::models::DisplayQuote;

/// Récepteur des changements d'affichage
///
/// Les méthodes sont appelées depuis le moteur, éventuellement alors qu'un
/// verrou du cache est tenu : elles ne doivent pas bloquer.
pub trait DisplaySink: Send + Sync {
    /// La cotation affichée a changé
    fn on_display_changed(&self, quote: DisplayQuote);

    /// Le premier cycle de fetch est terminé (appelé une seule fois)
    fn on_startup_complete(&self) {}
}

/// État publié vers l'interface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayState {
    /// Cotation actuellement affichée (None avant la première rotation)
    pub quote: Option<DisplayQuote>,

    /// true tant que le premier cycle de fetch n'est pas terminé
    pub starting: bool,
}

/// DisplaySink qui publie dans un canal watch lu par la boucle d'UI
#[derive(Debug)]
pub struct WatchSink {
    tx: watch::Sender<DisplayState>,
}

impl WatchSink {
    /// Crée le sink et le récepteur à donner à l'interface
    pub fn new() -> (Self, watch::Receiver<DisplayState>) {
        let (tx, rx) = watch::channel(DisplayState {
            quote: None,
            starting: true,
        });
        (Self { tx }, rx)
    }
}

impl DisplaySink for WatchSink {
    fn on_display_changed(&self, quote: DisplayQuote) {
        self.tx.send_modify(|state| state.quote = Some(quote));
    }

    fn on_startup_complete(&self) {
        self.tx.send_modify(|state| state.starting = false);
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_watch_sink_keeps_latest() {
        let (sink, rx) = WatchSink::new();
        assert!(rx.borrow().starting);
        assert!(rx.borrow().quote.is_none());

        sink.on_display_changed(DisplayQuote::placeholder("MSFT", Utc::now()));
        sink.on_display_changed(DisplayQuote::placeholder("VWS.CO", Utc::now()));
        sink.on_startup_complete();

        let state = rx.borrow().clone();
        assert!(!state.starting);
        assert_eq!(state.quote.map(|q| q.ticker), Some("VWS.CO".to_string()));
    }
}
