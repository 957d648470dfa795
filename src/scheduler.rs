// ============================================================================
// Structure : Scheduler
// ============================================================================
// Possède les deux déclencheurs périodiques indépendants :
// - fetch : toutes les `polling_interval` (configuration), un cycle complet
// - rotation : toutes les 15 secondes, ticker suivant
//
// CONCEPTS RUST :
// 1. tokio::time::interval_at : timer périodique, premier tick après une période
// 2. JoinHandle : poignée sur la tâche d'un déclencheur (arrêt via abort)
// 3. watch::channel(bool) : signal d'arrêt observé par les boucles
//
// Chaque tick de fetch lance son cycle dans une tâche séparée : un réseau
// plus lent que l'intervalle ne bloque ni la rotation ni le tick suivant.
// ============================================================================

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::fetcher::{CycleReport, Fetcher};
use crate::rotator::Rotator;

/// Intervalle fixe de rotation de l'affichage
pub const ROTATION_INTERVAL: Duration = Duration::from_secs(15);

/// Source de l'heure courante (injectable pour les tests)
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Tâches des déclencheurs en cours
#[derive(Default)]
struct Triggers {
    fetch: Option<JoinHandle<()>>,
    rotate: Option<JoinHandle<()>>,
}

/// Ordonnanceur des cycles de fetch et de rotation
pub struct Scheduler {
    fetcher: Arc<Fetcher>,
    rotator: Arc<Rotator>,
    polling_interval: Duration,
    clock: Clock,
    triggers: Mutex<Triggers>,
    stop_tx: watch::Sender<bool>,
}

fn is_running(handle: &Option<JoinHandle<()>>) -> bool {
    handle.as_ref().is_some_and(|h| !h.is_finished())
}

impl Scheduler {
    pub fn new(fetcher: Arc<Fetcher>, rotator: Arc<Rotator>, polling_interval: Duration) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            fetcher,
            rotator,
            polling_interval,
            clock: Arc::new(Utc::now),
            triggers: Mutex::new(Triggers::default()),
            stop_tx,
        }
    }

    /// Remplace l'horloge (tests)
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn triggers(&self) -> MutexGuard<'_, Triggers> {
        self.triggers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Démarrage : les deux déclencheurs, puis un premier cycle attendu
    ///
    /// Les déclencheurs tournent avant le premier cycle : une requête qui ne
    /// répond pas ne retarde ni la rotation ni les cycles suivants.
    /// Quand cette fonction retourne, le cache contient tout ce que le
    /// premier cycle a pu récupérer.
    pub async fn startup(&self) -> CycleReport {
        info!(
            polling = ?self.polling_interval,
            rotation = ?ROTATION_INTERVAL,
            "Scheduler starting"
        );
        self.start();
        let report = self.fetcher.run_cycle((self.clock)()).await;
        // Affiche tout de suite le premier ticker disponible
        self.rotator.rotate_once();
        report
    }

    /// (Re)démarre les déclencheurs ; sans effet sur un déclencheur actif
    pub fn start(&self) {
        let mut triggers = self.triggers();

        // CONCEPT : send_if_modified
        // - Ne réveille les boucles que si le drapeau passe de true à false
        // - Un start redondant ne déclenche donc aucun tick en avance
        self.stop_tx.send_if_modified(|stopped| std::mem::replace(stopped, false));

        if !is_running(&triggers.fetch) {
            debug!("Starting fetch trigger");
            triggers.fetch = Some(self.spawn_fetch_trigger());
        }
        if !is_running(&triggers.rotate) {
            debug!("Starting rotation trigger");
            triggers.rotate = Some(self.spawn_rotation_trigger());
        }
    }

    /// Arrête les deux déclencheurs
    ///
    /// Idempotent. Les cycles déjà lancés peuvent se terminer et écrire
    /// leur résultat ; aucun nouveau tick ne part après l'arrêt.
    pub fn stop(&self) {
        // Drapeau et poignées changent sous le même verrou que dans start()
        let mut triggers = self.triggers();
        self.stop_tx.send_replace(true);
        let mut stopped = false;

        for handle in [triggers.fetch.take(), triggers.rotate.take()].into_iter().flatten() {
            handle.abort();
            stopped = true;
        }
        if stopped {
            info!("Scheduler stopped");
        }
    }

    /// Vrai si au moins un déclencheur tourne
    pub fn is_running(&self) -> bool {
        let triggers = self.triggers();
        is_running(&triggers.fetch) || is_running(&triggers.rotate)
    }

    fn spawn_fetch_trigger(&self) -> JoinHandle<()> {
        let fetcher = self.fetcher.clone();
        let clock = self.clock.clone();
        let period = self.polling_interval;
        let mut stop_rx = self.stop_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while wait_for_tick(&mut ticker, &mut stop_rx).await {
                // Un cycle par tick, sans attendre le précédent
                let fetcher = fetcher.clone();
                let now = clock();
                let cycle = tokio::spawn(async move {
                    fetcher.run_cycle(now).await;
                });
                tokio::spawn(async move {
                    if let Err(e) = cycle.await {
                        error!(error = %e, "Fetch cycle aborted");
                    }
                });
            }
            debug!("Fetch trigger exited");
        })
    }

    fn spawn_rotation_trigger(&self) -> JoinHandle<()> {
        let rotator = self.rotator.clone();
        let period = ROTATION_INTERVAL;
        let mut stop_rx = self.stop_tx.subscribe();

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            while wait_for_tick(&mut ticker, &mut stop_rx).await {
                rotator.rotate_once();
            }
            debug!("Rotation trigger exited");
        })
    }
}

/// Attend le prochain tick ; false si le déclencheur doit s'arrêter
///
/// Un changement du drapeau d'arrêt ne produit jamais de tick : on se
/// remet en attente tant qu'il vaut false.
async fn wait_for_tick(ticker: &mut Interval, stop_rx: &mut watch::Receiver<bool>) -> bool {
    loop {
        tokio::select! {
            _ = ticker.tick() => return !*stop_rx.borrow(),
            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow_and_update() {
                    return false;
                }
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

// ============================================================================
// Tests unitaires
// ============================================================================
// CONCEPT : #[tokio::test(start_paused = true)]
// - L'horloge tokio est mise en pause : les sleeps avancent instantanément
// - Les timers sont déterministes, les tests ne durent pas 15 secondes
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::QuoteCache;
    use crate::config::{ActiveHours, MarketHours};
    use crate::models::Movement;
    use crate::testing::{RecordingSink, Scripted, ScriptedSource};
    use chrono::{NaiveTime, TimeZone};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    struct Fixture {
        source: Arc<ScriptedSource>,
        cache: Arc<QuoteCache>,
        sink: Arc<RecordingSink>,
        scheduler: Arc<Scheduler>,
    }

    /// MSFT (US) fermé, VWS.CO (DK) ouvert, polling 2 s
    fn fixture() -> Fixture {
        let source = Arc::new(ScriptedSource::default());
        let sink = Arc::new(RecordingSink::default());
        let cache = Arc::new(QuoteCache::new(sink.clone()));
        let symbols = vec!["MSFT".to_string(), "VWS.CO".to_string()];
        let hours = MarketHours::new(ActiveHours::new(t(9, 0), t(17, 0)))
            .with_market("US", ActiveHours::new(t(9, 30), t(16, 0)));

        let fetcher = Arc::new(Fetcher::new(
            source.clone(),
            cache.clone(),
            sink.clone(),
            symbols.clone(),
            hours,
        ));
        let rotator = Arc::new(Rotator::new(cache.clone(), symbols));
        // 08:00 UTC : Copenhague 09:00, New York 03:00
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        let scheduler = Arc::new(
            Scheduler::new(fetcher, rotator, Duration::from_secs(2)).with_clock(Arc::new(move || now)),
        );

        Fixture { source, cache, sink, scheduler }
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_runs_one_cycle_immediately() {
        let f = fixture();
        f.source.script("MSFT", vec![Scripted::Prices(vec![410.0])]);
        f.source.script("VWS.CO", vec![Scripted::Prices(vec![100.0])]);

        f.scheduler.startup().await;

        assert_eq!(f.source.call_count(), 2);
        assert_eq!(f.sink.startup_count(), 1);
        assert!(f.scheduler.is_running());
        // Premier ticker affiché dès le démarrage
        assert_eq!(f.sink.last().unwrap().ticker, "MSFT");
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_scenario() {
        let f = fixture();
        f.source.script("MSFT", vec![Scripted::Prices(vec![410.0])]);
        f.source.script(
            "VWS.CO",
            vec![Scripted::Prices(vec![100.0]), Scripted::Prices(vec![100.5])],
        );

        f.scheduler.startup().await;
        let msft_before = f.cache.get("MSFT").unwrap();

        // Un tick de fetch (2 s)
        tokio::time::sleep(Duration::from_millis(2500)).await;

        assert_eq!(f.source.calls_for("MSFT"), 1);
        assert_eq!(f.source.calls_for("VWS.CO"), 2);

        let msft = f.cache.get("MSFT").unwrap();
        assert!(!msft.market_open);
        assert_eq!(msft.price, msft_before.price);

        let vws = f.cache.get("VWS.CO").unwrap();
        assert_eq!(vws.movement, Movement::Up);
        assert!(vws.market_open);
        f.scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rotation_cadence() {
        let f = fixture();
        f.source.script("MSFT", vec![Scripted::Prices(vec![410.0])]);
        f.source.script("VWS.CO", vec![Scripted::Prices(vec![100.0])]);

        f.scheduler.startup().await;
        assert_eq!(f.sink.last().unwrap().ticker, "MSFT");

        // Avant 15 s : pas de rotation
        tokio::time::sleep(Duration::from_secs(14)).await;
        let shown: Vec<_> = f.sink.quotes().into_iter().map(|q| q.ticker).collect();
        assert!(!shown.contains(&"VWS.CO".to_string()));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(f.sink.last().unwrap().ticker, "VWS.CO");

        tokio::time::sleep(Duration::from_secs(15)).await;
        assert_eq!(f.sink.last().unwrap().ticker, "MSFT");
        f.scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_prevents_new_ticks() {
        let f = fixture();
        f.scheduler.startup().await;
        let calls = f.source.call_count();

        f.scheduler.stop();
        f.scheduler.stop();
        assert!(!f.scheduler.is_running());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(f.source.call_count(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent_and_restartable() {
        let f = fixture();
        f.source.script("VWS.CO", vec![Scripted::Prices(vec![100.0]); 20]);
        f.scheduler.startup().await;

        // Démarrer deux fois ne double pas les ticks
        f.scheduler.start();
        f.scheduler.start();
        let before = f.source.calls_for("VWS.CO");
        tokio::time::sleep(Duration::from_millis(4500)).await;
        assert_eq!(f.source.calls_for("VWS.CO"), before + 2);

        f.scheduler.stop();
        tokio::time::sleep(Duration::from_secs(10)).await;
        let stopped_at = f.source.calls_for("VWS.CO");

        f.scheduler.start();
        assert!(f.scheduler.is_running());
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(f.source.calls_for("VWS.CO"), stopped_at + 1);
        f.scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_redundant_start_fires_nothing_early() {
        let f = fixture();
        f.source.script("MSFT", vec![Scripted::Prices(vec![410.0])]);
        f.source.script("VWS.CO", vec![Scripted::Prices(vec![100.0])]);
        f.scheduler.startup().await;

        let shown = f.sink.quotes().len();
        let calls = f.source.call_count();

        f.scheduler.start();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(f.sink.quotes().len(), shown);
        assert_eq!(f.source.call_count(), calls);
        f.scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_triggers_run_while_first_cycle_hangs() {
        let f = fixture();
        f.source.script("MSFT", vec![Scripted::Hang, Scripted::Prices(vec![410.0])]);
        f.source.script(
            "VWS.CO",
            vec![Scripted::Hang, Scripted::Prices(vec![100.0]), Scripted::Prices(vec![101.0])],
        );

        let startup = tokio::spawn({
            let scheduler = f.scheduler.clone();
            async move { scheduler.startup().await }
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(f.scheduler.is_running());
        assert!(!startup.is_finished());
        assert_eq!(f.sink.startup_count(), 0);

        // Le tick de fetch suivant (2 s) aboutit et lève l'indicateur
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(f.sink.startup_count(), 1);
        assert!(f.cache.get("MSFT").is_some());
        assert!(f.cache.get("VWS.CO").is_some());

        // La rotation continue malgré le premier cycle bloqué
        tokio::time::sleep(Duration::from_secs(15)).await;
        assert!(f.sink.quotes().iter().any(|q| q.ticker == "MSFT"));
        assert_eq!(f.cache.get("VWS.CO").unwrap().movement, Movement::Up);
        assert!(!startup.is_finished());
        assert_eq!(f.sink.startup_count(), 1);

        startup.abort();
        f.scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_overlapping_cycles_serialize_writes() {
        let f = fixture();
        let slow = Duration::from_secs(5);
        f.source.script("MSFT", vec![Scripted::Prices(vec![410.0])]);
        f.source.script(
            "VWS.CO",
            (0..10)
                .map(|i| Scripted::Slow(slow, vec![100.0 + i as f64]))
                .collect(),
        );

        // Chaque réponse prend 5 s, le polling est de 2 s
        f.scheduler.startup().await;
        tokio::time::sleep(Duration::from_millis(4500)).await;

        // Appels à 0, 2, 4, 6, 8 s ; les trois premiers ont répondu
        assert_eq!(f.source.calls_for("VWS.CO"), 5);
        let vws = f.cache.get("VWS.CO").unwrap();
        assert_eq!(vws.price, Decimal::from_str("102").unwrap());
        assert_eq!(vws.movement, Movement::Up);
        assert!(vws.market_open);

        // MSFT (fermé) garde son prix du premier cycle
        let msft = f.cache.get("MSFT").unwrap();
        assert_eq!(msft.price, Decimal::from_str("410").unwrap());
        assert!(!msft.market_open);
        f.scheduler.stop();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_start_stop_keep_flag_and_triggers_in_sync() {
        let f = fixture();
        let runtime = tokio::runtime::Handle::current();

        std::thread::scope(|scope| {
            for i in 0..4 {
                let scheduler = &f.scheduler;
                let runtime = runtime.clone();
                scope.spawn(move || {
                    let _guard = runtime.enter();
                    for _ in 0..50 {
                        if i % 2 == 0 {
                            scheduler.start();
                        } else {
                            scheduler.stop();
                        }
                    }
                });
            }
        });

        // Déclencheurs actifs si et seulement si le drapeau d'arrêt est baissé
        let stopped = *f.scheduler.stop_tx.borrow();
        assert_eq!(f.scheduler.is_running(), !stopped);

        f.scheduler.start();
        assert!(f.scheduler.is_running());
        f.scheduler.stop();
        assert!(!f.scheduler.is_running());
        assert!(*f.scheduler.stop_tx.borrow());
    }
}
