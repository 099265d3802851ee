//! The converter session: user input, cached rates and the published view.

use super::currency::{Currency, CurrencyRateProvider};
use super::debounce::{CancelToken, DEFAULT_DELAY, Debouncer};
use super::projector::{Conversion, project};
use super::rates::{BatchReport, FailurePolicy, RateCache, fetch_rates};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub amount: String,
    pub base: Currency,
    pub debounce: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            amount: "1.00".to_string(),
            base: Currency::Usd,
            debounce: DEFAULT_DELAY,
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// What a front-end renders.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub amount: String,
    pub base: Currency,
    pub conversions: Vec<Conversion>,
    /// When the last batch was committed.
    pub refreshed_at: Option<DateTime<Utc>>,
    pub last_batch: Option<BatchReport>,
}

#[derive(Debug, Clone)]
struct Input {
    amount: String,
    base: Currency,
}

struct Shared {
    provider: Arc<dyn CurrencyRateProvider>,
    cache: RateCache,
    policy: FailurePolicy,
    input: Mutex<Input>,
    last_batch: Mutex<Option<(DateTime<Utc>, BatchReport)>>,
    // Serializes publishers so an older cache view never lands last.
    publishing: tokio::sync::Mutex<()>,
    updates: watch::Sender<Snapshot>,
}

impl Shared {
    fn input(&self) -> Input {
        self.input.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    async fn publish(&self) {
        let _guard = self.publishing.lock().await;
        let rates = self.cache.snapshot().await;
        let input = self.input();
        let last = self
            .last_batch
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        self.updates.send_replace(Snapshot {
            conversions: project(&input.amount, input.base, &rates),
            amount: input.amount,
            base: input.base,
            refreshed_at: last.as_ref().map(|(at, _)| *at),
            last_batch: last.map(|(_, report)| report),
        });
    }

    async fn run_batch(&self, base: Currency, token: &CancelToken) -> BatchReport {
        let report = fetch_rates(base, self.provider.as_ref(), &self.cache, self.policy, token).await;
        if report.committed {
            *self.last_batch.lock().unwrap_or_else(|e| e.into_inner()) =
                Some((Utc::now(), report.clone()));
            self.publish().await;
        }
        report
    }
}

/// Owns one converter's state for the lifetime of the application.
///
/// Input changes update the published view at once and schedule a debounced
/// rate batch for the current base currency. A batch already in flight is
/// discarded only when the base changes; amount edits let it commit.
/// Dropping the session, or calling [`ConverterSession::shutdown`], cancels
/// pending batches.
pub struct ConverterSession {
    shared: Arc<Shared>,
    debouncer: Mutex<Debouncer<Currency>>,
}

impl ConverterSession {
    pub fn new(provider: Arc<dyn CurrencyRateProvider>, options: SessionOptions) -> Self {
        let input = Input {
            amount: options.amount,
            base: options.base,
        };
        let (updates, _) = watch::channel(Snapshot {
            conversions: project(&input.amount, input.base, &Default::default()),
            amount: input.amount.clone(),
            base: input.base,
            refreshed_at: None,
            last_batch: None,
        });

        Self {
            shared: Arc::new(Shared {
                provider,
                cache: RateCache::new(),
                policy: options.failure_policy,
                input: Mutex::new(input),
                last_batch: Mutex::new(None),
                publishing: tokio::sync::Mutex::new(()),
                updates,
            }),
            debouncer: Mutex::new(Debouncer::new(options.debounce)),
        }
    }

    pub fn amount(&self) -> String {
        self.shared.input().amount
    }

    pub fn base(&self) -> Currency {
        self.shared.input().base
    }

    pub fn cache(&self) -> &RateCache {
        &self.shared.cache
    }

    pub async fn set_amount(&self, amount: impl Into<String>) {
        {
            let mut input = self.shared.input.lock().unwrap_or_else(|e| e.into_inner());
            input.amount = amount.into();
        }
        self.input_changed().await;
    }

    pub async fn set_base(&self, base: Currency) {
        {
            let mut input = self.shared.input.lock().unwrap_or_else(|e| e.into_inner());
            input.base = base;
        }
        self.input_changed().await;
    }

    async fn input_changed(&self) {
        self.shared.publish().await;

        let base = self.base();
        let shared = Arc::clone(&self.shared);
        debug!(%base, "Scheduling rate batch");
        self.debouncer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .schedule(base, move |token| async move {
                shared.run_batch(base, &token).await;
            });
    }

    /// Runs a batch for the current base right away, bypassing the debounce.
    pub async fn refresh(&self) -> BatchReport {
        let base = self.base();
        self.shared.run_batch(base, &CancelToken::new()).await
    }

    /// Recomputes the view from the current input and cache.
    pub async fn conversions(&self) -> Vec<Conversion> {
        let rates = self.shared.cache.snapshot().await;
        let input = self.shared.input();
        project(&input.amount, input.base, &rates)
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.shared.updates.subscribe()
    }

    /// True while a debounced batch is waiting or running.
    pub fn is_pending(&self) -> bool {
        self.debouncer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_pending()
    }

    pub fn shutdown(&self) {
        debug!("Shutting down converter session");
        self.debouncer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::Pair;
    use crate::core::rates::Rate;
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;

    struct SlowProvider {
        latency: Duration,
        calls: Mutex<Vec<Pair>>,
    }

    impl SlowProvider {
        fn new(latency: Duration) -> Arc<Self> {
            Arc::new(Self {
                latency,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Pair> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CurrencyRateProvider for SlowProvider {
        async fn get_rate(&self, pair: &Pair) -> Result<f64> {
            self.calls.lock().unwrap().push(*pair);
            tokio::time::sleep(self.latency).await;
            match pair.target {
                Currency::Eur => Ok(0.92),
                Currency::Ada => Err(anyhow!("no market")),
                _ => Ok(1.5),
            }
        }
    }

    fn session(provider: Arc<SlowProvider>) -> ConverterSession {
        ConverterSession::new(provider, SessionOptions::default())
    }

    fn amount_for(snapshot: &Snapshot, currency: Currency) -> String {
        snapshot
            .conversions
            .iter()
            .find(|c| c.currency == currency)
            .map(|c| c.amount.clone())
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_base_changes_fetch_final_base_once() {
        let provider = SlowProvider::new(Duration::from_millis(5));
        let session = session(provider.clone());

        for base in [Currency::Eur, Currency::Gbp, Currency::Jpy] {
            session.set_base(base).await;
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_secs(1)).await;

        let calls = provider.calls();
        assert_eq!(calls.len(), 9);
        assert!(calls.iter().all(|p| p.base == Currency::Jpy));
    }

    #[tokio::test(start_paused = true)]
    async fn test_amount_typing_triggers_one_batch() {
        let provider = SlowProvider::new(Duration::from_millis(5));
        let session = session(provider.clone());
        let rx = session.subscribe();

        for amount in ["2", "2.", "2.5", "2.50"] {
            session.set_amount(amount).await;
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(provider.calls().is_empty());
        assert!(session.is_pending());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(provider.calls().len(), 9);

        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.amount, "2.50");
        assert_eq!(amount_for(&snapshot, Currency::Eur), "2.3000");
        let report = snapshot.last_batch.unwrap();
        assert_eq!(report.failed, 1);
        assert!(snapshot.refreshed_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_amount_change_recomputes_from_cache_immediately() {
        let provider = SlowProvider::new(Duration::ZERO);
        let session = session(provider.clone());
        session.refresh().await;
        let rx = session.subscribe();

        session.set_amount("10").await;

        // Published before the debounce window elapses.
        assert_eq!(amount_for(&rx.borrow(), Currency::Eur), "9.2000");
        let conversions = session.conversions().await;
        let eur = conversions
            .iter()
            .find(|c| c.currency == Currency::Eur)
            .unwrap();
        assert_eq!(eur.amount, "9.2000");

        // The debounced batch finds every pair cached except the failed one.
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(provider.calls().len(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_batch_does_not_commit() {
        let provider = SlowProvider::new(Duration::from_secs(2));
        let session = session(provider.clone());

        session.set_base(Currency::Eur).await;
        // EUR batch fires at 300ms and is still in flight at 500ms.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(provider.calls().iter().all(|p| p.base == Currency::Eur));
        session.set_base(Currency::Gbp).await;

        tokio::time::sleep(Duration::from_secs(5)).await;

        let cached = session.cache().snapshot().await;
        assert!(cached.keys().all(|p| p.base == Currency::Gbp));
        assert_eq!(cached.len(), 9);
        assert_eq!(
            cached.get(&Pair::new(Currency::Gbp, Currency::Ada)),
            Some(&Rate::Unavailable)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_amount_change_keeps_in_flight_batch() {
        let provider = SlowProvider::new(Duration::from_secs(2));
        let session = session(provider.clone());
        let rx = session.subscribe();

        session.set_amount("2").await;
        // USD batch fires at 300ms and is still in flight at 500ms.
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(provider.calls().len(), 9);
        session.set_amount("3").await;

        // The first batch lands at 2300ms, the second is still running.
        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(session.cache().snapshot().await.len(), 9);
        let snapshot = rx.borrow().clone();
        assert_eq!(snapshot.amount, "3");
        assert_eq!(amount_for(&snapshot, Currency::Eur), "2.7600");
        assert!(snapshot.last_batch.is_some_and(|report| report.committed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_batch() {
        let provider = SlowProvider::new(Duration::ZERO);
        let session = session(provider.clone());

        session.set_amount("5").await;
        session.shutdown();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(provider.calls().is_empty());
        assert!(!session.is_pending());
    }

    #[tokio::test]
    async fn test_refresh_publishes_snapshot() {
        let provider = SlowProvider::new(Duration::ZERO);
        let session = ConverterSession::new(
            provider,
            SessionOptions {
                amount: "2".to_string(),
                ..Default::default()
            },
        );
        let mut rx = session.subscribe();

        let report = session.refresh().await;

        assert!(report.committed);
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(amount_for(&snapshot, Currency::Gbp), "3.0000");
        assert_eq!(amount_for(&snapshot, Currency::Ada), "0.0000");
    }
}
