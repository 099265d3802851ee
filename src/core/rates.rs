//! Batched rate fetching for one base currency.

use super::cache::Cache;
use super::currency::{Currency, CurrencyRateProvider, Pair};
use super::debounce::CancelToken;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A cached unit rate. `Unavailable` records a failed lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rate {
    Quoted(f64),
    Unavailable,
}

impl Rate {
    pub fn value(self) -> Option<f64> {
        match self {
            Rate::Quoted(v) => Some(v),
            Rate::Unavailable => None,
        }
    }
}

pub type RateCache = Cache<Pair, Rate>;

/// Whether a failed lookup stays cached for the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Keep `Unavailable` entries; the pair is never requested again.
    #[serde(alias = "cache-failures")]
    Cache,
    /// Request `Unavailable` pairs again on the next batch.
    #[default]
    #[serde(alias = "retry-failures")]
    Retry,
}

impl FailurePolicy {
    /// Whether an existing entry lets the fetcher skip the network.
    pub fn reuses(self, cached: Option<Rate>) -> bool {
        match (self, cached) {
            (_, None) => false,
            (_, Some(Rate::Quoted(_))) => true,
            (FailurePolicy::Cache, Some(Rate::Unavailable)) => true,
            (FailurePolicy::Retry, Some(Rate::Unavailable)) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub base: Currency,
    pub requested: usize,
    pub skipped: usize,
    pub failed: usize,
    /// False when the batch was superseded and its results discarded.
    pub committed: bool,
}

/// Fetches every pair `base-X` the cache cannot already answer.
///
/// Requests run concurrently and the batch waits for all of them to settle.
/// A failing pair is stored as [`Rate::Unavailable`] without affecting its
/// siblings. Results are merged into `cache` in one write, and only if
/// `token` was not cancelled while the requests were in flight.
pub async fn fetch_rates(
    base: Currency,
    provider: &dyn CurrencyRateProvider,
    cache: &RateCache,
    policy: FailurePolicy,
    token: &CancelToken,
) -> BatchReport {
    let mut to_fetch = Vec::new();
    for target in base.targets() {
        let pair = Pair::new(base, target);
        if policy.reuses(cache.get(&pair).await) {
            debug!(%pair, "Using cached rate");
        } else {
            to_fetch.push(pair);
        }
    }

    let skipped = base.targets().count() - to_fetch.len();
    let requests = to_fetch.iter().map(|pair| async move {
        match provider.get_rate(pair).await {
            Ok(rate) => (*pair, Rate::Quoted(rate)),
            Err(e) => {
                warn!(%pair, error = %e, "Error fetching rate");
                (*pair, Rate::Unavailable)
            }
        }
    });
    let fetched: Vec<(Pair, Rate)> = join_all(requests).await;

    let mut report = BatchReport {
        base,
        requested: fetched.len(),
        skipped,
        failed: fetched
            .iter()
            .filter(|(_, r)| *r == Rate::Unavailable)
            .count(),
        committed: false,
    };

    if token.is_cancelled() {
        debug!(%base, "Batch superseded, discarding results");
        return report;
    }

    cache.extend(fetched).await;
    report.committed = true;
    info!(
        %base,
        requested = report.requested,
        skipped = report.skipped,
        failed = report.failed,
        "Rate batch committed"
    );
    report
}
