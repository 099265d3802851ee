//! Delayed job scheduling where each new request supersedes the pending one.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default quiet period before a scheduled job runs.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(300);

/// Cooperative cancellation flag handed to a scheduled job.
///
/// A job checks it before committing results; cancelling never aborts work
/// that is already running.
#[derive(Clone, Debug)]
pub struct CancelToken {
    state: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn cancel(&self) {
        self.state.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.state.borrow()
    }

    /// Resolves once `cancel` has been called on any clone of this token.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

struct Pending<K> {
    key: K,
    token: CancelToken,
    started: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl<K> Pending<K> {
    fn is_live(&self) -> bool {
        !self.handle.is_finished() && !self.token.is_cancelled()
    }
}

/// Runs the most recently scheduled job once it has gone a full delay
/// without being superseded.
///
/// Jobs carry a key. A job whose timer is still running is always
/// superseded; a job that already started keeps going unless the new key
/// differs from its own.
pub struct Debouncer<K> {
    delay: Duration,
    pending: Vec<Pending<K>>,
}

impl<K> Debouncer<K> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Vec::new(),
        }
    }

    /// Cancels every scheduled or running job.
    pub fn cancel(&mut self) {
        for pending in self.pending.drain(..) {
            pending.token.cancel();
        }
    }

    /// True while a scheduled job has not finished or been cancelled.
    pub fn is_pending(&self) -> bool {
        self.pending.iter().any(Pending::is_live)
    }
}

impl<K: PartialEq> Debouncer<K> {
    /// Restarts the delay for `job`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F, Fut>(&mut self, key: K, job: F)
    where
        F: FnOnce(CancelToken) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        for pending in &self.pending {
            if !pending.started.load(Ordering::Acquire) || pending.key != key {
                pending.token.cancel();
            }
        }
        self.pending.retain(Pending::is_live);

        let token = CancelToken::new();
        let job_token = token.clone();
        let started = Arc::new(AtomicBool::new(false));
        let job_started = Arc::clone(&started);
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = job_token.cancelled() => {
                    debug!("Debounced job superseded before firing");
                }
                _ = tokio::time::sleep(delay) => {
                    debug!(?delay, "Debounce window elapsed, running job");
                    job_started.store(true, Ordering::Release);
                    job(job_token).await;
                }
            }
        });

        self.pending.push(Pending {
            key,
            token,
            started,
            handle,
        });
    }
}

impl<K> Drop for Debouncer<K> {
    fn drop(&mut self) {
        self.cancel();
    }
}
