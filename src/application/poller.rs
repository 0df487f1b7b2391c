// Snapshot fetcher - Cancellable fixed-interval polling of the stats endpoint
use crate::application::snapshot_source::{FetchError, SnapshotSource};
use crate::domain::metrics::ClusterSnapshot;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// What to do after a tick's fetch fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Report once and stop polling; the view has to be mounted again.
    #[default]
    Stop,
    /// Report and try again on the next tick.
    Continue,
}

/// Surface that failed ticks are reported to.
pub trait Notifier: Send + Sync {
    fn notify(&self, error: &FetchError);
}

/// A parsed metrics document and the moment it arrived.
#[derive(Debug, Clone)]
pub struct PolledSnapshot {
    pub snapshot: ClusterSnapshot,
    pub received_at: DateTime<Utc>,
}

type SnapshotCallback = Box<dyn FnMut(PolledSnapshot) + Send>;

/// Wall clock anchored to the runtime's monotonic clock, so consecutive
/// ticks are spaced exactly by the elapsed runtime time.
#[derive(Debug, Clone, Copy)]
struct PollClock {
    wall: DateTime<Utc>,
    origin: Instant,
}

impl PollClock {
    fn start() -> Self {
        Self {
            wall: Utc::now(),
            origin: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.wall + TimeDelta::from_std(self.origin.elapsed()).unwrap_or_default()
    }
}

struct PollShared {
    callback: Mutex<Option<SnapshotCallback>>,
    stopped: watch::Sender<bool>,
    clock: PollClock,
}

impl PollShared {
    fn lock(&self) -> MutexGuard<'_, Option<SnapshotCallback>> {
        self.callback.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn stop(&self, callback: &mut Option<SnapshotCallback>) {
        *callback = None;
        self.stopped.send_replace(true);
    }
}

/// Handle to a running poll loop. Dropping it cancels the loop.
pub struct PollHandle {
    shared: Arc<PollShared>,
    ticker: JoinHandle<()>,
}

impl PollHandle {
    /// Stop polling. Once this returns the snapshot callback has been
    /// dropped, so no further snapshot can be delivered, even from a fetch
    /// that is still in flight.
    pub fn cancel(&self) {
        let mut callback = self.shared.lock();
        self.shared.stop(&mut callback);
        drop(callback);
        self.ticker.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        *self.shared.stopped.borrow()
    }

    /// Resolves once polling has stopped, either through [`PollHandle::cancel`]
    /// or because a fetch failed under [`FailurePolicy::Stop`].
    pub async fn stopped(&self) {
        let mut rx = self.shared.stopped.subscribe();
        let _ = rx.wait_for(|stopped| *stopped).await;
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Polls a [`SnapshotSource`] on a fixed interval.
///
/// Every tick spawns its own fetch, so a slow server can have several
/// requests in flight at once; deliveries then follow completion order.
#[derive(Clone)]
pub struct MetricSnapshotFetcher {
    source: Arc<dyn SnapshotSource>,
    notifier: Arc<dyn Notifier>,
    server: Option<String>,
    policy: FailurePolicy,
}

impl MetricSnapshotFetcher {
    pub fn new(
        source: Arc<dyn SnapshotSource>,
        notifier: Arc<dyn Notifier>,
        server: Option<String>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            source,
            notifier,
            server,
            policy,
        }
    }

    /// Start polling. The first fetch is issued immediately.
    pub fn start<F>(&self, interval: Duration, on_snapshot: F) -> PollHandle
    where
        F: FnMut(PolledSnapshot) + Send + 'static,
    {
        let (stopped, _) = watch::channel(false);
        let shared = Arc::new(PollShared {
            callback: Mutex::new(Some(Box::new(on_snapshot))),
            stopped,
            clock: PollClock::start(),
        });

        tracing::debug!(
            server = self.server.as_deref().unwrap_or("<cluster>"),
            interval_ms = interval.as_millis() as u64,
            "starting metrics polling"
        );

        let fetcher = self.clone();
        let loop_shared = shared.clone();
        let ticker = tokio::spawn(async move {
            let mut stopped = loop_shared.stopped.subscribe();
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    _ = stopped.wait_for(|stopped| *stopped) => break,
                }

                let fetcher = fetcher.clone();
                let shared = loop_shared.clone();
                tokio::spawn(async move { fetcher.poll_once(&shared).await });
            }

            tracing::debug!("metrics polling stopped");
        });

        PollHandle { shared, ticker }
    }

    async fn poll_once(&self, shared: &PollShared) {
        let result = self.source.fetch(self.server.as_deref()).await;
        let received_at = shared.clock.now();

        let mut callback = shared.lock();
        let Some(on_snapshot) = callback.as_mut() else {
            tracing::trace!("discarding snapshot delivered after cancellation");
            return;
        };

        match result {
            Ok(snapshot) => on_snapshot(PolledSnapshot {
                snapshot,
                received_at,
            }),
            Err(e) => {
                tracing::warn!(
                    server = self.server.as_deref().unwrap_or("<cluster>"),
                    error = %e,
                    "error retrieving metrics"
                );
                self.notifier.notify(&e);
                if self.policy == FailurePolicy::Stop {
                    shared.stop(&mut callback);
                }
            }
        }
    }
}
