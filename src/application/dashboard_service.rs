// Dashboard service - Mounts views and wires the metrics pipeline per view
use crate::application::chart_feed::ChartFeedAdapter;
use crate::application::poller::{MetricSnapshotFetcher, Notifier, PolledSnapshot};
use crate::application::rate_reducer::RateReducer;
use crate::application::snapshot_source::{FetchError, SnapshotSource};
use crate::domain::chart::FeedMessage;
use crate::domain::overview;
use crate::infrastructure::config::{PollingSettings, ViewConfig};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

const FEED_BUFFER: usize = 100;

#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    #[error("unknown view: {0}")]
    ViewNotFound(String),
}

/// Reducer, window and feed state of one mounted view.
#[derive(Debug)]
pub struct ViewPipeline {
    view_id: String,
    server: Option<String>,
    reducer: RateReducer,
    feed: ChartFeedAdapter,
    loaded: bool,
}

impl ViewPipeline {
    pub fn new(view: &ViewConfig, server: Option<String>, polling: &PollingSettings) -> Self {
        Self {
            view_id: view.id.clone(),
            server,
            reducer: RateReducer::new(view.descriptors(), polling.interval()),
            feed: ChartFeedAdapter::new(view.capacity, view.flow_duration()),
            loaded: false,
        }
    }

    /// Run one tick through the pipeline: a `load` on the first tick, a
    /// `flow` afterwards, and the gauge overview every time.
    pub fn ingest(&mut self, polled: &PolledSnapshot) -> Vec<FeedMessage> {
        let server = self.server.as_deref();
        let counters = polled.snapshot.counters(server, polled.received_at);
        let points = self.reducer.next(&counters);

        let chart = if self.loaded {
            FeedMessage::Flow(self.feed.to_flow_update(&points))
        } else {
            self.feed.append(&points);
            self.loaded = true;
            FeedMessage::Load {
                view: self.view_id.clone(),
                columns: self.feed.to_initial_columns(),
            }
        };

        vec![
            chart,
            FeedMessage::Overview(overview::summarize(&polled.snapshot, server)),
        ]
    }

    /// Forget that the client holds the chart; the next tick sends a full
    /// `load` of the window instead of a `flow`.
    pub fn resync(&mut self) {
        self.loaded = false;
    }

    /// Queue one tick's messages on the feed. A chart frame that does not
    /// fit leaves the client behind the window, so the pipeline resyncs.
    fn publish(&mut self, messages: Vec<FeedMessage>, tx: &mpsc::Sender<FeedMessage>) {
        for message in messages {
            let chart = matches!(message, FeedMessage::Load { .. } | FeedMessage::Flow(_));
            match tx.try_send(message) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) if chart => {
                    tracing::warn!(view = %self.view_id, "feed full, resending the window on the next tick");
                    self.resync();
                }
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(view = %self.view_id, "feed full, dropping overview frame");
                }
                Err(TrySendError::Closed(_)) => return,
            }
        }
    }
}

/// Reports failed ticks to the view's feed.
struct FeedNotifier {
    view_id: String,
    tx: mpsc::Sender<FeedMessage>,
}

impl Notifier for FeedNotifier {
    fn notify(&self, error: &FetchError) {
        tracing::error!(view = %self.view_id, error = %error, "error retrieving metrics");
        let message = FeedMessage::Error {
            message: format!("Error retrieving metrics: {error}"),
        };
        if self.tx.try_send(message).is_err() {
            tracing::debug!(view = %self.view_id, "feed closed or full, dropping error frame");
        }
    }
}

#[derive(Clone)]
pub struct DashboardService {
    source: Arc<dyn SnapshotSource>,
    polling: PollingSettings,
    views: Vec<ViewConfig>,
}

impl DashboardService {
    pub fn new(source: Arc<dyn SnapshotSource>, polling: PollingSettings, views: Vec<ViewConfig>) -> Self {
        Self {
            source,
            polling,
            views,
        }
    }

    pub fn views(&self) -> &[ViewConfig] {
        &self.views
    }

    /// Mount a view and return its feed.
    ///
    /// Each mount owns a private pipeline and poll loop. Dropping the
    /// receiver unmounts the view and cancels polling; under the `stop`
    /// failure policy the feed ends after the first error frame.
    pub fn mount(
        &self,
        view_id: &str,
        server: Option<String>,
    ) -> Result<mpsc::Receiver<FeedMessage>, DashboardError> {
        let view = self
            .views
            .iter()
            .find(|v| v.id == view_id)
            .ok_or_else(|| DashboardError::ViewNotFound(view_id.to_string()))?;

        let server = server.or_else(|| view.server.clone());
        let (tx, rx) = mpsc::channel(FEED_BUFFER);

        let notifier = Arc::new(FeedNotifier {
            view_id: view.id.clone(),
            tx: tx.clone(),
        });
        let fetcher = MetricSnapshotFetcher::new(
            self.source.clone(),
            notifier,
            server.clone(),
            self.polling.failure_policy,
        );

        let mut pipeline = ViewPipeline::new(view, server, &self.polling);
        let feed_tx = tx.clone();
        let handle = fetcher.start(self.polling.interval(), move |polled| {
            let messages = pipeline.ingest(&polled);
            pipeline.publish(messages, &feed_tx);
        });

        tracing::info!(view = %view.id, "view mounted");

        let view_id = view.id.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tx.closed() => tracing::info!(view = %view_id, "view unmounted"),
                _ = handle.stopped() => tracing::info!(view = %view_id, "view polling stopped"),
            }
            if !handle.is_cancelled() {
                handle.cancel();
            }
        });

        Ok(rx)
    }
}
