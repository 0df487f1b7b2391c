// Application layer - Metrics pipeline and view sessions
pub mod chart_feed;
pub mod dashboard_service;
pub mod poller;
pub mod rate_reducer;
pub mod rolling_window;
pub mod snapshot_source;
