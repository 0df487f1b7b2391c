// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod feed_stream;
pub mod http_snapshot_source;
