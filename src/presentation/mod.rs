// Presentation layer - HTTP surface for dashboard feeds
pub mod app_state;
pub mod handlers;
