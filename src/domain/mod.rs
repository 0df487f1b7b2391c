// Domain layer - Metric readings and chart-facing models
pub mod chart;
pub mod metrics;
pub mod overview;
