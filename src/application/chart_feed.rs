// Chart feed - Full loads versus incremental flow updates
use crate::application::rolling_window::RollingWindowBuffer;
use crate::domain::chart::{ChartColumn, FlowUpdate, X_COLUMN};
use crate::domain::metrics::RatePoint;
use std::time::Duration;

/// Translates window state into what a c3-style widget expects: one `load`
/// with the whole window when the chart is created, then one `flow` per tick
/// carrying only the new values. Reloading on every tick makes the widget
/// flicker or duplicate points.
#[derive(Debug, Clone)]
pub struct ChartFeedAdapter {
    buffer: RollingWindowBuffer,
    flow_duration: Duration,
}

impl ChartFeedAdapter {
    pub fn new(capacity: usize, flow_duration: Duration) -> Self {
        Self {
            buffer: RollingWindowBuffer::new(capacity),
            flow_duration,
        }
    }

    /// Record points without producing an update, e.g. before the chart exists.
    pub fn append(&mut self, points: &[RatePoint]) {
        for point in points {
            self.buffer.append(&point.name, point.clone());
        }
    }

    pub fn to_initial_columns(&self) -> Vec<ChartColumn> {
        let x = self
            .buffer
            .timestamps()
            .into_iter()
            .map(|t| t.timestamp_millis() as f64)
            .collect();

        let mut columns = vec![ChartColumn::new(X_COLUMN, x)];
        columns.extend(self.buffer.to_columns());
        columns
    }

    /// Append one tick worth of points and describe the change.
    ///
    /// `drop_count` is 1 when the window was already full before this tick,
    /// so the widget shifts its head by the same amount the buffer evicted.
    pub fn to_flow_update(&mut self, points: &[RatePoint]) -> FlowUpdate {
        let drop_count = match points.first() {
            Some(first) if self.buffer.is_full(&first.name) => 1,
            _ => 0,
        };

        let mut columns = Vec::with_capacity(points.len() + 1);
        if let Some(first) = points.first() {
            columns.push(ChartColumn::new(
                X_COLUMN,
                vec![first.timestamp.timestamp_millis() as f64],
            ));
        }
        columns.extend(
            points
                .iter()
                .map(|p| ChartColumn::new(p.name.clone(), vec![p.rate])),
        );

        self.append(points);

        FlowUpdate {
            columns,
            drop_count,
            duration: self.flow_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn tick(secs: i64, reads: f64, writes: f64) -> Vec<RatePoint> {
        let ts = DateTime::from_timestamp(secs, 0).unwrap();
        vec![
            RatePoint::new("reads".to_string(), ts, reads),
            RatePoint::new("writes".to_string(), ts, writes),
        ]
    }

    #[test]
    fn test_initial_columns_are_idempotent() {
        let mut feed = ChartFeedAdapter::new(5, Duration::from_millis(500));
        feed.append(&tick(1, 1.0, 2.0));
        feed.append(&tick(2, 3.0, 4.0));

        let first = feed.to_initial_columns();
        let second = feed.to_initial_columns();
        assert_eq!(first, second);
        assert_eq!(
            first,
            vec![
                ChartColumn::new(X_COLUMN, vec![1000.0, 2000.0]),
                ChartColumn::new("reads", vec![1.0, 3.0]),
                ChartColumn::new("writes", vec![2.0, 4.0]),
            ]
        );
    }

    #[test]
    fn test_initial_columns_of_empty_feed() {
        let feed = ChartFeedAdapter::new(5, Duration::from_millis(500));
        assert_eq!(feed.to_initial_columns(), vec![ChartColumn::new(X_COLUMN, vec![])]);
    }

    #[test]
    fn test_flow_drops_once_window_is_full() {
        let mut feed = ChartFeedAdapter::new(3, Duration::from_millis(250));

        let drops: Vec<usize> = (0..6)
            .map(|i| feed.to_flow_update(&tick(i, i as f64, 0.0)).drop_count)
            .collect();

        assert_eq!(drops, vec![0, 0, 0, 1, 1, 1]);
        assert_eq!(feed.buffer.len("reads"), 3);
    }

    #[test]
    fn test_flow_carries_only_new_values() {
        let mut feed = ChartFeedAdapter::new(3, Duration::from_millis(250));
        feed.append(&tick(1, 1.0, 1.0));

        let update = feed.to_flow_update(&tick(2, 5.0, 6.0));
        assert_eq!(update.duration, Duration::from_millis(250));
        assert_eq!(
            update.columns,
            vec![
                ChartColumn::new(X_COLUMN, vec![2000.0]),
                ChartColumn::new("reads", vec![5.0]),
                ChartColumn::new("writes", vec![6.0]),
            ]
        );
        assert_eq!(feed.buffer.len("writes"), 2);
    }

    #[test]
    fn test_empty_tick() {
        let mut feed = ChartFeedAdapter::new(3, Duration::from_millis(250));
        let update = feed.to_flow_update(&[]);
        assert!(update.columns.is_empty());
        assert_eq!(update.drop_count, 0);
    }
}
