// Rolling window - Fixed-capacity history per chart series
use crate::domain::chart::ChartColumn;
use crate::domain::metrics::RatePoint;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Per-series FIFO windows sharing one capacity. Each series evicts
/// independently; series keep the order in which they were first appended.
#[derive(Debug, Clone)]
pub struct RollingWindowBuffer {
    capacity: usize,
    series: Vec<(String, VecDeque<RatePoint>)>,
}

impl RollingWindowBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            series: Vec::new(),
        }
    }

    pub fn append(&mut self, name: &str, point: RatePoint) {
        let idx = match self.series.iter().position(|(n, _)| n == name) {
            Some(idx) => idx,
            None => {
                self.series
                    .push((name.to_string(), VecDeque::with_capacity(self.capacity)));
                self.series.len() - 1
            }
        };

        let window = &mut self.series[idx].1;
        if window.len() >= self.capacity {
            window.pop_front();
        }
        window.push_back(point);
    }

    pub fn len(&self, name: &str) -> usize {
        self.window(name).map(VecDeque::len).unwrap_or(0)
    }

    pub fn is_full(&self, name: &str) -> bool {
        self.len(name) >= self.capacity
    }

    /// Timestamps of the first series; every series advances once per tick,
    /// so this doubles as the shared x axis.
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.series
            .first()
            .map(|(_, window)| window.iter().map(|p| p.timestamp).collect())
            .unwrap_or_default()
    }

    pub fn to_columns(&self) -> Vec<ChartColumn> {
        self.series
            .iter()
            .map(|(name, window)| {
                ChartColumn::new(name.clone(), window.iter().map(|p| p.rate).collect())
            })
            .collect()
    }

    fn window(&self, name: &str) -> Option<&VecDeque<RatePoint>> {
        self.series.iter().find(|(n, _)| n == name).map(|(_, w)| w)
    }
}
