// Rate reducer - Turns absolute counter snapshots into per-second rates
use crate::domain::metrics::{CounterSnapshot, MetricSample, RatePoint};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Selects the snapshot keys that contribute to a tracked metric.
#[derive(Clone)]
pub enum MetricMatcher {
    /// A single key, compared verbatim.
    Exact(String),
    /// Dot-separated template where `*` stands for exactly one segment,
    /// e.g. `db.*.readOps` matches `db.sales.readOps`.
    Pattern(Vec<String>),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl MetricMatcher {
    /// Build a matcher from the server's dotted naming convention. A template
    /// without wildcards becomes an exact match.
    pub fn parse(template: &str) -> Self {
        if template.split('.').any(|segment| segment == "*") {
            MetricMatcher::Pattern(template.split('.').map(str::to_string).collect())
        } else {
            MetricMatcher::Exact(template.to_string())
        }
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            MetricMatcher::Exact(name) => name == key,
            MetricMatcher::Pattern(segments) => {
                let mut parts = key.split('.');
                for segment in segments {
                    match parts.next() {
                        Some(part) if segment == "*" || segment == part => {}
                        _ => return false,
                    }
                }
                parts.next().is_none()
            }
            MetricMatcher::Predicate(predicate) => predicate(key),
        }
    }
}

impl fmt::Debug for MetricMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricMatcher::Exact(name) => f.debug_tuple("Exact").field(name).finish(),
            MetricMatcher::Pattern(segments) => write!(f, "Pattern({})", segments.join(".")),
            MetricMatcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// A tracked metric: the series name shown on the chart and the keys it sums.
#[derive(Debug, Clone)]
pub struct MetricDescriptor {
    pub name: String,
    pub matcher: MetricMatcher,
}

impl MetricDescriptor {
    pub fn new(name: impl Into<String>, matcher: MetricMatcher) -> Self {
        Self {
            name: name.into(),
            matcher,
        }
    }

    /// Sum of every matching key; zero when nothing matches.
    fn aggregate(&self, snapshot: &CounterSnapshot) -> f64 {
        snapshot
            .values
            .iter()
            .filter(|(key, _)| self.matcher.matches(key))
            .map(|(_, value)| *value)
            .sum()
    }
}

/// Keeps the previous aggregate per tracked metric and emits one rate point
/// per descriptor on every call to [`RateReducer::next`].
#[derive(Debug)]
pub struct RateReducer {
    descriptors: Vec<MetricDescriptor>,
    nominal_interval: Duration,
    previous: HashMap<String, MetricSample>,
}

impl RateReducer {
    pub fn new(descriptors: Vec<MetricDescriptor>, nominal_interval: Duration) -> Self {
        Self {
            descriptors,
            nominal_interval,
            previous: HashMap::new(),
        }
    }

    pub fn next(&mut self, current: &CounterSnapshot) -> Vec<RatePoint> {
        let mut points = Vec::with_capacity(self.descriptors.len());

        for descriptor in &self.descriptors {
            let sample = MetricSample::new(
                descriptor.name.clone(),
                current.taken_at,
                descriptor.aggregate(current),
            );

            let rate = match self.previous.get(&descriptor.name) {
                Some(previous) => self.rate_between(previous, &sample),
                None => 0.0,
            };

            tracing::trace!(
                metric = %descriptor.name,
                value = sample.value,
                rate,
                "reduced metric"
            );

            points.push(RatePoint::new(descriptor.name.clone(), sample.timestamp, rate));
            self.previous.insert(descriptor.name.clone(), sample);
        }

        points
    }

    fn rate_between(&self, previous: &MetricSample, current: &MetricSample) -> f64 {
        let elapsed = (current.timestamp - previous.timestamp)
            .to_std()
            .ok()
            .filter(|elapsed| !elapsed.is_zero())
            .unwrap_or(self.nominal_interval);

        let delta = current.value - previous.value;
        if delta < 0.0 {
            tracing::debug!(
                metric = %current.name,
                previous = previous.value,
                current = current.value,
                "counter went backwards, clamping rate to zero"
            );
            return 0.0;
        }

        delta / elapsed.as_secs_f64()
    }
}
