use crate::application::poller::FailurePolicy;
use crate::application::rate_reducer::{MetricDescriptor, MetricMatcher};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    #[serde(default)]
    pub polling: PollingSettings,
    #[serde(default)]
    pub listen: ListenSettings,
    #[serde(default)]
    pub views: Vec<ViewConfig>,
}

/// The database server whose stats endpoint is polled.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    /// API root, e.g. `http://localhost:2480/api`.
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingSettings {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl PollingSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListenSettings {
    #[serde(default = "default_addr")]
    pub addr: String,
}

impl Default for ListenSettings {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

/// A dashboard chart: its window size, animation and tracked metrics.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ViewConfig {
    pub id: String,
    pub title: String,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_flow_duration_ms")]
    pub flow_duration_ms: u64,
    /// Restrict the view to one cluster member.
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub metrics: Vec<MetricConfig>,
}

impl ViewConfig {
    pub fn flow_duration(&self) -> Duration {
        Duration::from_millis(self.flow_duration_ms)
    }

    pub fn descriptors(&self) -> Vec<MetricDescriptor> {
        self.metrics
            .iter()
            .map(|m| MetricDescriptor::new(m.name.clone(), m.matcher()))
            .collect()
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MetricConfig {
    pub name: String,
    /// Dotted key or template, `*` matching one segment (`db.*.readOps`).
    pub pattern: String,
    /// When set, `pattern` is read as a plain prefix and every key with that
    /// prefix and this suffix is summed (`db.` + `Record`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
}

impl MetricConfig {
    fn matcher(&self) -> MetricMatcher {
        match &self.suffix {
            Some(suffix) => {
                let (prefix, suffix) = (self.pattern.clone(), suffix.clone());
                MetricMatcher::Predicate(Arc::new(move |key: &str| {
                    key.starts_with(&prefix) && key.ends_with(&suffix)
                }))
            }
            None => MetricMatcher::parse(&self.pattern),
        }
    }
}

fn default_request_timeout_ms() -> u64 {
    4000
}

fn default_interval_ms() -> u64 {
    5000
}

fn default_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_capacity() -> usize {
    20
}

fn default_flow_duration_ms() -> u64 {
    500
}

/// Load `config/studio.*`, overridable through `STUDIO__SECTION__KEY`
/// environment variables.
pub fn load_settings() -> anyhow::Result<Settings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/studio"))
        .add_source(config::Environment::with_prefix("STUDIO").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Settings {
        config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = parse(
            r#"
            [server]
            base_url = "http://localhost:2480/api"
            "#,
        );

        assert_eq!(settings.polling.interval(), Duration::from_secs(5));
        assert_eq!(settings.polling.failure_policy, FailurePolicy::Stop);
        assert_eq!(settings.server.request_timeout(), Duration::from_secs(4));
        assert_eq!(settings.listen.addr, "0.0.0.0:8080");
        assert!(settings.views.is_empty());
    }

    #[test]
    fn test_views() {
        let settings = parse(
            r#"
            [server]
            base_url = "http://localhost:2480/api"

            [polling]
            interval_ms = 2000
            failure_policy = "continue"

            [[views]]
            id = "crud"
            title = "CRUD operations"
            capacity = 60

            [[views.metrics]]
            name = "reads"
            pattern = "db.*.readOps"

            [[views.metrics]]
            name = "connections"
            pattern = "server.connections.actives"

            [[views.metrics]]
            name = "records"
            pattern = "db."
            suffix = "Record"
            "#,
        );

        assert_eq!(settings.polling.interval(), Duration::from_secs(2));
        assert_eq!(settings.polling.failure_policy, FailurePolicy::Continue);

        let view = &settings.views[0];
        assert_eq!(view.capacity, 60);
        assert_eq!(view.flow_duration(), Duration::from_millis(500));
        assert!(view.server.is_none());

        let descriptors = view.descriptors();
        assert_eq!(descriptors.len(), 3);
        assert!(descriptors[0].matcher.matches("db.sales.readOps"));
        assert!(descriptors[1].matcher.matches("server.connections.actives"));
        assert!(descriptors[2].matcher.matches("db.sales.createRecord"));
        assert!(descriptors[2].matcher.matches("db.hr.deleteRecord"));
        assert!(!descriptors[2].matcher.matches("db.hr.readOps"));
    }
}
