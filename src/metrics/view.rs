//! One published metric: reads its accessor from the shared fetcher's session.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, trace, warn};

use crate::ilo::IloError;
use crate::metrics::fetcher::ThrottledFetcher;
use crate::metrics::registry::MetricEntry;

/// Result of a view refresh that did not hit an agent bug.
#[derive(Debug)]
pub enum RefreshOutcome {
    /// Value replaced with a fresh reading
    Updated,
    /// Previous value retained
    Stale(StaleReason),
}

#[derive(Debug)]
pub enum StaleReason {
    /// No session has ever been established
    NoSession,
    /// The accessor call failed on the iLO side
    Remote(IloError),
}

/// Serializable snapshot of a view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReading {
    pub id: String,
    pub label: String,
    pub value: Option<Value>,
    pub attributes: Option<Map<String, Value>>,
}

pub struct MetricView {
    entry: &'static MetricEntry,
    label: String,
    fetcher: Arc<ThrottledFetcher>,
    value: Option<Value>,
    attributes: Option<Map<String, Value>>,
}

impl MetricView {
    pub fn new(entry: &'static MetricEntry, device_name: &str, fetcher: Arc<ThrottledFetcher>) -> Self {
        Self {
            entry,
            label: format!("{} {}", device_name, entry.display_label),
            fetcher,
            value: None,
            attributes: None,
        }
    }

    /// Refresh the shared session if its window allows, then read this metric.
    /// Unknown accessors and other agent bugs come back as `Err`.
    pub async fn refresh(&mut self) -> Result<RefreshOutcome, IloError> {
        self.fetcher.refresh().await?;

        let (session, generation) = self.fetcher.current().await;
        let Some(session) = session else {
            debug!("{}: no iLO session yet, keeping previous value", self.label);
            return Ok(RefreshOutcome::Stale(StaleReason::NoSession));
        };
        trace!("{}: reading {} on session #{}", self.label, self.entry.accessor, generation);

        match session.invoke(self.entry.accessor).await {
            Ok(value) => {
                self.value = Some(value);
                self.attributes = Some(self.build_attributes());
                Ok(RefreshOutcome::Updated)
            }
            Err(e) if e.is_recoverable() => {
                warn!("{}: reading failed, keeping previous value: {}", self.label, e);
                Ok(RefreshOutcome::Stale(StaleReason::Remote(e)))
            }
            Err(e) => Err(e),
        }
    }

    fn build_attributes(&self) -> Map<String, Value> {
        let mut attributes = Map::new();
        attributes.insert("accessor".into(), Value::from(self.entry.accessor));
        attributes.insert("device".into(), Value::from(self.fetcher.target().host.as_str()));
        attributes.insert("last_updated".into(), Value::from(chrono::Utc::now().to_rfc3339()));
        attributes
    }

    pub fn entry(&self) -> &'static MetricEntry {
        self.entry
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn attributes(&self) -> Option<&Map<String, Value>> {
        self.attributes.as_ref()
    }

    pub fn reading(&self) -> MetricReading {
        MetricReading {
            id: self.entry.metric_id.to_string(),
            label: self.label.clone(),
            value: self.value.clone(),
            attributes: self.attributes.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::fetcher::DEFAULT_MIN_REFRESH_INTERVAL;
    use crate::metrics::registry::{lookup, METRIC_REGISTRY};
    use crate::metrics::testing::{login_failed, target, FakeConnector, Script};
    use serde_json::json;
    use std::time::Duration;

    fn shared_fetcher(connector: Arc<FakeConnector>) -> Arc<ThrottledFetcher> {
        Arc::new(ThrottledFetcher::new(connector, target(), DEFAULT_MIN_REFRESH_INTERVAL))
    }

    #[tokio::test(start_paused = true)]
    async fn test_value_is_stored_verbatim() {
        let health = json!({
            "fans": { "Fan 1": { "reading": 29, "units": "Percent", "health": "OK" } },
            "temperature": "OK",
            "nested": [1, 2.5, null, "x"]
        });
        let connector = Arc::new(FakeConnector::always(vec![("get_embedded_health", health.clone())]));
        let mut view = MetricView::new(lookup("server_health").unwrap(), "HP ILO", shared_fetcher(connector));

        assert!(matches!(view.refresh().await.unwrap(), RefreshOutcome::Updated));
        assert_eq!(view.value(), Some(&health));
        assert_eq!(view.label(), "HP ILO Server Health");

        let attributes = view.attributes().unwrap();
        assert_eq!(attributes["accessor"], json!("get_embedded_health"));
        assert_eq!(attributes["device"], json!("10.0.0.5"));
        assert!(attributes.contains_key("last_updated"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_connected_yields_no_value() {
        let connector = Arc::new(FakeConnector::new(vec![Script::Fail(login_failed())]));
        let mut view = MetricView::new(
            lookup("server_power_status").unwrap(),
            "HP ILO",
            shared_fetcher(connector),
        );

        let outcome = view.refresh().await.unwrap();
        assert!(matches!(outcome, RefreshOutcome::Stale(StaleReason::NoSession)));
        assert!(view.value().is_none());
        assert_eq!(view.reading().value, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_views_share_one_session() {
        let connector = Arc::new(FakeConnector::always(vec![
            ("get_host_power_status", json!("ON")),
            ("get_uid_status", json!("OFF")),
        ]));
        let fetcher = shared_fetcher(connector.clone());
        let mut power = MetricView::new(lookup("server_power_status").unwrap(), "HP ILO", fetcher.clone());
        let mut uid = MetricView::new(lookup("server_uid_status").unwrap(), "HP ILO", fetcher.clone());

        power.refresh().await.unwrap();
        let first = fetcher.session().await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        uid.refresh().await.unwrap();

        assert_eq!(connector.attempts(), 1);
        assert!(Arc::ptr_eq(&first, &fetcher.session().await.unwrap()));
        assert_eq!(power.value(), Some(&json!("ON")));
        assert_eq!(uid.value(), Some(&json!("OFF")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_keeps_previous_value() {
        let connector = Arc::new(FakeConnector::new(vec![
            Script::Succeed(vec![("get_host_power_status", json!("ON"))]),
            Script::Fail(login_failed()),
        ]));
        let mut view = MetricView::new(
            lookup("server_power_status").unwrap(),
            "HP ILO",
            shared_fetcher(connector),
        );
        view.refresh().await.unwrap();

        // Reconnect fails, the old session still answers
        tokio::time::advance(DEFAULT_MIN_REFRESH_INTERVAL).await;
        assert!(matches!(view.refresh().await.unwrap(), RefreshOutcome::Updated));
        assert_eq!(view.value(), Some(&json!("ON")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_accessor_failure_is_stale() {
        let connector = Arc::new(FakeConnector::always(vec![("get_host_power_status", json!("ON"))]));
        let fetcher = shared_fetcher(connector.clone());
        let mut view = MetricView::new(lookup("server_power_status").unwrap(), "HP ILO", fetcher);
        view.refresh().await.unwrap();
        let before = view.reading();

        // Make the live session fail its next call
        let fake = connector.last_session().unwrap();
        *fake.fail_with.lock().unwrap() = Some(IloError::communication("https://10.0.0.5", "reset"));

        let outcome = view.refresh().await.unwrap();
        assert!(matches!(outcome, RefreshOutcome::Stale(StaleReason::Remote(_))));
        assert_eq!(view.reading(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_accessor_propagates() {
        static BOGUS: MetricEntry = MetricEntry {
            metric_id: "bogus",
            display_label: "Bogus",
            accessor: "get_bogus",
        };
        let connector = Arc::new(FakeConnector::always(Vec::new()));
        let fetcher = shared_fetcher(connector);
        let mut view = MetricView::new(&BOGUS, "HP ILO", fetcher.clone());

        assert!(matches!(view.refresh().await, Err(IloError::UnknownAccessor(_))));
        // Shared state is untouched for the other views
        assert!(fetcher.session().await.is_some());
        assert_eq!(fetcher.generation(), 1);
    }

    #[test]
    fn test_one_view_per_registry_entry_labels() {
        let connector = Arc::new(FakeConnector::always(Vec::new()));
        let fetcher = shared_fetcher(connector);
        let labels: Vec<_> = METRIC_REGISTRY
            .iter()
            .map(|e| MetricView::new(e, "Rack 7", fetcher.clone()).label().to_string())
            .collect();
        assert_eq!(labels[0], "Rack 7 Server Name");
        assert_eq!(labels.len(), METRIC_REGISTRY.len());

        let fan = MetricView::new(lookup("server_fan_speed").unwrap(), "Rack 7", fetcher);
        assert!(std::ptr::eq(fan.entry(), lookup("server_fan_speed").unwrap()));
        assert_eq!(fan.entry().accessor, "get_fan_speeds");
    }
}
