//! Throttled session fetcher, metric registry and per-metric views.

pub mod fetcher;
pub mod registry;
pub mod validator;
pub mod view;

pub use fetcher::{RefreshStatus, ThrottledFetcher, DEFAULT_MIN_REFRESH_INTERVAL};
pub use registry::{MetricEntry, METRIC_REGISTRY};
pub use validator::test_connection;
pub use view::{MetricReading, MetricView, RefreshOutcome, StaleReason};

/// Label prefix for every metric of a device unless configured otherwise
pub const DEFAULT_DEVICE_NAME: &str = "HP ILO";

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted Connector/Session doubles shared by the metrics tests.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::ilo::{ConnectionDescriptor, Connector, IloError, Session};

    /// Session answering every accessor from a fixed table.
    pub struct FakeSession {
        pub values: Vec<(&'static str, Value)>,
        pub fail_with: Mutex<Option<IloError>>,
    }

    #[async_trait]
    impl Session for FakeSession {
        async fn invoke(&self, accessor: &str) -> Result<Value, IloError> {
            if let Some(err) = self.fail_with.lock().unwrap().take() {
                return Err(err);
            }
            self.values
                .iter()
                .find(|(name, _)| *name == accessor)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| IloError::UnknownAccessor(accessor.to_string()))
        }
    }

    pub enum Script {
        Succeed(Vec<(&'static str, Value)>),
        Fail(IloError),
    }

    /// Connector replaying a script of outcomes; once exhausted every
    /// connect succeeds with the fallback value table.
    pub struct FakeConnector {
        pub attempts: AtomicUsize,
        pub delay: Duration,
        sessions: Mutex<Vec<Arc<FakeSession>>>,
        script: Mutex<VecDeque<Script>>,
        fallback: Vec<(&'static str, Value)>,
    }

    impl FakeConnector {
        pub fn new(script: Vec<Script>) -> Self {
            Self {
                attempts: AtomicUsize::new(0),
                delay: Duration::ZERO,
                sessions: Mutex::new(Vec::new()),
                script: Mutex::new(script.into()),
                fallback: Vec::new(),
            }
        }

        pub fn always(values: Vec<(&'static str, Value)>) -> Self {
            let mut connector = Self::new(Vec::new());
            connector.fallback = values;
            connector
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }

        /// Session established by the `index`-th successful connect.
        pub fn session_at(&self, index: usize) -> Option<Arc<FakeSession>> {
            self.sessions.lock().unwrap().get(index).cloned()
        }

        /// Most recently established session.
        pub fn last_session(&self) -> Option<Arc<FakeSession>> {
            self.sessions.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl Connector for FakeConnector {
        async fn connect(&self, _target: &ConnectionDescriptor) -> Result<Arc<dyn Session>, IloError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let next = self.script.lock().unwrap().pop_front();
            let values = match next {
                Some(Script::Fail(err)) => return Err(err),
                Some(Script::Succeed(values)) => values,
                None => self.fallback.clone(),
            };
            let session = Arc::new(FakeSession {
                values,
                fail_with: Mutex::new(None),
            });
            self.sessions.lock().unwrap().push(Arc::clone(&session));
            Ok(session)
        }
    }

    /// In-memory sink for log lines emitted while a test runs.
    #[derive(Clone, Default)]
    pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Route this thread's tracing events into a buffer until the guard drops.
    pub fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        (buffer, tracing::subscriber::set_default(subscriber))
    }

    pub fn target() -> ConnectionDescriptor {
        ConnectionDescriptor::new("10.0.0.5", 443, "admin", "secret")
    }

    pub fn login_failed() -> IloError {
        IloError::LoginFailed {
            url: "https://10.0.0.5:443/redfish/v1/Systems".to_string(),
            status: 401,
        }
    }
}
