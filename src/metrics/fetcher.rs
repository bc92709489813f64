//! Throttled fetcher: owns the single iLO session of a device and
//! re-establishes it at most once per minimum interval.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, error, info, trace};

use crate::ilo::{ConnectionDescriptor, Connector, IloError, Session};

/// Minimum time between two connection attempts against the same iLO
pub const DEFAULT_MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// What a call to [`ThrottledFetcher::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    /// Inside the throttle window, nothing was attempted
    Throttled,
    /// A new session replaced the cached one
    Connected,
    /// The attempt failed; the cached session (if any) was kept
    Failed,
}

pub struct ThrottledFetcher {
    connector: Arc<dyn Connector>,
    target: ConnectionDescriptor,
    min_interval: Duration,
    /// Time of the last attempt. Held across the whole attempt so that
    /// concurrent callers queue behind it and then see the window.
    last_attempt: Mutex<Option<Instant>>,
    session: RwLock<Option<Arc<dyn Session>>>,
    generation: AtomicU64,
}

impl ThrottledFetcher {
    pub fn new(
        connector: Arc<dyn Connector>,
        target: ConnectionDescriptor,
        min_interval: Duration,
    ) -> Self {
        Self {
            connector,
            target,
            min_interval,
            last_attempt: Mutex::new(None),
            session: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    pub async fn refresh(&self) -> Result<RefreshStatus, IloError> {
        let mut last_attempt = self.last_attempt.lock().await;
        let now = Instant::now();

        if let Some(previous) = *last_attempt {
            let elapsed = now.duration_since(previous);
            if elapsed < self.min_interval {
                trace!(
                    "iLO {} refreshed {:.0}s ago, next attempt in {:.0}s",
                    self.target.host,
                    elapsed.as_secs_f64(),
                    (self.min_interval - elapsed).as_secs_f64()
                );
                return Ok(RefreshStatus::Throttled);
            }
        }

        // Failures count against the window too
        *last_attempt = Some(now);

        debug!("Connecting to iLO {}", self.target);
        match self.connector.connect(&self.target).await {
            Ok(session) => {
                let generation = {
                    let mut current = self.session.write().await;
                    *current = Some(session);
                    // bumped under the write guard so readers see handle and generation together
                    self.generation.fetch_add(1, Ordering::SeqCst) + 1
                };
                info!("Connected to iLO {} (session #{})", self.target.host, generation);
                Ok(RefreshStatus::Connected)
            }
            Err(e) if e.is_recoverable() => {
                error!("Unable to fetch data from iLO {}: {}", self.target.host, e);
                Ok(RefreshStatus::Failed)
            }
            Err(e) => Err(e),
        }
    }

    /// The cached session, `None` until the first successful connect.
    pub async fn session(&self) -> Option<Arc<dyn Session>> {
        self.session.read().await.clone()
    }

    /// The cached session together with the generation it was established as.
    pub async fn current(&self) -> (Option<Arc<dyn Session>>, u64) {
        let session = self.session.read().await;
        (session.clone(), self.generation.load(Ordering::SeqCst))
    }

    /// Time of the last connection attempt, successful or not.
    pub async fn last_refresh(&self) -> Option<Instant> {
        *self.last_attempt.lock().await
    }

    /// Number of sessions established so far.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn target(&self) -> &ConnectionDescriptor {
        &self.target
    }
}
