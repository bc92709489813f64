//! Poll loop: one metric view per registry entry, all sharing the device's
//! fetcher, refreshed every scan interval.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::{Mutex, RwLock};
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::metrics::{
    MetricReading, MetricView, RefreshOutcome, StaleReason, ThrottledFetcher, METRIC_REGISTRY,
};

/// Counts of one poll cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub updated: usize,
    pub stale: usize,
    pub failed: usize,
}

pub struct Poller {
    views: Mutex<Vec<MetricView>>,
    running: Arc<RwLock<bool>>,
    scan_interval: Duration,
    snapshot_file: Option<PathBuf>,
}

impl Poller {
    pub fn new(fetcher: Arc<ThrottledFetcher>, device_name: &str, scan_interval: Duration) -> Self {
        debug!(
            "{} metric views share one iLO session, reconnecting at most every {:.0}s",
            METRIC_REGISTRY.len(),
            fetcher.min_interval().as_secs_f64()
        );
        let views = METRIC_REGISTRY
            .iter()
            .map(|entry| MetricView::new(entry, device_name, Arc::clone(&fetcher)))
            .collect();

        Self {
            views: Mutex::new(views),
            running: Arc::new(RwLock::new(false)),
            scan_interval,
            snapshot_file: None,
        }
    }

    pub fn with_snapshot_file(mut self, path: Option<PathBuf>) -> Self {
        self.snapshot_file = path;
        self
    }

    /// Refresh every view once, in registry order.
    pub async fn poll_once(&self) -> PollSummary {
        let mut summary = PollSummary::default();
        let mut views = self.views.lock().await;

        for view in views.iter_mut() {
            match view.refresh().await {
                Ok(RefreshOutcome::Updated) => summary.updated += 1,
                Ok(RefreshOutcome::Stale(StaleReason::NoSession)) => summary.stale += 1,
                Ok(RefreshOutcome::Stale(StaleReason::Remote(_))) => summary.stale += 1,
                Err(e) => {
                    error!("{} ({}): update failed: {}", view.label(), view.entry().accessor, e);
                    summary.failed += 1;
                }
            }
        }

        summary
    }

    /// Current (label, value, attributes) of every view.
    pub async fn readings(&self) -> Vec<MetricReading> {
        self.views.lock().await.iter().map(MetricView::reading).collect()
    }

    async fn write_snapshot(&self, readings: &[MetricReading]) -> Result<()> {
        let Some(path) = &self.snapshot_file else {
            return Ok(());
        };
        let json = serde_json::to_string_pretty(readings)?;
        tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write snapshot {:?}", path))?;
        debug!("Saved metric snapshot to {:?}", path);
        Ok(())
    }

    pub async fn run(&self) -> Result<()> {
        *self.running.write().await = true;
        info!(
            "Polling {} metrics every {:.0}s",
            METRIC_REGISTRY.len(),
            self.scan_interval.as_secs_f64()
        );

        let mut ticker = time::interval(self.scan_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            if !*self.running.read().await {
                break;
            }

            let summary = self.poll_once().await;
            let readings = self.readings().await;

            if summary.failed > 0 || summary.stale > 0 {
                warn!(
                    "Poll cycle: {} updated, {} stale, {} failed",
                    summary.updated, summary.stale, summary.failed
                );
            } else {
                info!("Poll cycle: {} metrics updated", summary.updated);
            }
            for reading in &readings {
                if let Some(value) = &reading.value {
                    debug!("  {} = {}", reading.label, value);
                }
            }

            if let Err(e) = self.write_snapshot(&readings).await {
                warn!("{:#}", e);
            }
        }

        info!("Poller stopped");
        Ok(())
    }

    pub async fn stop(&self) {
        *self.running.write().await = false;
    }
}
