//! Setup-time connectivity probe.

use tracing::{error, info};

use crate::ilo::{ConnectionDescriptor, Connector};

/// One-shot connection attempt, independent of any fetcher and its throttle.
/// Any error at all counts as "cannot connect".
pub async fn test_connection(connector: &dyn Connector, target: &ConnectionDescriptor) -> bool {
    match connector.connect(target).await {
        Ok(_) => {
            info!("Connection test to HP iLO {} succeeded", target);
            true
        }
        Err(e) => {
            error!("Failed to connect to HP iLO: {}", e);
            false
        }
    }
}
