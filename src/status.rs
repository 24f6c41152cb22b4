//! The presence-update loop: a periodic report of the local user's
//! current in-game context, sourced from the pluggable provider.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::time::sleep;

use crate::client::ApiClient;

/// Warm-up delay before the first report.
const STATUS_WARMUP: Duration = Duration::from_millis(50);

impl ApiClient {
    /// Runs for the lifetime of one connection: poll the provider, post
    /// when it has something, sleep the configured interval. Exits as soon
    /// as the connection drops, the generation goes stale, or shutdown is
    /// signaled.
    pub(crate) async fn status_update_loop(self: Arc<Self>, generation: u64) {
        tokio::select! {
            _ = sleep(STATUS_WARMUP) => {}
            _ = self.shutdown.notified() => return,
        }
        while self.is_connected().await && generation == self.current_generation() {
            if let Some(request) = self.status_provider.get_status() {
                match self.post(request).await {
                    Ok(response) if response.is_error() => {
                        warn!(
                            target: "api::status",
                            "status update failed: {}",
                            response.error_description()
                        );
                    }
                    Ok(_) => {}
                    Err(e) => warn!(target: "api::status", "status update rejected: {e}"),
                }
            }
            tokio::select! {
                _ = sleep(self.config.status_update_interval()) => {}
                _ = self.shutdown.notified() => {
                    debug!(target: "api::status", "shutdown signaled, leaving status loop");
                    return;
                }
            }
        }
        debug!(target: "api::status", "connection closed, leaving status loop");
    }
}
