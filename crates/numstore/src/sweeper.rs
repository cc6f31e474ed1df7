//! Background expiration sweep
//!
//! Periodically reclaims expired entries. Reads already treat expired entries
//! as absent, so the sweep only bounds memory held by dead entries.

use crate::engine::NumberStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Handle to the sweep task; aborts the task when dropped
pub struct ExpirationSweeper {
    handle: Option<JoinHandle<()>>,
}

impl ExpirationSweeper {
    /// Spawn the sweep on the current tokio runtime
    ///
    /// The first sweep runs one full `interval` after spawning.
    pub fn spawn(store: Arc<NumberStore>, interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        info!("Starting expiration sweeper (interval {:?})", interval);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let removed = store.cleanup_expired();
                if removed > 0 {
                    debug!(removed, remaining = store.len(), "Swept expired entries");
                }
            }
        });

        Self {
            handle: Some(handle),
        }
    }

    /// Stop the sweep task
    pub fn shutdown(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            info!("Expiration sweeper stopped");
        }
    }
}

impl Drop for ExpirationSweeper {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
