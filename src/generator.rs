use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::hub::{Hub, HubError};

pub const PERIODIC_TITLE: &str = "Periodic Notification";
pub const PERIODIC_MESSAGE: &str = "You'll receive this every 5 seconds";

/// Submit a canned notification every `interval` until `cancel` fires or
/// the hub shuts down.
pub async fn run(hub: Hub, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match hub.submit(PERIODIC_TITLE, PERIODIC_MESSAGE).await {
            Ok(n) => tracing::trace!(id = n.id, "periodic notification submitted"),
            Err(HubError::Busy) => tracing::warn!("periodic notification skipped, hub busy"),
            Err(HubError::Closed) => break,
        }
    }

    tracing::debug!("periodic generator stopped");
}
