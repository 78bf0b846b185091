use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::storage::FileStore;

/// Run the expiry sweep every `period` until `token` is cancelled.
///
/// The first sweep happens one full period after spawning.
pub fn spawn_expiry_sweeper(
    store: Arc<FileStore>,
    period: Duration,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!("Expiry sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = store.delete_expired().await {
                        tracing::error!("Error cleaning up expired files: {}", e);
                    }
                }
            }
        }
    })
}
