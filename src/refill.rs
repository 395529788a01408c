use std::sync::Arc;

use tokio::time::{self, Instant, MissedTickBehavior};

use crate::state::Shared;

/// Drive refills for the given pool until it is closed.
///
/// This is the only place tokens are added after construction.
#[cfg_attr(feature = "tracing", tracing::instrument(level = "trace", skip_all))]
pub(crate) async fn run(shared: Arc<Shared>) {
    let now = Instant::now();
    let first = now.checked_add(shared.interval).unwrap_or(now);

    let mut interval = time::interval_at(first, shared.interval);
    // A stalled runtime should not turn into a burst of back to back refills.
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shared.shutdown.notified() => {
                trace!("refill task stopped");
                return;
            }
            _ = interval.tick(), if shared.refill > 0 => {
                shared.refill();
            }
        }
    }
}
