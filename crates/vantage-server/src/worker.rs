//! Background consumer for the create queue.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::state::AppState;

/// Spawns the consumer loop. It wakes on every enqueue notification and at
/// least once per `interval`, then drains the queue. A failed request stays
/// at the head and is retried on the next wake-up.
pub fn spawn_queue_consumer(state: AppState, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = tick.tick() => {}
                _ = state.queue_notify.notified() => {}
            }
            match state.run(|service| service.drain_queue()).await {
                Ok(0) => {}
                Ok(processed) => tracing::info!(processed, "drained create queue"),
                Err(err) => tracing::warn!(error = %err, "queue consumer stopped early, will retry"),
            }
        }
    })
}
