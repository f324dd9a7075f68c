use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::engine::AdaptiveEngine;

const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Periodically evicts abandoned exposure sets and atom records until a
/// shutdown signal arrives (or every sender is dropped).
pub fn spawn_idle_sweep(
    engine: Arc<AdaptiveEngine>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval.max(MIN_SWEEP_INTERVAL));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    debug!("idle sweep worker stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let (sessions, atoms) = engine.evict_idle();
                    if sessions > 0 || atoms > 0 {
                        info!(sessions, atoms, "evicted idle session state");
                    } else {
                        debug!("idle sweep found nothing to evict");
                    }
                }
            }
        }
    })
}
