// src/engine/ticker.rs

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::engine::{RuntimeEvent, TriggerReason};

/// Emit a [`RuntimeEvent::Tick`] every `interval`.
///
/// With `run_on_startup` the first tick fires immediately with
/// [`TriggerReason::Startup`]; otherwise the first tick is one interval
/// away. Ticks missed while the runtime was busy are skipped, not replayed.
pub fn spawn_ticker(
    interval: Duration,
    run_on_startup: bool,
    tx: mpsc::Sender<RuntimeEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(?interval, run_on_startup, "scheduler ticker started");

        if run_on_startup
            && tx
                .send(RuntimeEvent::Tick {
                    reason: TriggerReason::Startup,
                })
                .await
                .is_err()
        {
            return;
        }

        let mut ticker = time::interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            debug!("interval elapsed");
            if tx
                .send(RuntimeEvent::Tick {
                    reason: TriggerReason::Interval,
                })
                .await
                .is_err()
            {
                debug!("runtime channel closed; stopping ticker");
                break;
            }
        }
    })
}
