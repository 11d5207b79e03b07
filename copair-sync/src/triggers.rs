//! Background trigger loop
//!
//! Multiplexes the periodic sync timer and the host signal channel into the
//! coordinator's single trigger entry point. The host environment publishes
//! connectivity and focus signals; the loop owns no policy of its own.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::coordinator::SyncCoordinator;
use crate::events::HostSignal;
use crate::queue::SyncTrigger;

/// Spawn the trigger loop. The task runs until the host signal channel is
/// closed; the first timer tick fires immediately, giving a startup sync.
pub fn spawn_triggers(
    coordinator: Arc<SyncCoordinator>,
    mut signals: broadcast::Receiver<HostSignal>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(coordinator.config().sync_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    coordinator.enqueue_sync(SyncTrigger::Interval).await;
                }
                signal = signals.recv() => match signal {
                    Ok(HostSignal::ConnectivityChanged { online }) => {
                        coordinator.handle_connectivity(online).await;
                    }
                    Ok(HostSignal::FocusRegained) => {
                        coordinator.handle_focus().await;
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Host signal channel lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
            }
        }
        debug!("Trigger loop stopped");
    })
}
