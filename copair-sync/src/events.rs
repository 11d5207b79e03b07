//! Event surface of the coordinator
//!
//! The coordinator emits exactly one outward signal (sync completed) and
//! reacts to host signals delivered on an injected broadcast channel, so
//! the core depends only on the channel, never on a specific event system.

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::queue::SyncTrigger;

/// Outward notification from the coordinator
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// A sync run finished, successfully or not
    Completed {
        trigger: SyncTrigger,
        success: bool,
        at: DateTime<Utc>,
    },
}

/// Signal from the host environment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostSignal {
    /// The host detected a connectivity change
    ConnectivityChanged { online: bool },
    /// The host window regained focus
    FocusRegained,
}

/// Create the host signal channel the environment publishes into
pub fn host_signal_channel(capacity: usize) -> (broadcast::Sender<HostSignal>, broadcast::Receiver<HostSignal>) {
    broadcast::channel(capacity)
}
