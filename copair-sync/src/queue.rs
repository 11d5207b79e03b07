//! Sync trigger queue
//!
//! Every trigger funnels through this queue, which enforces at-most-one
//! sync in flight. Triggers arriving during a sync are appended in FIFO
//! order and run after the current sync completes; a pending trigger of the
//! same kind absorbs the newcomer, so rapid repeats cost one pull.

use std::collections::VecDeque;

/// What caused a sync request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncTrigger {
    /// Periodic timer tick
    Interval,
    /// Connectivity came back, resync immediately
    ConnectivityRestored,
    /// Host window regained focus
    FocusRegained,
    /// Explicit force-sync call
    Manual,
    /// Deferred follow-up after a write-through operation
    WriteFollowUp,
}

/// Outcome of asking the queue for a sync slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Admission {
    /// No sync in flight: the caller owns the slot and must drain
    RunNow,
    /// A sync is in flight: appended to the queue
    Queued,
    /// A pending trigger of the same kind already covers this request
    Coalesced,
}

#[derive(Debug, Default)]
pub(crate) struct TriggerQueue {
    pending: VecDeque<SyncTrigger>,
    in_flight: bool,
}

impl TriggerQueue {
    /// Claim the sync slot, or queue behind the current holder.
    pub fn admit(&mut self, trigger: SyncTrigger) -> Admission {
        if !self.in_flight {
            self.in_flight = true;
            return Admission::RunNow;
        }
        if self.pending.contains(&trigger) {
            return Admission::Coalesced;
        }
        self.pending.push_back(trigger);
        Admission::Queued
    }

    /// Enqueue without claiming the slot. The entry is picked up by the
    /// in-flight drain, or by the next admitted trigger. Returns false when
    /// an equal pending trigger already covers it.
    pub fn defer(&mut self, trigger: SyncTrigger) -> bool {
        if self.pending.contains(&trigger) {
            return false;
        }
        self.pending.push_back(trigger);
        true
    }

    /// Called by the slot holder after a sync finishes. Hands back the next
    /// pending trigger, or releases the slot when the queue is empty.
    pub fn complete(&mut self) -> Option<SyncTrigger> {
        debug_assert!(self.in_flight);
        match self.pending.pop_front() {
            Some(trigger) => Some(trigger),
            None => {
                self.in_flight = false;
                None
            }
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
