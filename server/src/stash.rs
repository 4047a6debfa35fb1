//! Per-cycle action buffer.
//!
//! Actions arrive from every session's reader task at arbitrary times. The
//! stash keeps the currently open cycle token and the accepted actions
//! behind a single mutex, so the "compare token, append" step of a
//! submission and the "swap token, take batch" step of a tick are each
//! atomic with respect to one another. An action therefore lands in exactly
//! one drained batch or is rejected; it is never duplicated or lost.

use log::debug;
use shared::{CycleId, PlayerAction, ProtocolError};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What happened to a submitted action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    /// Tagged with a cycle that is not the open one; dropped.
    Stale,
}

#[derive(Debug, Default)]
struct Stash {
    open: Option<CycleId>,
    pending: Vec<PlayerAction>,
}

#[derive(Debug, Default)]
pub struct ActionStash {
    inner: Mutex<Stash>,
}

impl ActionStash {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Stash> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Decodes a wire-encoded action and submits it.
    pub fn submit(&self, raw: &str) -> Result<Submission, ProtocolError> {
        let action = PlayerAction::decode(raw)?;
        Ok(self.submit_action(action))
    }

    /// Appends `action` if it is tagged with the open cycle.
    pub fn submit_action(&self, action: PlayerAction) -> Submission {
        let mut stash = self.lock();
        if stash.open.as_ref() != Some(&action.cycle_guid) {
            debug!(
                "Dropping action from {} for closed cycle {}",
                action.player_guid, action.cycle_guid
            );
            return Submission::Stale;
        }

        stash.pending.push(action);
        Submission::Accepted
    }

    /// Switches the accepted token. Pending actions stay where they are.
    pub fn open_cycle(&self, cycle: CycleId) {
        self.lock().open = Some(cycle);
    }

    /// Takes every accepted action, in arrival order, and clears the buffer.
    pub fn drain_all(&self) -> Vec<PlayerAction> {
        std::mem::take(&mut self.lock().pending)
    }

    /// Opens `cycle` and takes the batch accepted under the previous one, in
    /// one step. Used by the tick loop so that nothing tagged with the new
    /// token can slip into the old batch.
    pub fn rotate(&self, cycle: CycleId) -> Vec<PlayerAction> {
        let mut stash = self.lock();
        stash.open = Some(cycle);
        std::mem::take(&mut stash.pending)
    }

    pub fn open(&self) -> Option<CycleId> {
        self.lock().open.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().pending.is_empty()
    }
}
