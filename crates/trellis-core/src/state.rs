//! Queued state updates and the per-tree state handler.

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

static NEXT_UPDATE_SEQ: AtomicU64 = AtomicU64::new(1);

/// A single deferred mutation of one keyed state container.
pub trait StateUpdate: Send + Sync {
    fn apply(&self, state: &mut dyn Any);
}

impl<F> StateUpdate for F
where
    F: Fn(&mut dyn Any) + Send + Sync,
{
    fn apply(&self, state: &mut dyn Any) {
        self(state)
    }
}

#[derive(Clone)]
struct QueuedUpdate {
    seq: u64,
    op: Arc<dyn StateUpdate>,
}

/// Per-tree queue of state updates keyed by state container.
///
/// A computation takes a clone via [`copy_for_layout`](Self::copy_for_layout);
/// once that computation's result is promoted, [`commit`](Self::commit)
/// removes exactly the updates the clone saw. Updates queued while the
/// computation ran keep their place.
#[derive(Clone, Default)]
pub struct StateHandler {
    pending: FxHashMap<String, SmallVec<[QueuedUpdate; 4]>>,
}

impl StateHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one update against the container identified by `key`.
    pub fn queue_update(&mut self, key: impl Into<String>, op: Arc<dyn StateUpdate>) {
        let seq = NEXT_UPDATE_SEQ.fetch_add(1, Ordering::Relaxed);
        self.pending
            .entry(key.into())
            .or_default()
            .push(QueuedUpdate { seq, op });
    }

    #[inline]
    pub fn has_pending_updates(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Snapshot handed to a layout computation.
    pub fn copy_for_layout(&self) -> Self {
        self.clone()
    }

    /// Applies every pending update for `key`, in queue order.
    pub fn apply_to(&self, key: &str, state: &mut dyn Any) {
        if let Some(updates) = self.pending.get(key) {
            for update in updates {
                update.op.apply(state);
            }
        }
    }

    /// Drops the updates that `applied` consumed, keeping anything queued
    /// after the snapshot was taken.
    pub fn commit(&mut self, applied: StateHandler) {
        for (key, seen) in applied.pending {
            let Some(max_seq) = seen.last().map(|u| u.seq) else {
                continue;
            };
            if let Some(queued) = self.pending.get_mut(&key) {
                queued.retain(|u| u.seq > max_seq);
                if queued.is_empty() {
                    self.pending.remove(&key);
                }
            }
        }
    }
}
