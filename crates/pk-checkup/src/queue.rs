//! The deduplicating FIFO shared between the tick and the checkup worker.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::trace;

use pk_core::ParkedVehicleId;

#[cfg(feature = "fx-hash")]
type IdSet = rustc_hash::FxHashSet<ParkedVehicleId>;
#[cfg(not(feature = "fx-hash"))]
type IdSet = std::collections::HashSet<ParkedVehicleId>;

#[derive(Default)]
struct Pending {
    order:  VecDeque<ParkedVehicleId>,
    queued: IdSet,
}

#[derive(Default)]
struct Shared {
    pending: Mutex<Pending>,
    depth:   AtomicUsize,
}

/// Parked vehicles waiting for a checkup.
///
/// An id is in the FIFO at most once: enqueuing an id that is already
/// waiting does nothing.  Cloning gives another handle to the same queue.
///
/// # Thread safety
///
/// One mutex guards the FIFO and its membership set together.  [`depth`]
/// reads an atomic mirror and never takes the lock, so it may lag a
/// concurrent enqueue or pop by one update.
///
/// [`depth`]: Self::depth
#[derive(Clone, Default)]
pub struct DeferredCheckupQueue {
    shared: Arc<Shared>,
}

impl DeferredCheckupQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue every id not already waiting.  Returns how many were added.
    pub fn enqueue<I>(&self, ids: I) -> usize
    where
        I: IntoIterator<Item = ParkedVehicleId>,
    {
        let mut pending = self.lock();
        let mut added = 0;
        for id in ids {
            if pending.queued.insert(id) {
                pending.order.push_back(id);
                added += 1;
            }
        }
        if added > 0 {
            self.shared.depth.fetch_add(added, Ordering::Relaxed);
            trace!(added, depth = pending.order.len(), "parked vehicle checkups queued");
        }
        added
    }

    /// Oldest waiting id.  The lock is released before this returns.
    pub fn pop(&self) -> Option<ParkedVehicleId> {
        let mut pending = self.lock();
        let id = pending.order.pop_front()?;
        pending.queued.remove(&id);
        self.shared.depth.fetch_sub(1, Ordering::Relaxed);
        Some(id)
    }

    /// Number of waiting ids.
    #[inline]
    pub fn depth(&self) -> usize {
        self.shared.depth.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.depth() == 0
    }

    pub fn contains(&self, id: ParkedVehicleId) -> bool {
        self.lock().queued.contains(&id)
    }

    /// Drop everything that is waiting.
    pub fn clear(&self) {
        let mut pending = self.lock();
        let dropped = pending.order.len();
        pending.order.clear();
        pending.queued.clear();
        self.shared.depth.fetch_sub(dropped, Ordering::Relaxed);
    }

    // A panicking handler never holds this lock, and the two fields are
    // updated together, so a poisoned guard is still consistent.
    fn lock(&self) -> MutexGuard<'_, Pending> {
        self.shared.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
