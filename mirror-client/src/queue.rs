//! Change queue shared between the watcher and the session.
//!
//! The watcher appends from its own thread; each dispatch cycle swaps the
//! whole contents out in one step, so an event is either in this cycle's
//! snapshot or the next one, never both and never lost.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ccmirror_types::ChangeEvent;

/// Cloneable handle to the pending change queue.
#[derive(Debug, Default, Clone)]
pub struct ChangeQueue {
    inner: Arc<Mutex<Vec<ChangeEvent>>>,
}

impl ChangeQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event.
    pub fn push(&self, event: ChangeEvent) {
        self.lock().push(event);
    }

    /// Swap the queue for an empty one and return what it held.
    pub fn take(&self) -> Vec<ChangeEvent> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ChangeEvent>> {
        // A panicking producer cannot leave a Vec half-written
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
