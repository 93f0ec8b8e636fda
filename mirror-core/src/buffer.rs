//! Replay buffer for ccmirror.
//!
//! This module provides a FIFO of change events that could not be
//! dispatched, either because there was no transport yet or because the
//! peer was not attached. Held events are replayed in generation order once
//! presence is re-established.
//!
//! Events flow through the buffer in this order:
//! 1. `hold()` - append to the back
//! 2. `front()` - peek at the next event to replay
//! 3. `release_front()` - remove it once the peer acknowledged it
//!
//! An event stays in the buffer until it is acknowledged, so a replay that
//! is interrupted by the peer vanishing again resumes from the same event.
//! The buffer is unbounded: dropping a held change would silently diverge
//! the peer's copy.

use std::collections::VecDeque;

use ccmirror_types::ChangeEvent;

/// Ordered store of held change events.
#[derive(Debug, Default)]
pub struct ReplayBuffer {
    held: VecDeque<ChangeEvent>,
}

impl ReplayBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event behind everything already held.
    pub fn hold(&mut self, event: ChangeEvent) {
        self.held.push_back(event);
    }

    /// The next event to replay.
    pub fn front(&self) -> Option<&ChangeEvent> {
        self.held.front()
    }

    /// Remove the front event after it has been delivered.
    pub fn release_front(&mut self) -> Option<ChangeEvent> {
        self.held.pop_front()
    }

    /// Number of held events.
    pub fn len(&self) -> usize {
        self.held.len()
    }

    /// Check if nothing is held.
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Iterate held events in replay order.
    pub fn iter(&self) -> impl Iterator<Item = &ChangeEvent> {
        self.held.iter()
    }
}
