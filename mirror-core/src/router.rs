//! Inbound frame router.
//!
//! Every inbound frame passes through [`FrameRouter::accept`]. Frames with a
//! push prefix are claimed and handed back to the caller for delivery on a
//! typed channel; everything else is queued for the synchronous reader.
//! A claimed frame never enters the pending queue, so a blocking read for a
//! control reply or an acknowledgment can never consume a notification.

use std::collections::VecDeque;

use ccmirror_types::{FrameError, PushFrame};

/// Pending-frame queue plus push classification.
#[derive(Debug, Default)]
pub struct FrameRouter {
    pending: VecDeque<String>,
}

impl FrameRouter {
    /// Create a router with an empty pending queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one inbound frame.
    ///
    /// Returns `Ok(Some(_))` for a claimed push frame, `Ok(None)` when the
    /// frame was queued for the synchronous reader, and `Err` for a frame
    /// with a push prefix that could not be decoded (it is dropped).
    pub fn accept(&mut self, frame: String) -> Result<Option<PushFrame>, FrameError> {
        match PushFrame::parse(&frame)? {
            Some(push) => Ok(Some(push)),
            None => {
                self.pending.push_back(frame);
                Ok(None)
            }
        }
    }

    /// Take the oldest frame waiting for the synchronous reader.
    pub fn next_pending(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    /// Number of frames waiting for the synchronous reader.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
