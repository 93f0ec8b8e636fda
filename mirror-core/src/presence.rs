//! Peer presence tracking.
//!
//! Presence is learned two ways: an explicit `COMMAND:hasslave` query,
//! answered synchronously, and an unsolicited `EVENT:CLIENT_CONNECT`
//! notification. There is no notification for detachment; it is discovered
//! the next time a query answers "no".
//!
//! The recorded flag is informational. Dispatch decisions always issue a
//! fresh query instead of trusting it.

/// Presence flag plus the peer-attached listener registration.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Presence {
    attached: bool,
    armed: bool,
}

impl Presence {
    /// Create a tracker that assumes no peer and has no listener armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the answer to a presence query.
    ///
    /// A positive answer also disarms the listener: nobody is waiting any more.
    pub fn record_query(&mut self, attached: bool) {
        self.attached = attached;
        if attached {
            self.armed = false;
        }
    }

    /// Register interest in the next peer-attached notification.
    ///
    /// Returns `false` if the listener was already armed.
    pub fn arm(&mut self) -> bool {
        !std::mem::replace(&mut self.armed, true)
    }

    /// Handle a peer-attached notification.
    ///
    /// Returns `true` if a listener was armed, in which case the peer is
    /// marked attached and the listener disarmed. Unarmed notifications
    /// have no effect.
    pub fn on_peer_attached(&mut self) -> bool {
        if !self.armed {
            return false;
        }
        self.armed = false;
        self.attached = true;
        true
    }

    /// The peer left mid-session; wait for it to come back.
    pub fn mark_detached(&mut self) {
        self.attached = false;
        self.armed = true;
    }

    /// Last known presence.
    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Whether a peer-attached listener is registered.
    pub fn is_armed(&self) -> bool {
        self.armed
    }
}
