//! Change dispatch and replay.
//!
//! Every dispatch decision is made on a fresh presence query, never on the
//! cached flag. Events that cannot go out now are held in the
//! [`ReplayBuffer`](ccmirror_core::ReplayBuffer) and replayed, in order,
//! when the peer attaches. While anything is held, new events queue behind
//! it instead of overtaking.

use ccmirror_types::{ChangeEvent, Reply, Request, WireCommand};

use super::Session;
use crate::content::ContentSource;
use crate::error::SessionError;
use crate::transport::Transport;

impl<T: Transport, C: ContentSource> Session<T, C> {
    /// Run one dispatch cycle: swap out the change queue and dispatch its
    /// events in order.
    pub async fn run_cycle(&mut self) -> Result<(), SessionError> {
        let snapshot = self.changes.take();
        if snapshot.is_empty() {
            return Ok(());
        }
        tracing::trace!(count = snapshot.len(), "dispatch cycle");

        for event in snapshot {
            self.dispatch(event).await?;
        }
        Ok(())
    }

    /// Send one change event to the peer, or hold it.
    pub async fn dispatch(&mut self, event: ChangeEvent) -> Result<(), SessionError> {
        if !self.conn.is_associated() {
            self.hold(event);
            return self.connect().await;
        }

        if !self.replay.is_empty() {
            self.hold(event);
            return self.flush_replay().await;
        }

        if !self.query_presence().await? {
            self.hold(event);
            self.await_peer();
            return Ok(());
        }

        self.send_event(&event).await
    }

    /// Replay held events, oldest first, while the peer stays attached.
    ///
    /// An event leaves the buffer only once acknowledged. If the peer is
    /// gone again, the rest stays held and the listener is re-armed.
    pub async fn flush_replay(&mut self) -> Result<(), SessionError> {
        if self.replay.is_empty() {
            return Ok(());
        }
        tracing::info!(held = self.replay.len(), "replaying held events");

        while let Some(event) = self.replay.front().cloned() {
            if !self.query_presence().await? {
                self.await_peer();
                return Ok(());
            }
            self.send_event(&event).await?;
            self.replay.release_front();
        }
        Ok(())
    }

    /// Ask the relay whether the peer is attached.
    ///
    /// Attach notifications received before this query are superseded by
    /// its answer and discarded.
    pub async fn query_presence(&mut self) -> Result<bool, SessionError> {
        while self.inbox.peer.try_recv().is_ok() {}

        let reply = self.conn.request(&Request::HasPeer).await?;
        let present = reply == Reply::Yes;
        self.presence.record_query(present);
        Ok(present)
    }

    pub(super) async fn on_peer_attached(&mut self) -> Result<(), SessionError> {
        if !self.presence.on_peer_attached() {
            tracing::debug!("peer attach notification with no listener, ignoring");
            return Ok(());
        }
        tracing::info!("peer attached");
        self.flush_replay().await
    }

    pub(super) fn await_peer(&mut self) {
        if self.presence.arm() {
            tracing::info!("waiting for peer to attach");
        }
    }

    fn hold(&mut self, event: ChangeEvent) {
        tracing::info!("[HOLD] {}", event);
        self.replay.hold(event);
    }

    async fn send_event(&mut self, event: &ChangeEvent) -> Result<(), SessionError> {
        let content = &self.content;
        let command = match WireCommand::from_event(event, |path| content.read_text(path)) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!("[DISPATCH] {} skipped, cannot read content: {}", event, e);
                return Ok(());
            }
        };

        tracing::info!("[DISPATCH] {}", event);
        for frame in command.frames() {
            self.conn.send(&frame).await?;
        }
        let ack = self.conn.read_next_frame().await?;
        tracing::debug!(%ack, path = %event.path, "dispatch acknowledged");

        if !self.config.pacing.is_zero() {
            tokio::time::sleep(self.config.pacing).await;
        }
        Ok(())
    }
}
