//! Debug sessions over the mirroring connection.

use ccmirror_core::{DebugError, DebugUpdate};
use ccmirror_types::{DebugFrame, Request, SessionMessage};

use super::{Session, SessionEvent};
use crate::content::ContentSource;
use crate::error::SessionError;
use crate::transport::Transport;

impl<T: Transport, C: ContentSource> Session<T, C> {
    /// Ask the peer to start debugging `target`.
    ///
    /// Refusals that are local (a session already running, no connection,
    /// no peer) are reported as [`SessionEvent::DebugRejected`] and are not
    /// errors.
    pub async fn start_debug(&mut self, target: &str) -> Result<(), SessionError> {
        if let Some(active) = self.debug.target() {
            let error = DebugError::AlreadyActive {
                target: active.to_string(),
            };
            self.reject_debug(error);
            return Ok(());
        }
        if !self.conn.is_associated() {
            self.reject_debug(DebugError::NotConnected);
            return Ok(());
        }
        if !self.query_presence().await? {
            self.await_peer();
            self.reject_debug(DebugError::PeerAbsent);
            return Ok(());
        }
        if !self.replay.is_empty() {
            // The peer is back: held events go out before the debug request
            tracing::info!("peer attached");
            self.flush_replay().await?;
            if !self.replay.is_empty() {
                self.reject_debug(DebugError::PeerAbsent);
                return Ok(());
            }
        }
        if let Err(error) = self.debug.begin(target) {
            self.reject_debug(error);
            return Ok(());
        }

        self.conn.send(&Request::Debug.encode()).await?;
        self.conn.send(target).await?;
        tracing::info!(%target, "debug session requested");
        Ok(())
    }

    pub(super) fn on_debug_frame(&mut self, frame: DebugFrame) {
        match self.debug.on_frame(frame) {
            Some(update) => self.apply_debug_update(update),
            None => tracing::debug!("debug frame with no active session, discarding"),
        }
    }

    pub(super) fn on_session_message(&mut self, message: SessionMessage) {
        match self.debug.on_session_message(&message) {
            Some(update) => self.apply_debug_update(update),
            None => tracing::debug!(?message, "session message ignored"),
        }
    }

    fn apply_debug_update(&mut self, update: DebugUpdate) {
        match update {
            DebugUpdate::Output(text) => self.emit(SessionEvent::DebugOutput(text)),
            DebugUpdate::Started { target } => {
                tracing::info!(%target, "debug session started");
                self.emit(SessionEvent::DebugStarted { target });
            }
            DebugUpdate::Stopped { target, outcome } => {
                tracing::info!(%target, ?outcome, "debug session stopped");
                if outcome.peer_lost() {
                    self.presence.mark_detached();
                    tracing::info!("peer detached, waiting for it to attach");
                }
                self.emit(SessionEvent::DebugStopped { target, outcome });
            }
        }
    }

    fn reject_debug(&self, error: DebugError) {
        tracing::warn!("{}", error);
        self.emit(SessionEvent::DebugRejected(error));
    }
}

#[cfg(test)]
mod tests {
    use crate::content::MemoryContentSource;
    use crate::session::{Session, SessionConfig, SessionEvent};
    use crate::transport::MockTransport;
    use ccmirror_core::{DebugError, DebugOutcome};
    use ccmirror_types::{ChangeEvent, ChangeKind, StopReason};
    use std::time::Duration;
    use tokio::sync::mpsc;

    type TestSession = Session<MockTransport, MemoryContentSource>;

    async fn associated(
        transport: &MockTransport,
        peer: &str,
    ) -> (TestSession, mpsc::UnboundedReceiver<SessionEvent>) {
        transport.queue_responses(&["OK", "OK", peer]);
        let config = SessionConfig::new("ws://relay.test/", "ABC123")
            .with_pacing(Duration::ZERO)
            .with_reply_timeout(None);
        let (mut session, events) =
            Session::new(config, transport.clone(), MemoryContentSource::new());
        session.connect().await.unwrap();
        (session, events)
    }

    fn drain(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        std::iter::from_fn(|| events.try_recv().ok()).collect()
    }

    #[tokio::test]
    async fn debug_stream_is_relayed_in_order() {
        let transport = MockTransport::new();
        let (mut session, mut events) = associated(&transport, "YES").await;

        transport.queue_response("YES");
        session.execute("d main.lua").await.unwrap();

        let sent = transport.sent_frames();
        assert_eq!(&sent[3..], ["COMMAND:hasslave", "DEBUG", "main.lua"]);
        assert!(session.debug_session().is_active());

        transport.queue_responses(&[
            "DEBUG:START:/main.lua",
            "DEBUG:TEXT:hello ",
            "DEBUG:TEXT:world\n",
            "DEBUG:STOP:1",
        ]);
        for _ in 0..4 {
            session.poll_inbound().await.unwrap();
        }

        assert_eq!(
            drain(&mut events),
            vec![
                SessionEvent::DebugStarted {
                    target: "/main.lua".into()
                },
                SessionEvent::DebugOutput("hello ".into()),
                SessionEvent::DebugOutput("world\n".into()),
                SessionEvent::DebugStopped {
                    target: "main.lua".into(),
                    outcome: DebugOutcome::Completed,
                },
            ]
        );
        assert!(!session.debug_session().is_active());
    }

    #[tokio::test]
    async fn arguments_are_sent_joined() {
        let transport = MockTransport::new();
        let (mut session, _events) = associated(&transport, "YES").await;

        transport.queue_response("YES");
        session.execute("d prog  a   b").await.unwrap();

        assert_eq!(transport.last_sent().as_deref(), Some("prog a b"));
    }

    #[tokio::test]
    async fn second_debug_is_refused_locally() {
        let transport = MockTransport::new();
        let (mut session, mut events) = associated(&transport, "YES").await;

        transport.queue_response("YES");
        session.start_debug("a.lua").await.unwrap();
        let sent_before = transport.sent_frames().len();

        session.start_debug("b.lua").await.unwrap();

        assert_eq!(transport.sent_frames().len(), sent_before);
        assert_eq!(
            drain(&mut events),
            vec![SessionEvent::DebugRejected(DebugError::AlreadyActive {
                target: "a.lua".into()
            })]
        );
        assert_eq!(session.debug_session().target(), Some("a.lua"));
    }

    #[tokio::test]
    async fn debug_needs_present_peer() {
        let transport = MockTransport::new();
        let (mut session, mut events) = associated(&transport, "YES").await;

        transport.queue_response("NO");
        session.start_debug("main.lua").await.unwrap();

        assert_eq!(transport.last_sent().as_deref(), Some("COMMAND:hasslave"));
        assert_eq!(
            drain(&mut events),
            vec![SessionEvent::DebugRejected(DebugError::PeerAbsent)]
        );
        assert!(!session.debug_session().is_active());
        assert!(session.presence().is_armed());
    }

    #[tokio::test]
    async fn held_events_replay_before_debug_starts() {
        let transport = MockTransport::new();
        transport.queue_responses(&["OK", "OK", "NO"]);
        let content = MemoryContentSource::new();
        content.insert("a.txt", "alpha");
        let config = SessionConfig::new("ws://relay.test/", "ABC123")
            .with_pacing(Duration::ZERO)
            .with_reply_timeout(None);
        let (mut session, _events) = Session::new(config, transport.clone(), content);
        session.connect().await.unwrap();

        transport.queue_response("NO");
        session
            .dispatch(ChangeEvent::new("a.txt", ChangeKind::Changed))
            .await
            .unwrap();
        assert_eq!(session.replay().len(), 1);

        // The attach notification lands while the debug presence query waits
        transport.queue_responses(&["EVENT:CLIENT_CONNECT", "YES", "YES", "ack"]);
        session.execute("d main.lua").await.unwrap();
        session.handle_notifications().await.unwrap();

        assert!(session.replay().is_empty());
        assert!(!session.presence().is_armed());
        assert_eq!(
            &transport.sent_frames()[3..],
            [
                "COMMAND:hasslave",
                "COMMAND:hasslave",
                "COMMAND:hasslave",
                "FILEWRITE",
                "a.txt",
                "alpha",
                "DEBUG",
                "main.lua",
            ]
        );
        assert_eq!(session.debug_session().target(), Some("main.lua"));
    }

    #[tokio::test]
    async fn debug_refused_when_peer_leaves_during_replay() {
        let transport = MockTransport::new();
        transport.queue_responses(&["OK", "OK", "NO"]);
        let content = MemoryContentSource::new();
        content.insert("a.txt", "alpha");
        let config = SessionConfig::new("ws://relay.test/", "ABC123")
            .with_pacing(Duration::ZERO)
            .with_reply_timeout(None);
        let (mut session, mut events) = Session::new(config, transport.clone(), content);
        session.connect().await.unwrap();

        transport.queue_response("NO");
        session
            .dispatch(ChangeEvent::new("a.txt", ChangeKind::Changed))
            .await
            .unwrap();

        transport.queue_responses(&["YES", "NO"]);
        session.execute("d main.lua").await.unwrap();

        assert_eq!(session.replay().len(), 1);
        assert!(session.presence().is_armed());
        assert!(!transport.sent_frames().iter().any(|f| f == "DEBUG"));
        assert_eq!(
            drain(&mut events),
            vec![SessionEvent::DebugRejected(DebugError::PeerAbsent)]
        );
    }

    #[tokio::test]
    async fn debug_needs_connection() {
        let transport = MockTransport::new();
        let config = SessionConfig::new("ws://relay.test/", "ABC123");
        let (mut session, mut events) =
            Session::new(config, transport.clone(), MemoryContentSource::new());

        session.start_debug("main.lua").await.unwrap();

        assert!(transport.sent_frames().is_empty());
        assert_eq!(
            drain(&mut events),
            vec![SessionEvent::DebugRejected(DebugError::NotConnected)]
        );
    }

    #[tokio::test]
    async fn resolve_failure_ends_session() {
        let transport = MockTransport::new();
        let (mut session, mut events) = associated(&transport, "YES").await;

        transport.queue_responses(&["YES", "DEBUG:STOP:0:RESOLVE_FAILED"]);
        session.start_debug("missing.lua").await.unwrap();
        session.poll_inbound().await.unwrap();

        assert_eq!(
            drain(&mut events),
            vec![SessionEvent::DebugStopped {
                target: "missing.lua".into(),
                outcome: DebugOutcome::Failed(Some(StopReason::ResolveFailed)),
            }]
        );
        // Not a peer loss
        assert!(!session.presence().is_armed());
    }

    #[tokio::test]
    async fn stale_debug_frames_are_discarded() {
        let transport = MockTransport::new();
        let (mut session, mut events) = associated(&transport, "YES").await;

        transport.queue_responses(&["DEBUG:TEXT:late", "SMESG:CLIENT_DC"]);
        session.poll_inbound().await.unwrap();
        session.poll_inbound().await.unwrap();

        assert!(drain(&mut events).is_empty());
        assert!(!session.presence().is_armed());
    }
}
