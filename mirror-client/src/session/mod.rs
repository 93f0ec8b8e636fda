//! Session - the main interface for ccmirror.
//!
//! This module provides [`Session`], which mirrors local change events to
//! the relay's peer and multiplexes operator debug sessions over the same
//! connection.
//!
//! # Architecture
//!
//! One task owns everything. It waits on, in order of arrival:
//! - the dispatch cycle ticker, which drains the [`ChangeQueue`]
//! - push channels fed by the frame router (peer attached, debug, session)
//! - operator command lines (only while no debug session is active)
//! - inbound frames, while idle
//!
//! While a handler waits for a reply or acknowledgment it reads the
//! transport itself; push frames that arrive meanwhile are queued on their
//! channels and handled once the handler returns.
//!
//! ```text
//! watcher ──► ChangeQueue ──cycle──► dispatch ──► Connection ──► Transport
//!                                       │
//!                                  ReplayBuffer ◄── held while the peer is away
//! ```
//!
//! # Example
//!
//! ```ignore
//! use ccmirror_client::{FsContentSource, Session, SessionConfig, WebSocketTransport};
//!
//! let config = SessionConfig::new("ws://localhost:25580/", "ABC123");
//! let (session, events) = Session::new(config, WebSocketTransport::new(), FsContentSource::new("."));
//! let changes = session.changes();
//! session.run(commands).await?;
//! ```

mod debug;
mod dispatch;

use std::time::Duration;

use ccmirror_core::{DebugError, DebugOutcome, DebugSession, LocalCommand, Presence, ReplayBuffer};
use ccmirror_types::DEFAULT_ROLE;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::connection::{push_channels, Connection, ConnectionSettings, PushReceivers};
use crate::content::ContentSource;
use crate::error::SessionError;
use crate::queue::ChangeQueue;
use crate::transport::Transport;

/// Configuration for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Relay URL.
    pub server_url: String,
    /// Role announced during association.
    pub role: String,
    /// Session code joined after association.
    pub code: String,
    /// Period of the dispatch cycle.
    pub cycle_interval: Duration,
    /// Pause after each acknowledged dispatch.
    pub pacing: Duration,
    /// Upper bound on a single reply wait; `None` waits forever.
    pub reply_timeout: Option<Duration>,
}

impl SessionConfig {
    /// Create a configuration with default timings.
    pub fn new(server_url: &str, code: &str) -> Self {
        Self {
            server_url: server_url.to_string(),
            role: DEFAULT_ROLE.to_string(),
            code: code.to_string(),
            cycle_interval: Duration::from_millis(500),
            pacing: Duration::from_millis(100),
            reply_timeout: Some(Duration::from_secs(30)),
        }
    }

    /// Set the association role.
    pub fn with_role(mut self, role: &str) -> Self {
        self.role = role.to_string();
        self
    }

    /// Set the dispatch cycle period.
    pub fn with_cycle_interval(mut self, interval: Duration) -> Self {
        self.cycle_interval = interval;
        self
    }

    /// Set the pause after each dispatch.
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the reply timeout.
    pub fn with_reply_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.reply_timeout = timeout;
        self
    }
}

/// Operator-facing output of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Debug output fragment, to be written verbatim.
    DebugOutput(String),
    /// The peer resolved the debug target.
    DebugStarted {
        /// Resolved target.
        target: String,
    },
    /// The debug session ended.
    DebugStopped {
        /// Requested target.
        target: String,
        /// How it ended.
        outcome: DebugOutcome,
    },
    /// A debug request was refused locally.
    DebugRejected(DebugError),
    /// An input line matched no command.
    UnknownCommand(String),
}

/// What the session loop does after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep running.
    Continue,
    /// The operator ended the session.
    Exit,
}

/// A mirroring session over one connection.
pub struct Session<T: Transport, C: ContentSource> {
    config: SessionConfig,
    conn: Connection<T>,
    inbox: PushReceivers,
    changes: ChangeQueue,
    content: C,
    replay: ReplayBuffer,
    presence: Presence,
    debug: DebugSession,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<T: Transport, C: ContentSource> Session<T, C> {
    /// Create a session and the receiver for its operator events.
    pub fn new(
        config: SessionConfig,
        transport: T,
        content: C,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (push, inbox) = push_channels();
        let settings = ConnectionSettings {
            url: config.server_url.clone(),
            role: config.role.clone(),
            code: config.code.clone(),
            reply_timeout: config.reply_timeout,
        };
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let session = Self {
            conn: Connection::new(transport, settings, push),
            config,
            inbox,
            changes: ChangeQueue::new(),
            content,
            replay: ReplayBuffer::new(),
            presence: Presence::new(),
            debug: DebugSession::new(),
            events: events_tx,
        };
        (session, events_rx)
    }

    /// Handle for producers of change events.
    pub fn changes(&self) -> ChangeQueue {
        self.changes.clone()
    }

    /// Get a reference to the transport (for testing).
    pub fn transport(&self) -> &T {
        self.conn.transport()
    }

    /// Events held for replay.
    pub fn replay(&self) -> &ReplayBuffer {
        &self.replay
    }

    /// Peer presence as last observed.
    pub fn presence(&self) -> &Presence {
        &self.presence
    }

    /// The debug session slot.
    pub fn debug_session(&self) -> &DebugSession {
        &self.debug
    }

    /// Whether the handshake has completed.
    pub fn is_associated(&self) -> bool {
        self.conn.is_associated()
    }

    /// Connect and associate if not already connected.
    ///
    /// A peer found during the handshake gets the replay buffer flushed to
    /// it right away; otherwise the peer-attached listener is armed.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        if let Some(peer_present) = self.conn.ensure_connecting().await? {
            self.presence.record_query(peer_present);
            if peer_present {
                tracing::info!("peer attached");
                self.flush_replay().await?;
            } else {
                self.await_peer();
            }
        }
        Ok(())
    }

    /// Run until the operator ends the session or the connection fails.
    ///
    /// Connects first. `commands` carries operator input lines; when it
    /// closes, mirroring continues without commands.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<String>,
    ) -> Result<(), SessionError> {
        self.connect().await?;

        let period = self.config.cycle_interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        let mut commands_open = true;
        loop {
            tokio::select! {
                _ = ticker.tick() => self.run_cycle().await?,
                Some(()) = self.inbox.peer.recv() => self.on_peer_attached().await?,
                Some(frame) = self.inbox.debug.recv() => self.on_debug_frame(frame),
                Some(message) = self.inbox.session.recv() => self.on_session_message(message),
                line = commands.recv(), if commands_open && !self.debug.is_active() => match line {
                    Some(line) => {
                        if self.execute(&line).await? == Flow::Exit {
                            return Ok(());
                        }
                    }
                    None => {
                        tracing::debug!("command input closed");
                        commands_open = false;
                    }
                },
                received = self.conn.next_inbound(), if self.conn.is_associated() => {
                    self.conn.route_inbound(received)?;
                }
            }
        }
    }

    /// Execute one operator input line.
    pub async fn execute(&mut self, line: &str) -> Result<Flow, SessionError> {
        match LocalCommand::parse(line) {
            LocalCommand::Empty => {}
            LocalCommand::Debug { target } => self.start_debug(&target).await?,
            LocalCommand::EndSession => {
                tracing::info!("disconnecting");
                self.conn.disconnect().await?;
                return Ok(Flow::Exit);
            }
            LocalCommand::Unknown(text) => {
                tracing::debug!(%text, "unknown command");
                self.emit(SessionEvent::UnknownCommand(text));
            }
        }
        Ok(Flow::Continue)
    }

    /// Read one inbound frame, route it, and handle any notifications.
    pub async fn poll_inbound(&mut self) -> Result<(), SessionError> {
        let received = self.conn.next_inbound().await;
        self.conn.route_inbound(received)?;
        self.handle_notifications().await
    }

    /// Handle every notification already waiting on the push channels.
    pub async fn handle_notifications(&mut self) -> Result<(), SessionError> {
        while let Ok(frame) = self.inbox.debug.try_recv() {
            self.on_debug_frame(frame);
        }
        while let Ok(message) = self.inbox.session.try_recv() {
            self.on_session_message(message);
        }
        while self.inbox.peer.try_recv().is_ok() {
            self.on_peer_attached().await?;
        }
        Ok(())
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            tracing::trace!("session event dropped: no receiver");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemoryContentSource;
    use crate::transport::MockTransport;
    use ccmirror_core::HandshakeStep;
    use ccmirror_types::{ChangeEvent, ChangeKind, StopReason};
    use std::sync::Arc;

    type TestSession = Session<MockTransport, Arc<MemoryContentSource>>;

    fn test_config() -> SessionConfig {
        SessionConfig::new("ws://relay.test/", "ABC123")
            .with_pacing(Duration::ZERO)
            .with_cycle_interval(Duration::from_millis(5))
            .with_reply_timeout(None)
    }

    fn new_session(
        transport: &MockTransport,
        content: &Arc<MemoryContentSource>,
    ) -> (TestSession, mpsc::UnboundedReceiver<SessionEvent>) {
        Session::new(test_config(), transport.clone(), Arc::clone(content))
    }

    /// A session that completed the handshake with the given presence seed.
    async fn associated(
        transport: &MockTransport,
        content: &Arc<MemoryContentSource>,
        peer: &str,
    ) -> (TestSession, mpsc::UnboundedReceiver<SessionEvent>) {
        transport.queue_responses(&["OK", "OK", peer]);
        let (mut session, events) = new_session(transport, content);
        session.connect().await.unwrap();
        (session, events)
    }

    fn drain(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        std::iter::from_fn(|| events.try_recv().ok()).collect()
    }

    // ===========================================
    // Configuration
    // ===========================================

    #[test]
    fn config_defaults() {
        let config = SessionConfig::new("ws://relay.test/", "ABC123");

        assert_eq!(config.role, "controller");
        assert_eq!(config.cycle_interval, Duration::from_millis(500));
        assert_eq!(config.pacing, Duration::from_millis(100));
        assert_eq!(config.reply_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn config_builder_pattern() {
        let config = SessionConfig::new("ws://relay.test/", "ABC123")
            .with_role("observer")
            .with_pacing(Duration::ZERO)
            .with_reply_timeout(None);

        assert_eq!(config.role, "observer");
        assert!(config.pacing.is_zero());
        assert_eq!(config.reply_timeout, None);
    }

    // ===========================================
    // Handshake
    // ===========================================

    #[tokio::test]
    async fn rejected_handshake_never_joins() {
        let transport = MockTransport::new();
        transport.queue_response("ERROR:badcode");
        let content = Arc::new(MemoryContentSource::new());
        let (session, _events) = new_session(&transport, &content);
        let (_tx, rx) = mpsc::unbounded_channel();

        let err = session.run(rx).await.unwrap_err();

        assert!(matches!(
            err,
            SessionError::HandshakeRejected {
                step: HandshakeStep::Associating,
                ..
            }
        ));
        assert!(err.to_string().contains("badcode"));
        assert_eq!(transport.sent_frames(), vec!["ASSOC:controller"]);
    }

    #[tokio::test]
    async fn absent_peer_at_handshake_arms_listener() {
        let transport = MockTransport::new();
        let content = Arc::new(MemoryContentSource::new());

        let (session, _events) = associated(&transport, &content, "NO").await;

        assert!(session.is_associated());
        assert!(!session.presence().is_attached());
        assert!(session.presence().is_armed());
    }

    // ===========================================
    // Commands and the run loop
    // ===========================================

    #[tokio::test]
    async fn dc_sends_disconnect_and_exits() {
        let transport = MockTransport::new();
        let content = Arc::new(MemoryContentSource::new());
        let (mut session, _events) = associated(&transport, &content, "YES").await;

        let flow = session.execute("dc").await.unwrap();

        assert_eq!(flow, Flow::Exit);
        assert_eq!(transport.last_sent().as_deref(), Some("DISCONNECT"));
        assert!(!transport.is_connected());
    }

    #[tokio::test]
    async fn run_returns_after_dc() {
        let transport = MockTransport::new();
        transport.queue_responses(&["OK", "OK", "YES"]);
        transport.hold_open_when_empty();
        let content = Arc::new(MemoryContentSource::new());
        let (session, _events) = new_session(&transport, &content);
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send("dc".to_string()).unwrap();

        session.run(rx).await.unwrap();

        assert_eq!(transport.last_sent().as_deref(), Some("DISCONNECT"));
    }

    #[tokio::test]
    async fn run_mirrors_queued_changes() {
        let transport = MockTransport::new();
        transport.queue_responses(&["OK", "OK", "YES", "YES", "ack"]);
        transport.hold_open_when_empty();
        let content = Arc::new(MemoryContentSource::new());
        content.insert("init.lua", "print(1)");
        let (session, _events) = new_session(&transport, &content);
        session
            .changes()
            .push(ChangeEvent::new("init.lua", ChangeKind::Created));
        let (tx, rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(session.run(rx));
        for _ in 0..200 {
            if transport.sent_frames().iter().any(|f| f == "print(1)") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tx.send("dc".to_string()).unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(
            transport.sent_frames(),
            vec![
                "ASSOC:controller",
                "COMMAND:connect:ABC123",
                "COMMAND:hasslave",
                "COMMAND:hasslave",
                "FILEWRITE",
                "init.lua",
                "print(1)",
                "DISCONNECT",
            ]
        );
    }

    #[tokio::test]
    async fn unknown_command_is_reported() {
        let transport = MockTransport::new();
        let content = Arc::new(MemoryContentSource::new());
        let (mut session, mut events) = associated(&transport, &content, "YES").await;
        let sent_before = transport.sent_frames().len();

        let flow = session.execute("reboot now").await.unwrap();

        assert_eq!(flow, Flow::Continue);
        assert_eq!(
            drain(&mut events),
            vec![SessionEvent::UnknownCommand("reboot now".into())]
        );
        assert_eq!(transport.sent_frames().len(), sent_before);
    }

    #[tokio::test]
    async fn blank_line_does_nothing() {
        let transport = MockTransport::new();
        let content = Arc::new(MemoryContentSource::new());
        let (mut session, mut events) = associated(&transport, &content, "YES").await;

        assert_eq!(session.execute("   ").await.unwrap(), Flow::Continue);
        assert!(drain(&mut events).is_empty());
    }

    // ===========================================
    // Peer loss during debug
    // ===========================================

    #[tokio::test]
    async fn client_dc_during_debug_rearms_and_holds() {
        let transport = MockTransport::new();
        let content = Arc::new(MemoryContentSource::new());
        content.insert("a.lua", "x");
        let (mut session, mut events) = associated(&transport, &content, "YES").await;

        transport.queue_response("YES");
        session.execute("d main.lua").await.unwrap();

        transport.queue_response("SMESG:CLIENT_DC");
        session.poll_inbound().await.unwrap();

        assert!(!session.debug_session().is_active());
        assert!(session.presence().is_armed());
        assert_eq!(
            drain(&mut events),
            vec![SessionEvent::DebugStopped {
                target: "main.lua".into(),
                outcome: DebugOutcome::Failed(Some(StopReason::ClientDisconnected)),
            }]
        );

        // The next change finds the peer gone and is held
        transport.queue_response("NO");
        session
            .changes()
            .push(ChangeEvent::new("a.lua", ChangeKind::Changed));
        session.run_cycle().await.unwrap();
        assert_eq!(session.replay().len(), 1);

        // Reattachment replays it
        transport.queue_responses(&["EVENT:CLIENT_CONNECT", "YES", "ack"]);
        session.poll_inbound().await.unwrap();

        assert!(session.replay().is_empty());
        let sent = transport.sent_frames();
        assert_eq!(&sent[sent.len() - 3..], ["FILEWRITE", "a.lua", "x"]);
    }
}
