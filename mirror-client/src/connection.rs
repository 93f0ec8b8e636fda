//! Connection manager.
//!
//! [`Connection`] owns the transport and drives the pure
//! [`ConnectionState`] machine from ccmirror-core, executing the actions it
//! returns. It is also the only reader of the transport: every inbound frame
//! goes through the [`FrameRouter`], which claims push frames for the typed
//! channels in [`PushReceivers`] and queues everything else for
//! [`Connection::read_next_frame`].
//!
//! ```text
//! Transport ──recv──► FrameRouter ──push──► PushReceivers (peer / debug / session)
//!                          │
//!                          └─other──► pending ──► read_next_frame (replies, acks)
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use ccmirror_core::{Action, ConnectionEvent, ConnectionState, Event, FrameRouter};
use ccmirror_types::{DebugFrame, PeerEvent, PushFrame, Reply, Request, SessionMessage};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::error::SessionError;
use crate::transport::{Transport, TransportError};

/// Where and how to associate.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// Relay URL.
    pub url: String,
    /// Role announced with `ASSOC`.
    pub role: String,
    /// Session code announced with `COMMAND:connect`.
    pub code: String,
    /// Upper bound on any single reply wait; `None` waits forever.
    pub reply_timeout: Option<Duration>,
}

/// Sending halves of the push channels, held by the router side.
#[derive(Debug)]
pub struct PushSenders {
    peer: mpsc::UnboundedSender<()>,
    debug: mpsc::UnboundedSender<DebugFrame>,
    session: mpsc::UnboundedSender<SessionMessage>,
}

/// Receiving halves of the push channels.
#[derive(Debug)]
pub struct PushReceivers {
    /// `EVENT:CLIENT_CONNECT` notifications.
    pub peer: mpsc::UnboundedReceiver<()>,
    /// `DEBUG:*` frames.
    pub debug: mpsc::UnboundedReceiver<DebugFrame>,
    /// `SMESG:*` frames.
    pub session: mpsc::UnboundedReceiver<SessionMessage>,
}

/// Create the three push channels.
pub fn push_channels() -> (PushSenders, PushReceivers) {
    let (peer_tx, peer_rx) = mpsc::unbounded_channel();
    let (debug_tx, debug_rx) = mpsc::unbounded_channel();
    let (session_tx, session_rx) = mpsc::unbounded_channel();
    (
        PushSenders {
            peer: peer_tx,
            debug: debug_tx,
            session: session_tx,
        },
        PushReceivers {
            peer: peer_rx,
            debug: debug_rx,
            session: session_rx,
        },
    )
}

impl PushSenders {
    fn deliver(&self, push: PushFrame) {
        // Receivers live as long as the session; a failed send means it is gone
        match push {
            PushFrame::Event(PeerEvent::ClientConnect) => {
                let _ = self.peer.send(());
            }
            PushFrame::Event(PeerEvent::Other(name)) => {
                tracing::debug!(event = %name, "ignoring peer event");
            }
            PushFrame::Debug(frame) => {
                let _ = self.debug.send(frame);
            }
            PushFrame::Session(message) => {
                let _ = self.session.send(message);
            }
        }
    }
}

/// The single connection to the relay.
pub struct Connection<T: Transport> {
    transport: T,
    settings: ConnectionSettings,
    state: ConnectionState,
    router: FrameRouter,
    push: PushSenders,
}

impl<T: Transport> Connection<T> {
    /// Create a disconnected connection.
    pub fn new(transport: T, settings: ConnectionSettings, push: PushSenders) -> Self {
        Self {
            transport,
            settings,
            state: ConnectionState::new(),
            router: FrameRouter::new(),
            push,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    /// Whether the handshake has completed.
    pub fn is_associated(&self) -> bool {
        self.state.is_associated()
    }

    /// Get a reference to the transport (for testing).
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Start the handshake if no connection exists yet.
    ///
    /// Returns `Ok(None)` when a connection already exists or is being
    /// established, and `Ok(Some(peer_present))` when this call completed
    /// the handshake.
    pub async fn ensure_connecting(&mut self) -> Result<Option<bool>, SessionError> {
        if self.state != ConnectionState::Disconnected {
            return Ok(None);
        }

        let mut events = VecDeque::from([Event::ConnectRequested]);
        while let Some(event) = events.pop_front() {
            for action in self.transition(event) {
                match action {
                    Action::OpenTransport => {
                        tracing::info!(url = %self.settings.url, "connecting to relay");
                        match self.transport.connect(&self.settings.url).await {
                            Ok(()) => events.push_back(Event::TransportOpened),
                            Err(e) => events.push_back(Event::TransportFailed {
                                error: e.to_string(),
                            }),
                        }
                    }
                    Action::SendAssociation => {
                        let request = Request::Associate {
                            role: self.settings.role.clone(),
                        };
                        let reply = self.request(&request).await?;
                        events.push_back(Event::ReplyReceived { reply });
                    }
                    Action::SendConnect => {
                        let request = Request::Connect {
                            code: self.settings.code.clone(),
                        };
                        let reply = self.request(&request).await?;
                        events.push_back(Event::ReplyReceived { reply });
                    }
                    Action::QueryPresence => {
                        let reply = self.request(&Request::HasPeer).await?;
                        events.push_back(Event::PresenceSeeded {
                            present: reply == Reply::Yes,
                        });
                    }
                    Action::EmitEvent(ConnectionEvent::Associated { peer_present }) => {
                        tracing::info!(peer_present, "associated with relay");
                        return Ok(Some(peer_present));
                    }
                    Action::EmitEvent(ConnectionEvent::HandshakeRejected { step, message }) => {
                        tracing::error!(%step, "relay rejected handshake: {}", message);
                        let _ = self.transport.close().await;
                        return Err(SessionError::HandshakeRejected { step, message });
                    }
                    Action::EmitEvent(ConnectionEvent::Faulted { reason }) => {
                        tracing::error!("connection failed: {}", reason);
                        return Err(SessionError::Faulted { reason });
                    }
                    Action::SendDisconnect
                    | Action::CloseTransport
                    | Action::EmitEvent(ConnectionEvent::Disconnected) => {}
                }
            }
        }
        Ok(None)
    }

    /// Send one frame.
    pub async fn send(&mut self, frame: &str) -> Result<(), SessionError> {
        if let ConnectionState::Faulted { reason } = &self.state {
            return Err(SessionError::Faulted {
                reason: reason.clone(),
            });
        }
        tracing::debug!(%frame, "send");
        let result = self.transport.send(frame).await;
        result.map_err(|e| self.fail(e.into()))
    }

    /// Send a control request and wait for its reply.
    pub async fn request(&mut self, request: &Request) -> Result<Reply, SessionError> {
        self.send(&request.encode()).await?;
        let frame = self.read_next_frame().await?;
        Ok(Reply::parse(&frame))
    }

    /// Next frame that is not a push frame.
    ///
    /// Push frames read while waiting are delivered to their channels. The
    /// configured reply timeout bounds the whole wait; expiry is fatal.
    pub async fn read_next_frame(&mut self) -> Result<String, SessionError> {
        let timeout = self.settings.reply_timeout;
        let deadline = timeout.map(|t| Instant::now() + t);

        loop {
            if let Some(frame) = self.router.next_pending() {
                return Ok(frame);
            }

            let received = match (deadline, timeout) {
                (Some(deadline), Some(waited)) => {
                    match tokio::time::timeout_at(deadline, self.transport.recv()).await {
                        Ok(received) => received,
                        Err(_) => return Err(self.fail(SessionError::ReplyTimeout { waited })),
                    }
                }
                _ => self.transport.recv().await,
            };
            self.route_inbound(received)?;
        }
    }

    /// Wait for the next inbound frame without routing it.
    ///
    /// Cancel-safe; pair with [`Connection::route_inbound`].
    pub async fn next_inbound(&self) -> Result<String, TransportError> {
        self.transport.recv().await
    }

    /// Route a frame obtained from [`Connection::next_inbound`].
    pub fn route_inbound(
        &mut self,
        received: Result<String, TransportError>,
    ) -> Result<(), SessionError> {
        let frame = received.map_err(|e| self.fail(e.into()))?;
        tracing::debug!(%frame, "recv");
        match self.router.accept(frame) {
            Ok(Some(push)) => self.push.deliver(push),
            Ok(None) => tracing::trace!(pending = self.router.pending_len(), "queued reply"),
            Err(e) => tracing::warn!("dropping malformed push frame: {}", e),
        }
        Ok(())
    }

    /// End the session: `DISCONNECT`, then close.
    pub async fn disconnect(&mut self) -> Result<(), SessionError> {
        let actions = self.transition(Event::DisconnectRequested);
        if actions.is_empty() && self.transport.is_connected() {
            self.transport.close().await?;
        }
        for action in actions {
            match action {
                Action::SendDisconnect => {
                    self.transport.send(&Request::Disconnect.encode()).await?;
                }
                Action::CloseTransport => self.transport.close().await?,
                Action::EmitEvent(_) => tracing::info!("session ended"),
                _ => {}
            }
        }
        Ok(())
    }

    fn transition(&mut self, event: Event) -> Vec<Action> {
        let (next, actions) = std::mem::take(&mut self.state).on_event(event);
        self.state = next;
        actions
    }

    fn fail(&mut self, error: SessionError) -> SessionError {
        self.transition(Event::TransportFailed {
            error: error.to_string(),
        });
        error
    }
}
