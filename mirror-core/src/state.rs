//! Connection state machine for ccmirror.
//!
//! This module provides a pure, side-effect-free state machine for the
//! connection lifecycle and its handshake. The state machine takes events as
//! input and produces a new state plus a list of actions to execute.
//!
//! The actual I/O (opening the transport, sending requests, reading replies)
//! is performed by ccmirror-client, not by this module.
//!
//! There is no reconnect path: once a transport fails the state is
//! [`ConnectionState::Faulted`] for good.

use std::fmt;

use ccmirror_types::Reply;

/// Step of the handshake while [`ConnectionState::Connecting`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    /// Opening the transport.
    Opening,
    /// `ASSOC:<role>` sent, awaiting its reply.
    Associating,
    /// `COMMAND:connect:<code>` sent, awaiting its reply.
    Joining,
    /// Presence query sent to seed the presence tracker.
    SeedingPresence,
}

impl fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Opening => "open",
            Self::Associating => "association",
            Self::Joining => "connect",
            Self::SeedingPresence => "presence",
        };
        f.write_str(name)
    }
}

/// Connection state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionState {
    /// No transport.
    Disconnected,
    /// Handshake in progress.
    Connecting {
        /// Current handshake step.
        step: HandshakeStep,
    },
    /// Associated with the remote session.
    Associated,
    /// Transport or handshake failure. Terminal.
    Faulted {
        /// What went wrong.
        reason: String,
    },
}

impl ConnectionState {
    /// Create a new state machine in the Disconnected state.
    pub fn new() -> Self {
        Self::Disconnected
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (ccmirror-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: Event) -> (Self, Vec<Action>) {
        use HandshakeStep::*;

        match (self, event) {
            // Terminal
            (state @ Self::Faulted { .. }, _) => (state, vec![]),

            // From Disconnected
            (Self::Disconnected, Event::ConnectRequested) => (
                Self::Connecting { step: Opening },
                vec![Action::OpenTransport],
            ),

            // Handshake
            (Self::Connecting { step: Opening }, Event::TransportOpened) => (
                Self::Connecting { step: Associating },
                vec![Action::SendAssociation],
            ),
            (Self::Connecting { step: Associating }, Event::ReplyReceived { reply: Reply::Ok }) => (
                Self::Connecting { step: Joining },
                vec![Action::SendConnect],
            ),
            (Self::Connecting { step: Joining }, Event::ReplyReceived { reply: Reply::Ok }) => (
                Self::Connecting {
                    step: SeedingPresence,
                },
                vec![Action::QueryPresence],
            ),
            (
                Self::Connecting {
                    step: step @ (Associating | Joining),
                },
                Event::ReplyReceived { reply },
            ) => {
                let message = reply.message();
                (
                    Self::Faulted {
                        reason: format!("{} rejected: {}", step, message),
                    },
                    vec![Action::EmitEvent(ConnectionEvent::HandshakeRejected {
                        step,
                        message,
                    })],
                )
            }
            (Self::Connecting { step: SeedingPresence }, Event::PresenceSeeded { present }) => (
                Self::Associated,
                vec![Action::EmitEvent(ConnectionEvent::Associated {
                    peer_present: present,
                })],
            ),

            // Transport failures are fatal in every live state
            (Self::Connecting { .. } | Self::Associated, Event::TransportFailed { error }) => (
                Self::Faulted {
                    reason: error.clone(),
                },
                vec![Action::EmitEvent(ConnectionEvent::Faulted { reason: error })],
            ),

            // From Associated
            (Self::Associated, Event::DisconnectRequested) => (
                Self::Disconnected,
                vec![
                    Action::SendDisconnect,
                    Action::CloseTransport,
                    Action::EmitEvent(ConnectionEvent::Disconnected),
                ],
            ),

            // Invalid transitions - stay in current state
            (state, _) => (state, vec![]),
        }
    }

    /// Check if the handshake has completed.
    pub fn is_associated(&self) -> bool {
        matches!(self, Self::Associated)
    }

    /// Check if a handshake is in flight.
    pub fn is_connecting(&self) -> bool {
        matches!(self, Self::Connecting { .. })
    }

    /// Check if the connection has failed for good.
    pub fn is_faulted(&self) -> bool {
        matches!(self, Self::Faulted { .. })
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events that can occur in the connection lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A caller needs the connection.
    ConnectRequested,
    /// The transport is open.
    TransportOpened,
    /// The transport could not be opened, or failed/closed afterwards.
    TransportFailed {
        /// Error message describing the failure.
        error: String,
    },
    /// A control reply arrived during the handshake.
    ReplyReceived {
        /// The reply.
        reply: Reply,
    },
    /// The handshake's presence query was answered.
    PresenceSeeded {
        /// Whether the peer is attached.
        present: bool,
    },
    /// The operator ended the session.
    DisconnectRequested,
}

/// Actions to be executed by ccmirror-client.
///
/// These are instructions, not side effects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Open the transport.
    OpenTransport,
    /// Send `ASSOC:<role>` and read its reply.
    SendAssociation,
    /// Send `COMMAND:connect:<code>` and read its reply.
    SendConnect,
    /// Send the presence query and read its reply.
    QueryPresence,
    /// Send `DISCONNECT`.
    SendDisconnect,
    /// Close the transport.
    CloseTransport,
    /// Report an outcome to the caller.
    EmitEvent(ConnectionEvent),
}

/// Outcomes reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Handshake completed.
    Associated {
        /// Presence answer obtained during the handshake.
        peer_present: bool,
    },
    /// The relay answered a handshake step with something other than `OK`.
    HandshakeRejected {
        /// The step that was rejected.
        step: HandshakeStep,
        /// Error payload from the reply.
        message: String,
    },
    /// The transport failed.
    Faulted {
        /// Error message describing the failure.
        reason: String,
    },
    /// Session ended on request.
    Disconnected,
}
