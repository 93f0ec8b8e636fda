//! Debug session state machine.
//!
//! A debug session is an interactive request/stream exchange multiplexed
//! over the mirroring connection. The operator starts one with `d <target>`;
//! the peer then streams `DEBUG:TEXT`, `DEBUG:START` and finally one
//! `DEBUG:STOP` frame. At most one session exists at a time.
//!
//! This module only interprets frames. Sending `DEBUG` and writing output
//! is done by ccmirror-client.

use thiserror::Error;

use ccmirror_types::{DebugFrame, DebugStop, SessionMessage, StopReason};

/// Reasons a debug session cannot be started locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DebugError {
    /// A session is already running.
    #[error("debug session already active for {target}")]
    AlreadyActive {
        /// Target of the running session.
        target: String,
    },

    /// No target was given.
    #[error("missing debug target")]
    MissingTarget,

    /// The connection is not associated.
    #[error("cannot debug: not connected")]
    NotConnected,

    /// The peer is not attached.
    #[error("cannot debug: peer not attached")]
    PeerAbsent,
}

/// How a debug session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugOutcome {
    /// `STOP:1`
    Completed,
    /// `STOP:0[:<reason>]`
    Failed(Option<StopReason>),
}

impl DebugOutcome {
    /// Whether the peer left and presence must be re-established.
    pub fn peer_lost(&self) -> bool {
        matches!(self, Self::Failed(Some(StopReason::ClientDisconnected)))
    }
}

impl From<DebugStop> for DebugOutcome {
    fn from(stop: DebugStop) -> Self {
        if stop.success {
            Self::Completed
        } else {
            Self::Failed(stop.reason)
        }
    }
}

/// What the caller should do with a debug frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugUpdate {
    /// Write the fragment verbatim, without adding a newline.
    Output(String),
    /// The peer resolved the target.
    Started {
        /// Resolved target name.
        target: String,
    },
    /// The session is over; local commands may resume.
    Stopped {
        /// Target the operator asked for.
        target: String,
        /// How it ended.
        outcome: DebugOutcome,
    },
}

/// The optional singleton debug session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DebugSession {
    target: Option<String>,
}

impl DebugSession {
    /// Create an idle session slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session for `target`.
    pub fn begin(&mut self, target: &str) -> Result<(), DebugError> {
        if let Some(active) = &self.target {
            return Err(DebugError::AlreadyActive {
                target: active.clone(),
            });
        }
        if target.trim().is_empty() {
            return Err(DebugError::MissingTarget);
        }
        self.target = Some(target.to_string());
        Ok(())
    }

    /// Interpret a debug stream frame.
    ///
    /// Returns `None` when no session is active; the frame is stale.
    pub fn on_frame(&mut self, frame: DebugFrame) -> Option<DebugUpdate> {
        self.target.as_ref()?;
        match frame {
            DebugFrame::Text(text) => Some(DebugUpdate::Output(text)),
            DebugFrame::Start(target) => Some(DebugUpdate::Started { target }),
            DebugFrame::Stop(stop) => {
                let target = self.target.take()?;
                Some(DebugUpdate::Stopped {
                    target,
                    outcome: stop.into(),
                })
            }
        }
    }

    /// Interpret a session message.
    ///
    /// A client disconnect during an active session becomes a synthetic
    /// `STOP:0:CLIENT_DC`.
    pub fn on_session_message(&mut self, message: &SessionMessage) -> Option<DebugUpdate> {
        match message {
            SessionMessage::ClientDisconnected => {
                self.on_frame(DebugFrame::Stop(DebugStop::client_disconnected()))
            }
            SessionMessage::Other(_) => None,
        }
    }

    /// Whether a session is running.
    pub fn is_active(&self) -> bool {
        self.target.is_some()
    }

    /// Target of the running session.
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }
}
