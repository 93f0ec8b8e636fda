//! Session errors.

use std::time::Duration;

use ccmirror_core::HandshakeStep;
use thiserror::Error;

use crate::transport::TransportError;

/// Errors that end a mirroring session.
///
/// Every variant is fatal: there is no reconnect path.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The relay rejected a handshake step.
    #[error("handshake failed at {step} step: {message}")]
    HandshakeRejected {
        /// The rejected step.
        step: HandshakeStep,
        /// Error payload of the reply.
        message: String,
    },

    /// No reply arrived in time.
    #[error("no reply from relay within {}s", waited.as_secs())]
    ReplyTimeout {
        /// How long we waited.
        waited: Duration,
    },

    /// The connection already failed.
    #[error("connection faulted: {reason}")]
    Faulted {
        /// What went wrong first.
        reason: String,
    },
}
