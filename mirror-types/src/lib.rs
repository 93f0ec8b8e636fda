//! # ccmirror-types
//!
//! Wire format types for the ccmirror text protocol.
//!
//! This crate provides the vocabulary shared by every ccmirror crate:
//! - [`ChangeKind`], [`ChangeEvent`] - Filesystem changes awaiting dispatch
//! - [`Request`], [`WireCommand`] - Outbound control frames and command sequences
//! - [`Reply`] - Synchronous control replies
//! - [`PushFrame`] - Unsolicited notifications routed by prefix
//! - [`FrameError`] - Error types
//!
//! Every frame is a single text message. Control frames use colon-delimited
//! fields where the first field is a verb or status.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod change;
mod error;
mod messages;
mod push;

pub use change::{relative_path, ChangeEvent, ChangeKind};
pub use error::FrameError;
pub use messages::{CommandVerb, Reply, Request, WireCommand, DEFAULT_ROLE};
pub use push::{
    DebugFrame, DebugStop, PeerEvent, PushFrame, SessionMessage, StopReason, DEBUG_PREFIX,
    EVENT_PREFIX, SESSION_PREFIX,
};
