//! # ccmirror-core
//!
//! Pure logic for ccmirror (no I/O, instant tests).
//!
//! This crate implements the state machines and bookkeeping of a mirroring
//! session without any network or disk I/O, enabling fast unit tests.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce output
//! without side effects:
//! - [`ConnectionState`] turns connection events into a new state plus actions
//! - [`ReplayBuffer`] keeps held change events in generation order
//! - [`FrameRouter`] separates push frames from synchronous replies
//! - [`Presence`] tracks whether the peer is attached and who is waiting for it
//! - [`DebugSession`] interprets the debug stream sub-protocol
//! - [`LocalCommand`] parses the operator's command grammar
//!
//! The actual I/O (transport, file reads, terminal) is performed by
//! `ccmirror-client`, which interprets what these types decide.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod command;
pub mod debug;
pub mod presence;
pub mod router;
pub mod state;

pub use buffer::ReplayBuffer;
pub use command::LocalCommand;
pub use debug::{DebugError, DebugOutcome, DebugSession, DebugUpdate};
pub use presence::Presence;
pub use router::FrameRouter;
pub use state::{Action, ConnectionEvent, ConnectionState, Event, HandshakeStep};
