//! # ccmirror-client
//!
//! Session client for ccmirror.
//!
//! This is the library the `ccmirror` binary drives: it connects to the
//! relay, associates with a session code, and mirrors local change events
//! to the attached peer.
//!
//! ## Features
//!
//! - **Handshake**: association, session join and presence seeding
//! - **Replay**: changes made while the peer is away are held and replayed in order
//! - **Serialized dispatch**: one acknowledged command sequence at a time
//! - **Debug sessions**: an interactive debug stream multiplexed on the same connection
//! - **Transport Abstraction**: Pluggable transport layer (WebSocket, mock)
//! - **Pure State Machines**: Uses ccmirror-core for side-effect-free logic
//!
//! ## Example
//!
//! ```ignore
//! use ccmirror_client::{FsContentSource, Session, SessionConfig, WebSocketTransport};
//!
//! let config = SessionConfig::new("ws://localhost:25580/", "ABC123");
//! let (session, events) = Session::new(config, WebSocketTransport::new(), FsContentSource::new("."));
//!
//! // Feed change events from a watcher
//! session.changes().push(event);
//!
//! // Run until `dc` or a fatal error
//! session.run(commands).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod connection;
pub mod content;
pub mod error;
pub mod queue;
pub mod session;
pub mod transport;

pub use connection::{push_channels, Connection, ConnectionSettings, PushReceivers, PushSenders};
pub use content::{ContentSource, FsContentSource, MemoryContentSource};
pub use error::SessionError;
pub use queue::ChangeQueue;
pub use session::{Flow, Session, SessionConfig, SessionEvent};
pub use transport::{MockTransport, Transport, TransportError, WebSocketTransport};
