//! Outbound frames and synchronous replies.
//!
//! Control requests ([`Request`]) are answered by exactly one [`Reply`].
//! Change events travel as a [`WireCommand`]: a verb frame, a path frame
//! and, for file writes, a content frame. The peer answers each command
//! sequence with one acknowledgment frame whose content is not inspected.

use std::fmt;

use crate::ChangeEvent;
use crate::ChangeKind;

/// Role announced in the association request.
pub const DEFAULT_ROLE: &str = "controller";

/// A single-frame control request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `ASSOC:<role>` - identify this endpoint to the relay.
    Associate {
        /// Role of this endpoint.
        role: String,
    },
    /// `COMMAND:connect:<code>` - join the session named by the code.
    Connect {
        /// Association code of the remote session.
        code: String,
    },
    /// `COMMAND:hasslave` - ask whether the peer is attached.
    HasPeer,
    /// `DEBUG` - verb frame opening a debug session; followed by the argument frame.
    Debug,
    /// `DISCONNECT` - end the session. No reply.
    Disconnect,
}

impl Request {
    /// Encode the request as a single text frame.
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Associate { role } => write!(f, "ASSOC:{}", role),
            Self::Connect { code } => write!(f, "COMMAND:connect:{}", code),
            Self::HasPeer => f.write_str("COMMAND:hasslave"),
            Self::Debug => f.write_str("DEBUG"),
            Self::Disconnect => f.write_str("DISCONNECT"),
        }
    }
}

/// Verb frame that opens a command sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandVerb {
    /// Create a directory.
    DirCreate,
    /// Write a file's full content.
    FileWrite,
    /// Remove a file or directory.
    Unlink,
}

impl CommandVerb {
    /// The verb as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DirCreate => "DIRCREATE",
            Self::FileWrite => "FILEWRITE",
            Self::Unlink => "UNLINK",
        }
    }
}

impl From<ChangeKind> for CommandVerb {
    fn from(kind: ChangeKind) -> Self {
        match kind {
            ChangeKind::DirCreated => Self::DirCreate,
            ChangeKind::Created | ChangeKind::Changed => Self::FileWrite,
            ChangeKind::Removed | ChangeKind::DirRemoved => Self::Unlink,
        }
    }
}

/// A change event translated into its frame sequence.
#[derive(Clone, PartialEq, Eq)]
pub struct WireCommand {
    /// Leading verb frame.
    pub verb: CommandVerb,
    /// Root-relative path frame.
    pub path: String,
    /// Full text content, present only for `FILEWRITE`.
    pub content: Option<String>,
}

impl WireCommand {
    /// Translate an event, reading content only when the verb needs it.
    ///
    /// `read_content` is called at most once, and only for file writes.
    pub fn from_event<E>(
        event: &ChangeEvent,
        read_content: impl FnOnce(&str) -> Result<String, E>,
    ) -> Result<Self, E> {
        let content = if event.kind.carries_content() {
            Some(read_content(&event.path)?)
        } else {
            None
        };
        Ok(Self {
            verb: event.kind.into(),
            path: event.path.clone(),
            content,
        })
    }

    /// The frames to send, in order.
    pub fn frames(&self) -> Vec<String> {
        let mut frames = vec![self.verb.as_str().to_string(), self.path.clone()];
        if let Some(content) = &self.content {
            frames.push(content.clone());
        }
        frames
    }
}

impl fmt::Debug for WireCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WireCommand")
            .field("verb", &self.verb)
            .field("path", &self.path)
            .field(
                "content",
                &self.content.as_ref().map(|c| format!("[{} bytes]", c.len())),
            )
            .finish()
    }
}

/// A synchronous control reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Literal `OK`.
    Ok,
    /// Literal `YES`.
    Yes,
    /// `ERROR:<message>`.
    Error(String),
    /// Anything else.
    Other(String),
}

impl Reply {
    /// Classify a reply frame. Matching is exact; no trimming.
    pub fn parse(frame: &str) -> Self {
        match frame {
            "OK" => Self::Ok,
            "YES" => Self::Yes,
            _ => match frame.strip_prefix("ERROR:") {
                Some(message) => Self::Error(message.to_string()),
                None => Self::Other(frame.to_string()),
            },
        }
    }

    /// Human-readable payload of a rejected request.
    ///
    /// This is the text after the first colon, or the whole frame when it
    /// has none.
    pub fn message(&self) -> String {
        match self {
            Self::Ok => "OK".to_string(),
            Self::Yes => "YES".to_string(),
            Self::Error(message) => message.clone(),
            Self::Other(frame) => match frame.split_once(':') {
                Some((_, rest)) => rest.to_string(),
                None => frame.clone(),
            },
        }
    }
}
