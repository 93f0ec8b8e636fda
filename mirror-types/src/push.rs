//! Unsolicited push frames.
//!
//! The peer sends these without a preceding request. They are recognised by
//! the first colon-delimited field and must never be consumed as the reply
//! to a control request or as a dispatch acknowledgment.

use std::fmt;

use crate::FrameError;

/// Prefix of peer presence notifications (`EVENT:CLIENT_CONNECT`).
pub const EVENT_PREFIX: &str = "EVENT";
/// Prefix of debug stream frames (`DEBUG:TEXT:...`).
pub const DEBUG_PREFIX: &str = "DEBUG";
/// Prefix of session messages (`SMESG:CLIENT_DC`).
pub const SESSION_PREFIX: &str = "SMESG";

/// A decoded push frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushFrame {
    /// `EVENT:<name>`
    Event(PeerEvent),
    /// `DEBUG:<sub-verb>:...`
    Debug(DebugFrame),
    /// `SMESG:<name>`
    Session(SessionMessage),
}

impl PushFrame {
    /// Decode a frame if it carries a push prefix.
    ///
    /// Returns `Ok(None)` for frames that belong to the synchronous reply
    /// channel.
    pub fn parse(frame: &str) -> Result<Option<Self>, FrameError> {
        let Some((prefix, rest)) = frame.split_once(':') else {
            return Ok(None);
        };
        let push = match prefix {
            EVENT_PREFIX => Self::Event(PeerEvent::parse(non_empty(EVENT_PREFIX, rest)?)),
            DEBUG_PREFIX => Self::Debug(DebugFrame::parse(non_empty(DEBUG_PREFIX, rest)?)?),
            SESSION_PREFIX => {
                Self::Session(SessionMessage::parse(non_empty(SESSION_PREFIX, rest)?))
            }
            _ => return Ok(None),
        };
        Ok(Some(push))
    }
}

fn non_empty<'a>(prefix: &'static str, rest: &'a str) -> Result<&'a str, FrameError> {
    if rest.is_empty() {
        Err(FrameError::Empty(prefix))
    } else {
        Ok(rest)
    }
}

/// Presence notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// The peer attached to the session.
    ClientConnect,
    /// An event name we do not act on.
    Other(String),
}

impl PeerEvent {
    fn parse(name: &str) -> Self {
        match name {
            "CLIENT_CONNECT" => Self::ClientConnect,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Session-level messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMessage {
    /// The peer disconnected.
    ClientDisconnected,
    /// A message we do not act on.
    Other(String),
}

impl SessionMessage {
    fn parse(name: &str) -> Self {
        match name {
            "CLIENT_DC" => Self::ClientDisconnected,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Debug stream frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugFrame {
    /// Output fragment, written verbatim.
    Text(String),
    /// The target resolved; carries its name.
    Start(String),
    /// The session ended.
    Stop(DebugStop),
}

impl DebugFrame {
    fn parse(body: &str) -> Result<Self, FrameError> {
        let (verb, payload) = body.split_once(':').unwrap_or((body, ""));
        match verb {
            "TEXT" => Ok(Self::Text(payload.to_string())),
            "START" => Ok(Self::Start(payload.to_string())),
            "STOP" => DebugStop::parse(payload).map(Self::Stop),
            _ => Err(FrameError::UnknownDebugVerb(body.to_string())),
        }
    }
}

/// Terminal frame of a debug session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebugStop {
    /// Whether the session completed successfully.
    pub success: bool,
    /// Failure classification, if the peer gave one.
    pub reason: Option<StopReason>,
}

impl DebugStop {
    /// The stop synthesised when the peer disconnects mid-session.
    pub fn client_disconnected() -> Self {
        Self {
            success: false,
            reason: Some(StopReason::ClientDisconnected),
        }
    }

    fn parse(payload: &str) -> Result<Self, FrameError> {
        let (flag, reason) = match payload.split_once(':') {
            Some((flag, reason)) => (flag, Some(reason)),
            None => (payload, None),
        };
        let success = match flag {
            "1" => true,
            "0" => false,
            other => return Err(FrameError::InvalidStopFlag(other.to_string())),
        };
        let reason = reason.filter(|r| !r.is_empty()).map(StopReason::parse);
        Ok(Self { success, reason })
    }
}

/// Why a debug session failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// `RESOLVE_FAILED` - the target could not be resolved.
    ResolveFailed,
    /// `CLIENT_DC` - the peer disconnected mid-session.
    ClientDisconnected,
    /// `ALREADY_ACTIVE` - the peer already runs a debug session.
    AlreadyActive,
    /// Any other reason, verbatim.
    Other(String),
}

impl StopReason {
    fn parse(reason: &str) -> Self {
        match reason {
            "RESOLVE_FAILED" => Self::ResolveFailed,
            "CLIENT_DC" => Self::ClientDisconnected,
            "ALREADY_ACTIVE" => Self::AlreadyActive,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ResolveFailed => f.write_str("RESOLVE_FAILED"),
            Self::ClientDisconnected => f.write_str("CLIENT_DC"),
            Self::AlreadyActive => f.write_str("ALREADY_ACTIVE"),
            Self::Other(reason) => f.write_str(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_and_acks_are_not_push_frames() {
        assert_eq!(PushFrame::parse("OK").unwrap(), None);
        assert_eq!(PushFrame::parse("YES").unwrap(), None);
        assert_eq!(PushFrame::parse("ERROR:badcode").unwrap(), None);
        assert_eq!(PushFrame::parse("DEBUG").unwrap(), None);
        assert_eq!(PushFrame::parse("").unwrap(), None);
    }

    #[test]
    fn client_connect_event() {
        assert_eq!(
            PushFrame::parse("EVENT:CLIENT_CONNECT").unwrap(),
            Some(PushFrame::Event(PeerEvent::ClientConnect))
        );
        assert_eq!(
            PushFrame::parse("EVENT:SOMETHING").unwrap(),
            Some(PushFrame::Event(PeerEvent::Other("SOMETHING".into())))
        );
    }

    #[test]
    fn debug_text_keeps_colons_in_payload() {
        assert_eq!(
            PushFrame::parse("DEBUG:TEXT:a:b: c").unwrap(),
            Some(PushFrame::Debug(DebugFrame::Text("a:b: c".into())))
        );
        assert_eq!(
            PushFrame::parse("DEBUG:TEXT:").unwrap(),
            Some(PushFrame::Debug(DebugFrame::Text(String::new())))
        );
    }

    #[test]
    fn debug_start_carries_target() {
        assert_eq!(
            PushFrame::parse("DEBUG:START:/main.lua").unwrap(),
            Some(PushFrame::Debug(DebugFrame::Start("/main.lua".into())))
        );
    }

    #[test]
    fn debug_stop_variants() {
        let stop = |frame: &str| match PushFrame::parse(frame).unwrap() {
            Some(PushFrame::Debug(DebugFrame::Stop(stop))) => stop,
            other => panic!("expected stop, got {:?}", other),
        };

        assert_eq!(
            stop("DEBUG:STOP:1"),
            DebugStop {
                success: true,
                reason: None
            }
        );
        assert_eq!(
            stop("DEBUG:STOP:0:RESOLVE_FAILED").reason,
            Some(StopReason::ResolveFailed)
        );
        assert_eq!(
            stop("DEBUG:STOP:0:ALREADY_ACTIVE").reason,
            Some(StopReason::AlreadyActive)
        );
        assert_eq!(stop("DEBUG:STOP:0:CLIENT_DC"), DebugStop::client_disconnected());
        assert_eq!(
            stop("DEBUG:STOP:0:lua error"),
            DebugStop {
                success: false,
                reason: Some(StopReason::Other("lua error".into()))
            }
        );
        assert_eq!(stop("DEBUG:STOP:0:").reason, None);
    }

    #[test]
    fn malformed_debug_frames_are_errors() {
        assert_eq!(
            PushFrame::parse("DEBUG:STOP:yes"),
            Err(FrameError::InvalidStopFlag("yes".into()))
        );
        assert_eq!(
            PushFrame::parse("DEBUG:PAUSE:now"),
            Err(FrameError::UnknownDebugVerb("PAUSE:now".into()))
        );
        assert_eq!(PushFrame::parse("DEBUG:"), Err(FrameError::Empty("DEBUG")));
    }

    #[test]
    fn session_messages() {
        assert_eq!(
            PushFrame::parse("SMESG:CLIENT_DC").unwrap(),
            Some(PushFrame::Session(SessionMessage::ClientDisconnected))
        );
        assert_eq!(
            PushFrame::parse("SMESG:HELLO").unwrap(),
            Some(PushFrame::Session(SessionMessage::Other("HELLO".into())))
        );
    }

    #[test]
    fn stop_reason_display_is_wire_token() {
        assert_eq!(StopReason::ClientDisconnected.to_string(), "CLIENT_DC");
        assert_eq!(StopReason::Other("boom".into()).to_string(), "boom");
    }
}
