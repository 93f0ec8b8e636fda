//! Error types for ccmirror frames.

use thiserror::Error;

/// Errors raised while decoding inbound push frames.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// A `DEBUG:` frame with a sub-verb we do not understand.
    #[error("unknown debug sub-frame: {0}")]
    UnknownDebugVerb(String),

    /// A `DEBUG:STOP` frame whose success flag is neither `0` nor `1`.
    #[error("invalid debug stop flag: {0:?}")]
    InvalidStopFlag(String),

    /// A push prefix with nothing after it.
    #[error("empty {0} frame")]
    Empty(&'static str),
}
