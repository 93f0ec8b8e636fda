//! Operator command grammar.
//!
//! - `d <target...>` starts a debug session; arguments are joined by single spaces
//! - `dc` ends the session and exits

/// A parsed operator command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalCommand {
    /// Start a debug session.
    Debug {
        /// Joined argument text.
        target: String,
    },
    /// Send `DISCONNECT` and exit.
    EndSession,
    /// Blank line.
    Empty,
    /// Anything else, verbatim.
    Unknown(String),
}

impl LocalCommand {
    /// Parse one input line.
    pub fn parse(line: &str) -> Self {
        let mut words = line.split_whitespace();
        match words.next() {
            None => Self::Empty,
            Some("dc") if words.clone().next().is_none() => Self::EndSession,
            Some("d") => {
                let target = words.collect::<Vec<_>>().join(" ");
                if target.is_empty() {
                    Self::Unknown(line.trim().to_string())
                } else {
                    Self::Debug { target }
                }
            }
            Some(_) => Self::Unknown(line.trim().to_string()),
        }
    }
}
