//! Filesystem change events.
//!
//! A [`ChangeEvent`] names a root-relative path and what happened to it.
//! It deliberately carries no file content: content is read at dispatch
//! time, so the peer always receives whatever is on disk when the command
//! is actually transmitted.

use std::fmt;
use std::path::{Component, Path};

/// What happened to a path under the watched root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A file was created.
    Created,
    /// A file's content changed.
    Changed,
    /// A file was removed.
    Removed,
    /// A directory was created.
    DirCreated,
    /// A directory was removed.
    DirRemoved,
}

impl ChangeKind {
    /// Whether the wire command for this kind carries the file's content.
    pub fn carries_content(self) -> bool {
        matches!(self, Self::Created | Self::Changed)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "add",
            Self::Changed => "change",
            Self::Removed => "unlink",
            Self::DirCreated => "addDir",
            Self::DirRemoved => "unlinkDir",
        };
        f.write_str(name)
    }
}

/// A single change waiting to be mirrored to the peer.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    /// Root-relative path, `/`-separated, without a leading separator.
    pub path: String,
    /// What happened to the path.
    pub kind: ChangeKind,
}

impl ChangeEvent {
    /// Create a new change event.
    pub fn new(path: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

impl fmt::Display for ChangeEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.path)
    }
}

/// Express `path` relative to `root` in wire form.
///
/// Returns `None` when `path` is not strictly inside `root`.
pub fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rest = path.strip_prefix(root).ok()?;
    let mut parts = Vec::new();
    for component in rest.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => return None,
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn only_file_writes_carry_content() {
        assert!(ChangeKind::Created.carries_content());
        assert!(ChangeKind::Changed.carries_content());
        assert!(!ChangeKind::Removed.carries_content());
        assert!(!ChangeKind::DirCreated.carries_content());
        assert!(!ChangeKind::DirRemoved.carries_content());
    }

    #[test]
    fn event_display_matches_trace_format() {
        let event = ChangeEvent::new("src/main.lua", ChangeKind::DirCreated);
        assert_eq!(event.to_string(), "[addDir] src/main.lua");
    }

    #[test]
    fn relative_path_strips_root() {
        let root = PathBuf::from("/home/op/project");
        let path = root.join("lib").join("util.lua");

        assert_eq!(relative_path(&root, &path), Some("lib/util.lua".into()));
    }

    #[test]
    fn relative_path_rejects_outside_and_root_itself() {
        let root = PathBuf::from("/home/op/project");

        assert_eq!(relative_path(&root, Path::new("/etc/passwd")), None);
        assert_eq!(relative_path(&root, &root), None);
    }
}
