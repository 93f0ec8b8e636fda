//! File content access.
//!
//! Content is read when an event is dispatched, not when it is observed, so
//! a replayed write carries the file as it is at replay time.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

/// Source of file text, keyed by root-relative path.
pub trait ContentSource: Send + Sync {
    /// Read the full text of `path`.
    fn read_text(&self, path: &str) -> io::Result<String>;
}

impl<C: ContentSource + ?Sized> ContentSource for Arc<C> {
    fn read_text(&self, path: &str) -> io::Result<String> {
        (**self).read_text(path)
    }
}

/// Reads files under a root directory.
#[derive(Debug, Clone)]
pub struct FsContentSource {
    root: PathBuf,
}

impl FsContentSource {
    /// Serve files under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ContentSource for FsContentSource {
    fn read_text(&self, path: &str) -> io::Result<String> {
        let full = path
            .split('/')
            .fold(self.root.clone(), |acc, part| acc.join(part));
        std::fs::read_to_string(full)
    }
}

/// In-memory content, for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryContentSource {
    files: Mutex<HashMap<String, String>>,
}

impl MemoryContentSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the text of `path`.
    pub fn insert(&self, path: &str, text: &str) {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path.to_string(), text.to_string());
    }

    /// Forget `path`; later reads fail with `NotFound`.
    pub fn remove(&self, path: &str) {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path);
    }
}

impl ContentSource for MemoryContentSource {
    fn read_text(&self, path: &str) -> io::Result<String> {
        self.files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.to_string()))
    }
}
