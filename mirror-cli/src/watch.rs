//! Filesystem watcher adapter.
//!
//! Translates raw `notify` events under the mirrored root into
//! [`ChangeEvent`]s and appends them to the session's change queue from the
//! watcher's own thread.

use std::path::{Path, PathBuf};

use ccmirror_client::ChangeQueue;
use ccmirror_types::{relative_path, ChangeEvent, ChangeKind};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// Start watching `root` recursively.
///
/// Events stop when the returned watcher is dropped.
pub fn spawn(
    root: &Path,
    ignore_hidden: bool,
    queue: ChangeQueue,
) -> notify::Result<RecommendedWatcher> {
    let base = root.to_path_buf();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            for change in classify(&base, ignore_hidden, &event, probe) {
                queue.push(change);
            }
        }
        Err(e) => tracing::warn!("watch error: {}", e),
    })?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    Ok(watcher)
}

/// What is at `path` now: `None` if nothing, else whether it is a directory.
fn probe(path: &Path) -> Option<bool> {
    std::fs::symlink_metadata(path).ok().map(|m| m.is_dir())
}

/// Translate one raw event into change events relative to `root`.
///
/// `probe` resolves kinds the backend leaves unspecified.
pub fn classify(
    root: &Path,
    ignore_hidden: bool,
    event: &Event,
    probe: impl Fn(&Path) -> Option<bool>,
) -> Vec<ChangeEvent> {
    raw_changes(&event.kind, &event.paths, probe)
        .into_iter()
        .filter_map(|(path, kind)| {
            let relative = relative_path(root, path)?;
            if ignore_hidden && is_hidden(&relative) {
                return None;
            }
            Some(ChangeEvent::new(relative, kind))
        })
        .collect()
}

fn raw_changes<'a>(
    kind: &EventKind,
    paths: &'a [PathBuf],
    probe: impl Fn(&Path) -> Option<bool>,
) -> Vec<(&'a Path, ChangeKind)> {
    let created = |path: &Path| match probe(path) {
        Some(true) => ChangeKind::DirCreated,
        _ => ChangeKind::Created,
    };
    let each = |kind: ChangeKind| -> Vec<(&'a Path, ChangeKind)> {
        paths.iter().map(|p| (p.as_path(), kind)).collect()
    };

    match kind {
        EventKind::Create(CreateKind::Folder) => each(ChangeKind::DirCreated),
        EventKind::Create(CreateKind::File) => each(ChangeKind::Created),
        EventKind::Create(_) => paths.iter().map(|p| (p.as_path(), created(p))).collect(),

        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => each(ChangeKind::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.iter().map(|p| (p.as_path(), created(p))).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match paths {
            [from, to, ..] => vec![
                (from.as_path(), ChangeKind::Removed),
                (to.as_path(), created(to)),
            ],
            _ => Vec::new(),
        },
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .iter()
            .map(|p| match probe(p) {
                Some(true) => (p.as_path(), ChangeKind::DirCreated),
                Some(false) => (p.as_path(), ChangeKind::Created),
                None => (p.as_path(), ChangeKind::Removed),
            })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        // Data or unspecified modification: files only
        EventKind::Modify(_) => paths
            .iter()
            .filter(|p| probe(p) == Some(false))
            .map(|p| (p.as_path(), ChangeKind::Changed))
            .collect(),

        EventKind::Remove(RemoveKind::Folder) => each(ChangeKind::DirRemoved),
        EventKind::Remove(_) => each(ChangeKind::Removed),

        EventKind::Access(_) | EventKind::Any | EventKind::Other => Vec::new(),
    }
}

fn is_hidden(relative: &str) -> bool {
    relative.split('/').any(|part| part.starts_with('.'))
}
