//! `coach watch`: files on disk as editor documents.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use coach_bridge::{CoachBridge, DocumentSource};
use coach_core::DocumentId;
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task;
use tracing::{debug, info, warn};

/// A file whose contents are re-read each time an analysis fires.
#[derive(Clone, Debug)]
pub struct FileDocument {
    path: PathBuf,
}

impl FileDocument {
    /// Document backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl DocumentSource for FileDocument {
    async fn text(&self) -> String {
        let path = self.path.clone();
        let read = task::spawn_blocking(move || std::fs::read_to_string(path)).await;
        match read {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(path = %self.path.display(), error = %e, "failed to read document");
                String::new()
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "document read task failed");
                String::new()
            }
        }
    }

    fn label(&self) -> String {
        self.path.display().to_string()
    }
}

/// Open one session per file and feed filesystem events into the bridge
/// until Ctrl-C.
pub async fn run(bridge: &CoachBridge, files: &[PathBuf]) -> Result<()> {
    let mut documents: HashMap<PathBuf, DocumentId> = HashMap::new();
    let mut dirs: HashSet<PathBuf> = HashSet::new();

    for file in files {
        let path = std::fs::canonicalize(file)
            .with_context(|| format!("cannot watch {}", file.display()))?;
        if let Some(parent) = path.parent() {
            let _ = dirs.insert(parent.to_path_buf());
        }
        let id = bridge.open_document(Arc::new(FileDocument::new(&path)));
        let _ = documents.insert(path, id);
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        // receiver gone means we are shutting down
        let _ = tx.send(res);
    })
    .context("failed to create file watcher")?;
    for dir in &dirs {
        watcher
            .watch(dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", dir.display()))?;
    }
    info!(files = documents.len(), dirs = dirs.len(), "watching for changes");

    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                info!("shutting down");
                break;
            }
            event = rx.recv() => match event {
                Some(Ok(event)) => {
                    for id in changed_documents(&event, &documents) {
                        let _ = bridge.on_change(id);
                    }
                }
                Some(Err(err)) => warn!(error = %err, "file watcher error"),
                None => break,
            },
        }
    }

    drop(watcher);
    bridge.shutdown().await;
    Ok(())
}

/// Documents touched by a content-changing event.
pub fn changed_documents<'a>(
    event: &Event,
    documents: &'a HashMap<PathBuf, DocumentId>,
) -> Vec<&'a DocumentId> {
    if !is_content_change(&event.kind) {
        return Vec::new();
    }
    let mut ids: Vec<&DocumentId> = event
        .paths
        .iter()
        .filter_map(|path| lookup(documents, path))
        .collect();
    ids.dedup();
    if !ids.is_empty() {
        debug!(kind = ?event.kind, changed = ids.len(), "file change");
    }
    ids
}

// Editors save either in place (modify) or by renaming a temp file over the
// original (create / rename).
fn is_content_change(kind: &EventKind) -> bool {
    matches!(kind, EventKind::Create(_) | EventKind::Modify(_))
}

fn lookup<'a>(documents: &'a HashMap<PathBuf, DocumentId>, path: &Path) -> Option<&'a DocumentId> {
    documents.get(path).or_else(|| {
        let canonical = std::fs::canonicalize(path).ok()?;
        documents.get(&canonical)
    })
}
