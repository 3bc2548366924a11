// SPDX-License-Identifier: MIT OR Apache-2.0
//! Upload directory watcher.
//!
//! Binary sequence files dropped into the upload directory are reported as
//! debounced events so the console can import them once the write settles.

use notify_debouncer_full::{
    new_debouncer,
    notify::{self, EventKind, RecommendedWatcher, RecursiveMode},
    DebounceEventResult, Debouncer, RecommendedCache,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::time::Duration;

/// Events emitted by the upload watcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// A sequence file was created or rewritten
    Arrived(PathBuf),
    /// A sequence file was deleted
    Removed(PathBuf),
    /// The watcher reported an error
    Error(String),
}

/// Configuration for the upload watcher
#[derive(Debug, Clone)]
pub struct UploadWatcherConfig {
    /// Debounce duration for events
    pub debounce_duration: Duration,
    /// File extensions treated as sequence files, lowercase
    pub extensions: HashSet<String>,
}

impl Default for UploadWatcherConfig {
    fn default() -> Self {
        Self {
            debounce_duration: Duration::from_millis(500),
            extensions: ["pseq", "fseq"].into_iter().map(String::from).collect(),
        }
    }
}

impl UploadWatcherConfig {
    /// Default extensions with a custom debounce
    pub fn with_debounce(debounce_duration: Duration) -> Self {
        Self {
            debounce_duration,
            ..Self::default()
        }
    }

    /// Whether `path` has one of the watched extensions
    pub fn is_sequence_file(&self, path: &Path) -> bool {
        has_extension(&self.extensions, path)
    }
}

fn has_extension(extensions: &HashSet<String>, path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.contains(&e.to_lowercase()))
        .unwrap_or(false)
}

/// Debounced watcher over one upload directory
pub struct UploadWatcher {
    watcher: Debouncer<RecommendedWatcher, RecommendedCache>,
    event_rx: Receiver<UploadEvent>,
    config: UploadWatcherConfig,
}

impl UploadWatcher {
    /// Create a watcher; nothing is watched until [`UploadWatcher::watch`]
    pub fn new(config: UploadWatcherConfig) -> Result<Self, notify::Error> {
        let (event_tx, event_rx) = mpsc::channel();
        let extensions = config.extensions.clone();

        let watcher = new_debouncer(
            config.debounce_duration,
            None,
            move |result: DebounceEventResult| match result {
                Ok(events) => {
                    for event in events {
                        let paths = event
                            .paths
                            .iter()
                            .filter(|p| has_extension(&extensions, p))
                            .cloned();

                        match event.kind {
                            EventKind::Create(_) | EventKind::Modify(_) => {
                                for path in paths {
                                    let _ = event_tx.send(UploadEvent::Arrived(path));
                                }
                            }
                            EventKind::Remove(_) => {
                                for path in paths {
                                    let _ = event_tx.send(UploadEvent::Removed(path));
                                }
                            }
                            EventKind::Any | EventKind::Access(_) | EventKind::Other => {}
                        }
                    }
                }
                Err(errors) => {
                    for error in errors {
                        let _ = event_tx.send(UploadEvent::Error(error.to_string()));
                    }
                }
            },
        )?;

        Ok(Self {
            watcher,
            event_rx,
            config,
        })
    }

    /// Start watching `dir` (not recursive)
    pub fn watch(&mut self, dir: &Path) -> Result<(), notify::Error> {
        self.watcher.watch(dir, RecursiveMode::NonRecursive)?;
        tracing::info!("Watching {:?} for uploads", dir);
        Ok(())
    }

    /// Drain pending events without blocking.
    ///
    /// A file touched several times inside one poll is reported once.
    pub fn poll_events(&self) -> Vec<UploadEvent> {
        let mut events: Vec<UploadEvent> = Vec::new();
        loop {
            match self.event_rx.try_recv() {
                Ok(event) => {
                    if !events.contains(&event) {
                        events.push(event);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("Upload watcher channel disconnected");
                    break;
                }
            }
        }
        events
    }

    /// Watcher configuration
    pub fn config(&self) -> &UploadWatcherConfig {
        &self.config
    }
}

/// Sequence files already sitting in `dir`, sorted by path
pub fn pending_uploads(dir: &Path, config: &UploadWatcherConfig) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && config.is_sequence_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}
