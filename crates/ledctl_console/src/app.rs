// SPDX-License-Identifier: MIT OR Apache-2.0
//! Console application loop.
//!
//! Commands arrive line by line from a stdin reader thread. Between lines the
//! loop drains the upload watcher, while the clock driver ticks the player on
//! its own thread.

use crate::clock::ClockDriver;
use crate::commands::{execute, ConsoleCommand, Reply};
use crate::library::{LibraryError, LibraryFile};
use crate::settings::{ConsoleSettings, SettingsError};
use crate::state::ConsoleState;
use crate::uploads::{pending_uploads, UploadEvent, UploadWatcher, UploadWatcherConfig};
use ledctl_sequencer::SequenceId;
use notify_debouncer_full::notify;
use std::io::BufRead;
use std::path::Path;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Duration;

/// How long the loop waits for a command before polling uploads
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors that stop the console
#[derive(Debug, thiserror::Error)]
pub enum ConsoleError {
    /// Settings could not be used
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// Library could not be opened
    #[error(transparent)]
    Library(#[from] LibraryError),

    /// Upload directory could not be watched
    #[error("Upload watcher failed: {0}")]
    Watch(#[from] notify::Error),

    /// Thread or directory setup failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Whether the loop keeps going after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// The running console
pub struct ConsoleApp {
    settings: ConsoleSettings,
    state: ConsoleState,
    uploads: Option<UploadWatcher>,
}

impl ConsoleApp {
    /// Open the library and start watching uploads
    pub fn new(settings: ConsoleSettings) -> Result<Self, ConsoleError> {
        settings.validate()?;
        let library = LibraryFile::open(&settings.library_path)?;
        let mut state = ConsoleState::new(library);

        let uploads = match &settings.upload_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                let mut watcher =
                    UploadWatcher::new(UploadWatcherConfig::with_debounce(settings.watch_debounce()))?;
                watcher.watch(dir)?;

                for path in pending_uploads(dir, watcher.config())? {
                    import_upload(&mut state, &path);
                }
                Some(watcher)
            }
            None => None,
        };

        tracing::info!(
            "Library {:?} holds {} sequence(s)",
            state.library.path(),
            state.library.len()
        );

        Ok(Self {
            settings,
            state,
            uploads,
        })
    }

    /// Run until `quit` or end of input
    pub fn run(mut self) -> Result<(), ConsoleError> {
        if let Some(id) = self.settings.autoplay.clone() {
            let id = SequenceId::from(id.as_str());
            let started = self.state.player.lock().play(&self.state.library, &id);
            match started {
                Ok(()) => tracing::info!("Autoplay started {}", id),
                Err(e) => tracing::warn!("Autoplay of {} failed: {}", id, e),
            }
        }

        let _clock = ClockDriver::spawn(Arc::clone(&self.state.player), self.settings.tick_interval())?;
        let lines = spawn_stdin_reader()?;

        println!("ledctl ready, type `help` for commands");
        loop {
            match lines.recv_timeout(POLL_INTERVAL) {
                Ok(line) => {
                    if self.handle_line(&line) == Flow::Quit {
                        break;
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    tracing::info!("Input closed");
                    break;
                }
            }
            self.poll_uploads();
        }

        self.state.player.lock().stop();
        tracing::info!("Console shutting down");
        Ok(())
    }

    fn handle_line(&mut self, line: &str) -> Flow {
        if line.trim().is_empty() {
            return Flow::Continue;
        }

        let result = line
            .parse::<ConsoleCommand>()
            .and_then(|command| execute(command, &mut self.state));

        match result {
            Ok(Reply::Text(text)) => {
                println!("{text}");
                Flow::Continue
            }
            Ok(Reply::Quit) => Flow::Quit,
            Err(e) => {
                tracing::warn!("Command `{}` failed: {}", line.trim(), e);
                println!("error: {e}");
                Flow::Continue
            }
        }
    }

    fn poll_uploads(&mut self) {
        let Some(watcher) = &self.uploads else {
            return;
        };

        for event in watcher.poll_events() {
            match event {
                UploadEvent::Arrived(path) => import_upload(&mut self.state, &path),
                UploadEvent::Removed(path) => {
                    tracing::info!("Upload {:?} removed; library entry kept", path);
                }
                UploadEvent::Error(e) => tracing::warn!("Upload watcher error: {}", e),
            }
        }
    }
}

fn import_upload(state: &mut ConsoleState, path: &Path) {
    if !path.is_file() {
        return;
    }
    match state.library.import_binary(path) {
        Ok(id) => println!("imported {id}"),
        Err(e) => tracing::warn!("Upload not imported: {}", e),
    }
}

fn spawn_stdin_reader() -> std::io::Result<Receiver<String>> {
    let (tx, rx) = mpsc::channel();
    std::thread::Builder::new()
        .name("ledctl-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                if tx.send(line).is_err() {
                    break;
                }
            }
        })?;
    Ok(rx)
}
