// SPDX-License-Identifier: MIT OR Apache-2.0
//! `ledctl` - LED controller sequence console
//!
//! Plays effect-step and binary sequences from a RON library:
//! - Line commands on stdin
//! - Real-time clock driving playback
//! - Upload directory watched for new sequence files
//!
//! Usage: `ledctl [settings.ron]`

mod app;
mod clock;
mod commands;
mod library;
mod settings;
mod state;
mod uploads;

use app::ConsoleApp;
use settings::{ConsoleSettings, SETTINGS_FILE_NAME};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let settings_path = std::env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from(SETTINGS_FILE_NAME), PathBuf::from);
    let loaded = ConsoleSettings::load_or_default(&settings_path);

    // RUST_LOG wins over the directive in the settings file
    let default_filter = match &loaded {
        Ok(settings) => settings.log_filter.clone(),
        Err(_) => ConsoleSettings::default().log_filter,
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting ledctl v{}", env!("CARGO_PKG_VERSION"));

    let mut settings = match loaded {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Cannot load settings {:?}: {e}", settings_path);
            std::process::exit(1);
        }
    };

    if !settings_path.exists() {
        match settings.save(&settings_path) {
            Ok(()) => tracing::info!("Wrote default settings to {:?}", settings_path),
            Err(e) => tracing::warn!("Could not write default settings: {e}"),
        }
    }

    let base_dir = settings_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    settings.resolve_paths(base_dir);

    if let Err(e) = ConsoleApp::new(settings).and_then(ConsoleApp::run) {
        tracing::error!("Console stopped: {e}");
        std::process::exit(1);
    }
}
