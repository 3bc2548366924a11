// SPDX-License-Identifier: MIT OR Apache-2.0
//! Console state shared between the command loop and the clock driver.

use crate::library::LibraryFile;
use ledctl_sequencer::Player;
use parking_lot::Mutex;
use std::sync::Arc;

/// The single player, shared with the clock thread.
///
/// Every operation locks for its whole duration, so a `stop` racing a tick
/// is applied either entirely before or entirely after it.
pub type SharedPlayer = Arc<Mutex<Player>>;

/// Everything a console command can touch
pub struct ConsoleState {
    /// Active playback
    pub player: SharedPlayer,
    /// Sequence library; only the command loop uses it
    pub library: LibraryFile,
}

impl ConsoleState {
    /// Create state around an opened library
    pub fn new(library: LibraryFile) -> Self {
        Self {
            player: Arc::new(Mutex::new(Player::new())),
            library,
        }
    }
}
