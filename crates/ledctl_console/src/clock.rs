// SPDX-License-Identifier: MIT OR Apache-2.0
//! Clock driver that ticks the shared player.
//!
//! The player counts whole seconds. The driver wakes on a fixed period,
//! measures real elapsed time, and forwards only complete seconds; the
//! fraction carries over to the next wake-up so nothing is lost when
//! wake-ups are late or irregular.

use crate::state::SharedPlayer;
use ledctl_sequencer::TickOutcome;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Converts wall-clock durations into whole seconds
#[derive(Debug, Default)]
pub struct TickAccumulator {
    carry: Duration,
}

impl TickAccumulator {
    /// Create an empty accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Add elapsed time and take the whole seconds now available
    pub fn accumulate(&mut self, elapsed: Duration) -> u64 {
        let total = self.carry.saturating_add(elapsed);
        let secs = total.as_secs();
        self.carry = total - Duration::from_secs(secs);
        secs
    }
}

/// Background thread calling [`ledctl_sequencer::Player::tick`]
pub struct ClockDriver {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ClockDriver {
    /// Start ticking `player` every `interval`
    pub fn spawn(player: SharedPlayer, interval: Duration) -> std::io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = std::thread::Builder::new()
            .name("ledctl-clock".to_string())
            .spawn(move || clock_loop(&player, interval, &flag))?;

        tracing::debug!("Clock driver started ({:?} period)", interval);
        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Clock driver thread panicked");
            }
        }
    }
}

impl Drop for ClockDriver {
    fn drop(&mut self) {
        self.stop();
    }
}

fn clock_loop(player: &SharedPlayer, interval: Duration, running: &AtomicBool) {
    let mut accumulator = TickAccumulator::new();
    let mut last = Instant::now();

    while running.load(Ordering::Relaxed) {
        std::thread::sleep(interval);

        let now = Instant::now();
        let secs = accumulator.accumulate(now.duration_since(last));
        last = now;

        if secs > 0 {
            forward_tick(player, secs);
        }
    }
}

/// Apply one tick under the lock
pub fn forward_tick(player: &SharedPlayer, secs: u64) -> Option<TickOutcome> {
    let elapsed = i64::try_from(secs).unwrap_or(i64::MAX);
    let mut player = player.lock();
    match player.tick(elapsed) {
        Ok(outcome) => Some(outcome),
        Err(e) => {
            tracing::warn!("Tick rejected: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledctl_sequencer::{MemoryStore, PlaybackState, Player, Sequence, SequenceId, Step};
    use parking_lot::Mutex;

    #[test]
    fn test_accumulator_carries_fraction() {
        let mut acc = TickAccumulator::new();
        assert_eq!(acc.accumulate(Duration::from_millis(400)), 0);
        assert_eq!(acc.accumulate(Duration::from_millis(400)), 0);
        assert_eq!(acc.accumulate(Duration::from_millis(400)), 1);
        // 200 ms left over from the last call
        assert_eq!(acc.accumulate(Duration::from_millis(800)), 1);
    }

    #[test]
    fn test_accumulator_late_wakeup() {
        let mut acc = TickAccumulator::new();
        assert_eq!(acc.accumulate(Duration::from_millis(3_750)), 3);
        assert_eq!(acc.accumulate(Duration::from_millis(250)), 1);
        assert_eq!(acc.accumulate(Duration::from_millis(999)), 0);
    }

    #[test]
    fn test_forward_tick() {
        let store = MemoryStore::with_sequences([
            Sequence::steps("A", vec![Step::new("fade", 2), Step::new("solid", 2)], false).with_id("a"),
        ]);
        let player: SharedPlayer = Arc::new(Mutex::new(Player::new()));
        player.lock().play(&store, &SequenceId::from("a")).unwrap();

        assert_eq!(forward_tick(&player, 2), Some(TickOutcome::Advanced { count: 1 }));
        assert_eq!(forward_tick(&player, 2), Some(TickOutcome::Finished));
        assert_eq!(player.lock().state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_driver_stops() {
        let player: SharedPlayer = Arc::new(Mutex::new(Player::new()));
        let mut driver = ClockDriver::spawn(Arc::clone(&player), Duration::from_millis(5)).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        driver.stop();
        assert!(driver.handle.is_none());
    }
}
