// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playback state machine.
//!
//! A [`Player`] owns at most one [`PlaybackSession`]. There is no session
//! while stopped; `play` creates one, `stop` (or the natural end of a
//! non-looping timeline) discards it.
//!
//! ```text
//!            play                pause
//! Stopped ---------> Playing <----------> Paused
//!    ^                  |        resume     |
//!    +------------------+-------------------+
//!          stop / end of timeline
//! ```
//!
//! The player never owns a timer. A clock driver calls [`Player::tick`] with
//! however many seconds passed; large or irregular values are fine.

use crate::sequence::{SequenceId, SequenceKind, SequenceType};
use crate::store::{SequenceStore, StoreError};
use serde::{Deserialize, Serialize};

/// Errors reported by playback operations.
///
/// An operation that fails leaves the session exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    /// Operation needs a playing session
    #[error("playback is not running")]
    NotPlaying,

    /// Operation needs a paused session
    #[error("playback is not paused")]
    NotPaused,

    /// Operation needs a loaded sequence
    #[error("no sequence is loaded")]
    NoActiveSession,

    /// The store has no sequence with this ID
    #[error("sequence not found: {0}")]
    SequenceNotFound(SequenceId),

    /// Step navigation on a binary timeline
    #[error("{operation} is not supported for binary sequences")]
    UnsupportedForBinarySequence {
        /// The rejected operation
        operation: &'static str,
    },

    /// Caller passed a negative index or time
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Step sequence without steps
    #[error("sequence {0} has no steps")]
    EmptySequence(SequenceId),

    /// The sequence store failed
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    /// No session
    #[default]
    Stopped,
    /// Time is advancing
    Playing,
    /// Time is frozen
    Paused,
}

impl PlaybackState {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
        }
    }
}

/// Snapshot of the active playback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackSession {
    /// Loaded sequence
    pub sequence_id: SequenceId,
    /// Type of the loaded sequence
    pub sequence_type: SequenceType,
    /// Index of the current step; always 0 for binary sequences
    pub current_step_index: usize,
    /// Number of steps; 0 for binary sequences
    pub step_count: usize,
    /// Playing or paused
    pub state: PlaybackState,
    /// Time left in the current step, or in the whole binary timeline
    pub remaining_time_seconds: u64,
    /// Time played since the session started
    pub total_elapsed_seconds: u64,
}

/// What a tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing is playing
    Idle,
    /// Time advanced within the current step
    Running,
    /// Moved on this many times: steps for a step sequence, restarts for a
    /// looping binary timeline
    Advanced {
        /// Number of advances
        count: u64,
    },
    /// The timeline ended and the session was discarded
    Finished,
}

/// Timing facts copied from the sequence when playback starts
#[derive(Debug, Clone)]
enum Timeline {
    Steps {
        durations: Vec<u32>,
        looping: bool,
        /// Length of one pass, manual steps counting 0
        cycle: u64,
        has_manual: bool,
    },
    Binary { duration: u64, looping: bool },
}

#[derive(Debug, Clone)]
struct ActiveSession {
    session: PlaybackSession,
    timeline: Timeline,
}

/// Owner of the single playback session
#[derive(Debug, Default)]
pub struct Player {
    active: Option<ActiveSession>,
}

impl Player {
    /// Create a stopped player
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> PlaybackState {
        self.active
            .as_ref()
            .map_or(PlaybackState::Stopped, |a| a.session.state)
    }

    /// Snapshot of the active session, if any
    pub fn session(&self) -> Option<&PlaybackSession> {
        self.active.as_ref().map(|a| &a.session)
    }

    /// ID of the loaded sequence, if any
    pub fn loaded_sequence_id(&self) -> Option<&SequenceId> {
        self.session().map(|s| &s.sequence_id)
    }

    /// Start a sequence from its first step
    pub fn play<S>(&mut self, store: &S, id: &SequenceId) -> Result<()>
    where
        S: SequenceStore + ?Sized,
    {
        self.play_from(store, id, 0)
    }

    /// Start a sequence from the given step.
    ///
    /// Replaces whatever was playing. The index is clamped to the last step;
    /// binary sequences always start at 0.
    pub fn play_from<S>(&mut self, store: &S, id: &SequenceId, from_step: i64) -> Result<()>
    where
        S: SequenceStore + ?Sized,
    {
        if from_step < 0 {
            return Err(PlaybackError::InvalidArgument(format!(
                "step index must not be negative, got {from_step}"
            )));
        }

        let sequence = store
            .get_sequence(id)?
            .ok_or_else(|| PlaybackError::SequenceNotFound(id.clone()))?;

        let (timeline, index, remaining, step_count) = match sequence.kind() {
            SequenceKind::Steps(body) => {
                if body.steps.is_empty() {
                    return Err(PlaybackError::EmptySequence(id.clone()));
                }
                let last = body.steps.len() - 1;
                let index = usize::try_from(from_step).unwrap_or(usize::MAX).min(last);
                let durations: Vec<u32> = body.steps.iter().map(|s| s.duration_secs).collect();
                let remaining = u64::from(durations[index]);
                (
                    Timeline::Steps {
                        durations,
                        looping: body.looping,
                        cycle: body.cycle_duration(),
                        has_manual: body.has_manual_steps(),
                    },
                    index,
                    remaining,
                    body.steps.len(),
                )
            }
            SequenceKind::Binary(body) => {
                let duration = u64::from(body.metadata.duration_secs());
                (
                    Timeline::Binary { duration, looping: body.is_looping() },
                    0,
                    duration,
                    0,
                )
            }
        };

        if let Some(previous) = self.active.take() {
            tracing::debug!("Replacing playback of {}", previous.session.sequence_id);
        }

        tracing::info!(
            "Playing sequence {} ({}) from step {}",
            id,
            sequence.sequence_type().name(),
            index
        );

        self.active = Some(ActiveSession {
            session: PlaybackSession {
                sequence_id: id.clone(),
                sequence_type: sequence.sequence_type(),
                current_step_index: index,
                step_count,
                state: PlaybackState::Playing,
                remaining_time_seconds: remaining,
                total_elapsed_seconds: 0,
            },
            timeline,
        });
        Ok(())
    }

    /// Freeze playback
    pub fn pause(&mut self) -> Result<()> {
        match self.active.as_mut() {
            Some(active) if active.session.state == PlaybackState::Playing => {
                active.session.state = PlaybackState::Paused;
                tracing::info!("Paused sequence {}", active.session.sequence_id);
                Ok(())
            }
            _ => Err(PlaybackError::NotPlaying),
        }
    }

    /// Continue paused playback
    pub fn resume(&mut self) -> Result<()> {
        match self.active.as_mut() {
            Some(active) if active.session.state == PlaybackState::Paused => {
                active.session.state = PlaybackState::Playing;
                tracing::info!("Resumed sequence {}", active.session.sequence_id);
                Ok(())
            }
            _ => Err(PlaybackError::NotPaused),
        }
    }

    /// Discard the session. Stopping while stopped is fine.
    pub fn stop(&mut self) -> Option<PlaybackSession> {
        let previous = self.active.take().map(|a| a.session);
        if let Some(session) = &previous {
            tracing::info!("Stopped sequence {}", session.sequence_id);
        }
        previous
    }

    /// Advance the clock by `elapsed_secs`.
    ///
    /// Does nothing unless playing. Time left over after a step expires
    /// carries into the following steps, so one long tick can advance
    /// several times.
    pub fn tick(&mut self, elapsed_secs: i64) -> Result<TickOutcome> {
        let elapsed = u64::try_from(elapsed_secs).map_err(|_| {
            PlaybackError::InvalidArgument(format!(
                "elapsed time must not be negative, got {elapsed_secs}"
            ))
        })?;

        let Some(active) = self.active.as_mut() else {
            return Ok(TickOutcome::Idle);
        };
        if active.session.state != PlaybackState::Playing {
            return Ok(TickOutcome::Idle);
        }

        let session = &mut active.session;
        session.total_elapsed_seconds = session.total_elapsed_seconds.saturating_add(elapsed);

        let outcome = match &active.timeline {
            Timeline::Steps {
                durations,
                looping,
                cycle,
                has_manual,
            } => advance_steps(session, durations, *looping, *cycle, *has_manual, elapsed),
            Timeline::Binary { duration, looping } => {
                advance_binary(session, *duration, *looping, elapsed)
            }
        };

        match outcome {
            TickOutcome::Finished => {
                tracing::info!("Sequence {} finished", session.sequence_id);
                self.active = None;
            }
            TickOutcome::Advanced { count } => {
                tracing::debug!(
                    "Sequence {} advanced {} time(s), now at step {}",
                    session.sequence_id,
                    count,
                    session.current_step_index
                );
            }
            TickOutcome::Idle | TickOutcome::Running => {}
        }

        Ok(outcome)
    }

    /// Jump to the next step, wrapping after the last.
    ///
    /// Wraps regardless of the loop flag and keeps the current state.
    pub fn next_step(&mut self) -> Result<()> {
        self.navigate("next_step", |index, len| (index + 1) % len)
    }

    /// Jump to the previous step, wrapping before the first
    pub fn previous_step(&mut self) -> Result<()> {
        self.navigate("previous_step", |index, len| (index + len - 1) % len)
    }

    fn navigate(&mut self, operation: &'static str, target: impl Fn(usize, usize) -> usize) -> Result<()> {
        let active = self.active.as_mut().ok_or(PlaybackError::NoActiveSession)?;

        let Timeline::Steps { durations, .. } = &active.timeline else {
            return Err(PlaybackError::UnsupportedForBinarySequence { operation });
        };

        let index = target(active.session.current_step_index, durations.len());
        active.session.current_step_index = index;
        active.session.remaining_time_seconds = u64::from(durations[index]);
        tracing::debug!(
            "Moved sequence {} to step {}",
            active.session.sequence_id,
            index
        );
        Ok(())
    }
}

fn advance_steps(
    session: &mut PlaybackSession,
    durations: &[u32],
    looping: bool,
    cycle: u64,
    has_manual: bool,
    elapsed: u64,
) -> TickOutcome {
    let len = durations.len();

    let mut budget = elapsed;
    let mut advanced = 0u64;

    loop {
        let index = session.current_step_index;
        if durations[index] == 0 {
            // Manual step: waits for navigation
            session.remaining_time_seconds = 0;
            break;
        }

        if budget < session.remaining_time_seconds {
            session.remaining_time_seconds -= budget;
            break;
        }
        budget -= session.remaining_time_seconds;

        let next = index + 1;
        if next < len {
            session.current_step_index = next;
        } else if looping {
            session.current_step_index = 0;
            if !has_manual && budget >= cycle {
                // Whole cycles land back on step 0 with its full duration
                advanced = advanced.saturating_add((budget / cycle).saturating_mul(len as u64));
                budget %= cycle;
            }
        } else {
            session.remaining_time_seconds = 0;
            return TickOutcome::Finished;
        }

        session.remaining_time_seconds = u64::from(durations[session.current_step_index]);
        advanced = advanced.saturating_add(1);
    }

    if advanced == 0 {
        TickOutcome::Running
    } else {
        TickOutcome::Advanced { count: advanced }
    }
}

fn advance_binary(session: &mut PlaybackSession, duration: u64, looping: bool, elapsed: u64) -> TickOutcome {
    if elapsed < session.remaining_time_seconds {
        session.remaining_time_seconds -= elapsed;
        return TickOutcome::Running;
    }

    let overshoot = elapsed - session.remaining_time_seconds;
    session.remaining_time_seconds = 0;

    if !looping {
        return TickOutcome::Finished;
    }
    if duration == 0 {
        // Nothing to restart into
        return TickOutcome::Running;
    }

    session.remaining_time_seconds = duration - overshoot % duration;
    TickOutcome::Advanced {
        count: 1 + overshoot / duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::{encode_header, parse_binary_sequence};
    use crate::sequence::{BinarySequence, Sequence};
    use crate::step::Step;
    use crate::store::MemoryStore;

    fn steps(id: &str, durations: &[u32], looping: bool) -> Sequence {
        let steps = durations
            .iter()
            .enumerate()
            .map(|(i, &d)| Step::new(format!("effect-{i}"), d))
            .collect();
        Sequence::steps(id, steps, looping).with_id(id)
    }

    fn binary(id: &str, frames: u32, step_ms: u8, looping: Option<bool>) -> Sequence {
        let meta = parse_binary_sequence(&encode_header(512, frames, step_ms)).unwrap();
        let mut body = BinarySequence::new(format!("{id}.pseq"), meta);
        body.looping = looping;
        Sequence::binary(id, body).with_id(id)
    }

    fn store() -> MemoryStore {
        MemoryStore::with_sequences([
            steps("seq-1", &[10, 5, 0], false),
            steps("loop", &[3, 4, 5], true),
            steps("once", &[2, 2], false),
            steps("manual-loop", &[2, 0, 3], true),
            steps("empty", &[], true),
            // 7200 frames at 25 ms = 180 s
            binary("show", 7200, 25, None),
            binary("show-loop", 400, 25, Some(true)),
            // 10 frames at 25 ms rounds to 0 s
            binary("blip", 10, 25, Some(true)),
        ])
    }

    fn id(raw: &str) -> SequenceId {
        SequenceId::from(raw)
    }

    fn session(player: &Player) -> &PlaybackSession {
        player.session().expect("session should be active")
    }

    #[test]
    fn test_initial_state() {
        let player = Player::new();
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert!(player.session().is_none());
    }

    #[test]
    fn test_play_initializes_session() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("seq-1")).unwrap();

        let s = session(&player);
        assert_eq!(s.sequence_id, id("seq-1"));
        assert_eq!(s.sequence_type, SequenceType::Steps);
        assert_eq!(s.current_step_index, 0);
        assert_eq!(s.step_count, 3);
        assert_eq!(s.state, PlaybackState::Playing);
        assert_eq!(s.remaining_time_seconds, 10);
        assert_eq!(s.total_elapsed_seconds, 0);
    }

    #[test]
    fn test_play_from_clamps_index() {
        let store = store();
        let mut player = Player::new();

        player.play_from(&store, &id("seq-1"), 1).unwrap();
        assert_eq!(session(&player).current_step_index, 1);
        assert_eq!(session(&player).remaining_time_seconds, 5);

        player.play_from(&store, &id("seq-1"), 99).unwrap();
        assert_eq!(session(&player).current_step_index, 2);
        assert_eq!(session(&player).remaining_time_seconds, 0);
    }

    #[test]
    fn test_play_binary_ignores_start_step() {
        let store = store();
        let mut player = Player::new();
        player.play_from(&store, &id("show"), 4).unwrap();

        let s = session(&player);
        assert_eq!(s.sequence_type, SequenceType::Binary);
        assert_eq!(s.current_step_index, 0);
        assert_eq!(s.remaining_time_seconds, 180);
    }

    #[test]
    fn test_play_errors_keep_current_session() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("loop")).unwrap();
        player.tick(1).unwrap();
        let before = session(&player).clone();

        assert_eq!(
            player.play(&store, &id("nope")),
            Err(PlaybackError::SequenceNotFound(id("nope")))
        );
        assert_eq!(
            player.play(&store, &id("empty")),
            Err(PlaybackError::EmptySequence(id("empty")))
        );
        assert!(matches!(
            player.play_from(&store, &id("seq-1"), -1),
            Err(PlaybackError::InvalidArgument(_))
        ));

        assert_eq!(session(&player), &before);
    }

    #[test]
    fn test_play_replaces_session() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("seq-1")).unwrap();
        player.tick(4).unwrap();
        player.pause().unwrap();

        player.play(&store, &id("show")).unwrap();
        let s = session(&player);
        assert_eq!(s.sequence_id, id("show"));
        assert_eq!(s.state, PlaybackState::Playing);
        assert_eq!(s.total_elapsed_seconds, 0);
    }

    #[test]
    fn test_pause_and_resume() {
        let store = store();
        let mut player = Player::new();

        assert_eq!(player.pause(), Err(PlaybackError::NotPlaying));
        assert_eq!(player.resume(), Err(PlaybackError::NotPaused));

        player.play(&store, &id("seq-1")).unwrap();
        assert_eq!(player.resume(), Err(PlaybackError::NotPaused));

        player.tick(3).unwrap();
        player.pause().unwrap();
        assert_eq!(player.state(), PlaybackState::Paused);
        assert_eq!(player.pause(), Err(PlaybackError::NotPlaying));

        // Time is frozen while paused
        assert_eq!(player.tick(50).unwrap(), TickOutcome::Idle);
        assert_eq!(session(&player).remaining_time_seconds, 7);
        assert_eq!(session(&player).total_elapsed_seconds, 3);

        player.resume().unwrap();
        player.tick(2).unwrap();
        assert_eq!(session(&player).remaining_time_seconds, 5);
        assert_eq!(session(&player).total_elapsed_seconds, 5);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let store = store();
        let mut player = Player::new();
        assert!(player.stop().is_none());

        player.play(&store, &id("seq-1")).unwrap();
        let stopped = player.stop().unwrap();
        assert_eq!(stopped.sequence_id, id("seq-1"));
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert!(player.stop().is_none());
    }

    #[test]
    fn test_tick_while_stopped() {
        let mut player = Player::new();
        assert_eq!(player.tick(5).unwrap(), TickOutcome::Idle);
        assert!(player.session().is_none());
    }

    #[test]
    fn test_negative_tick_rejected() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("seq-1")).unwrap();

        assert!(matches!(player.tick(-1), Err(PlaybackError::InvalidArgument(_))));
        assert_eq!(session(&player).remaining_time_seconds, 10);
        assert_eq!(session(&player).total_elapsed_seconds, 0);
    }

    #[test]
    fn test_scenario_with_manual_last_step() {
        let store = store();
        let mut player = Player::new();
        player.play_from(&store, &id("seq-1"), 0).unwrap();

        assert_eq!(player.tick(10).unwrap(), TickOutcome::Advanced { count: 1 });
        assert_eq!(session(&player).current_step_index, 1);
        assert_eq!(session(&player).remaining_time_seconds, 5);

        player.tick(5).unwrap();
        assert_eq!(session(&player).current_step_index, 2);
        assert_eq!(session(&player).remaining_time_seconds, 0);

        let before = session(&player).total_elapsed_seconds;
        assert_eq!(player.tick(100).unwrap(), TickOutcome::Running);
        assert_eq!(session(&player).current_step_index, 2);
        assert_eq!(session(&player).total_elapsed_seconds, before + 100);
        assert_eq!(player.state(), PlaybackState::Playing);
    }

    #[test]
    fn test_manual_step_only_leaves_by_navigation() {
        let store = store();
        let mut player = Player::new();
        player.play_from(&store, &id("manual-loop"), 1).unwrap();

        for elapsed in [1, 7, 1000] {
            player.tick(elapsed).unwrap();
            assert_eq!(session(&player).current_step_index, 1);
            assert_eq!(session(&player).remaining_time_seconds, 0);
        }

        player.next_step().unwrap();
        assert_eq!(session(&player).current_step_index, 2);
        assert_eq!(session(&player).remaining_time_seconds, 3);
    }

    #[test]
    fn test_long_tick_stops_at_manual_step() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("manual-loop")).unwrap();

        assert_eq!(player.tick(500).unwrap(), TickOutcome::Advanced { count: 1 });
        assert_eq!(session(&player).current_step_index, 1);
        assert_eq!(session(&player).total_elapsed_seconds, 500);
    }

    #[test]
    fn test_loop_returns_to_first_step() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("loop")).unwrap();

        // 3 + 4 + 5
        assert_eq!(player.tick(12).unwrap(), TickOutcome::Advanced { count: 3 });
        let s = session(&player);
        assert_eq!(s.current_step_index, 0);
        assert_eq!(s.remaining_time_seconds, 3);
        assert_eq!(s.state, PlaybackState::Playing);
    }

    #[test]
    fn test_loop_carries_leftover_time() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("loop")).unwrap();

        player.tick(2).unwrap();
        // 1 left in step 0, then 4 in step 1, then 2 of step 2
        player.tick(7).unwrap();
        assert_eq!(session(&player).current_step_index, 2);
        assert_eq!(session(&player).remaining_time_seconds, 3);
    }

    #[test]
    fn test_loop_skips_whole_cycles() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("loop")).unwrap();

        // One cycle, 1000 more, then 1 second into step 0
        let elapsed = 3 + 4 + 5 + 12 * 1000 + 1;
        player.tick(elapsed).unwrap();

        let s = session(&player);
        assert_eq!(s.current_step_index, 0);
        assert_eq!(s.remaining_time_seconds, 2);
        assert_eq!(s.total_elapsed_seconds, elapsed as u64);
    }

    #[test]
    fn test_loop_skips_cycles_from_middle_step() {
        let store = store();
        let mut player = Player::new();
        player.play_from(&store, &id("loop"), 1).unwrap();

        // Finish steps 1 and 2, ten whole cycles, then 2 seconds into step 0
        let outcome = player.tick(4 + 5 + 12 * 10 + 2).unwrap();
        assert_eq!(outcome, TickOutcome::Advanced { count: 32 });

        let s = session(&player);
        assert_eq!(s.current_step_index, 0);
        assert_eq!(s.remaining_time_seconds, 1);
    }

    #[test]
    fn test_huge_tick_terminates() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("loop")).unwrap();

        assert!(matches!(player.tick(i64::MAX).unwrap(), TickOutcome::Advanced { .. }));
        assert_eq!(session(&player).total_elapsed_seconds, i64::MAX as u64);
    }

    #[test]
    fn test_no_loop_finishes() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("once")).unwrap();

        player.tick(2).unwrap();
        assert_eq!(session(&player).current_step_index, 1);

        assert_eq!(player.tick(2).unwrap(), TickOutcome::Finished);
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert!(player.session().is_none());
    }

    #[test]
    fn test_no_loop_finishes_in_one_long_tick() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("once")).unwrap();

        assert_eq!(player.tick(60).unwrap(), TickOutcome::Finished);
        assert_eq!(player.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_monotonic_time() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("loop")).unwrap();

        // Deterministic irregular schedule
        let mut seed = 0x2545_f491_u32;
        let mut last_total = 0;
        for _ in 0..500 {
            seed ^= seed << 13;
            seed ^= seed >> 17;
            seed ^= seed << 5;
            let elapsed = i64::from(seed % 9);

            let before_remaining = session(&player).remaining_time_seconds;
            let before_index = session(&player).current_step_index;
            player.tick(elapsed).unwrap();

            let s = session(&player);
            assert!(s.total_elapsed_seconds >= last_total);
            if s.current_step_index == before_index && elapsed < before_remaining as i64 {
                assert!(s.remaining_time_seconds <= before_remaining);
            }
            last_total = s.total_elapsed_seconds;
        }
    }

    #[test]
    fn test_navigation_wraps_without_loop_flag() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("seq-1")).unwrap();

        player.previous_step().unwrap();
        assert_eq!(session(&player).current_step_index, 2);
        assert_eq!(session(&player).remaining_time_seconds, 0);

        player.next_step().unwrap();
        assert_eq!(session(&player).current_step_index, 0);
        assert_eq!(session(&player).remaining_time_seconds, 10);

        player.next_step().unwrap();
        assert_eq!(session(&player).current_step_index, 1);
        assert_eq!(session(&player).remaining_time_seconds, 5);
    }

    #[test]
    fn test_navigation_keeps_pause() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("loop")).unwrap();
        player.tick(1).unwrap();
        player.pause().unwrap();

        player.next_step().unwrap();
        let s = session(&player);
        assert_eq!(s.state, PlaybackState::Paused);
        assert_eq!(s.current_step_index, 1);
        assert_eq!(s.remaining_time_seconds, 4);
        assert_eq!(s.total_elapsed_seconds, 1);
    }

    #[test]
    fn test_navigation_without_session() {
        let mut player = Player::new();
        assert_eq!(player.next_step(), Err(PlaybackError::NoActiveSession));
        assert_eq!(player.previous_step(), Err(PlaybackError::NoActiveSession));
    }

    #[test]
    fn test_navigation_rejected_for_binary() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("show")).unwrap();
        player.tick(30).unwrap();

        let err = player.next_step().unwrap_err();
        assert_eq!(err, PlaybackError::UnsupportedForBinarySequence { operation: "next_step" });
        assert!(err.to_string().contains("not supported for binary sequences"));
        assert!(matches!(
            player.previous_step(),
            Err(PlaybackError::UnsupportedForBinarySequence { .. })
        ));

        let s = session(&player);
        assert_eq!(s.current_step_index, 0);
        assert_eq!(s.remaining_time_seconds, 150);
    }

    #[test]
    fn test_binary_runs_out() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("show")).unwrap();

        assert_eq!(player.tick(179).unwrap(), TickOutcome::Running);
        assert_eq!(session(&player).remaining_time_seconds, 1);
        assert_eq!(player.tick(1).unwrap(), TickOutcome::Finished);
        assert_eq!(player.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_binary_loop_restarts() {
        let store = store();
        let mut player = Player::new();
        // 400 frames at 25 ms = 10 s
        player.play(&store, &id("show-loop")).unwrap();

        assert_eq!(player.tick(10).unwrap(), TickOutcome::Advanced { count: 1 });
        assert_eq!(session(&player).remaining_time_seconds, 10);

        assert_eq!(player.tick(23).unwrap(), TickOutcome::Advanced { count: 2 });
        assert_eq!(session(&player).remaining_time_seconds, 7);
        assert_eq!(session(&player).total_elapsed_seconds, 33);
        assert_eq!(session(&player).current_step_index, 0);
    }

    #[test]
    fn test_zero_length_binary_loop_keeps_running() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("blip")).unwrap();

        assert_eq!(player.tick(5).unwrap(), TickOutcome::Running);
        assert_eq!(player.state(), PlaybackState::Playing);
        assert_eq!(session(&player).remaining_time_seconds, 0);
        assert_eq!(session(&player).total_elapsed_seconds, 5);
    }

    #[test]
    fn test_store_failure_is_reported() {
        struct Offline;

        impl SequenceStore for Offline {
            fn get_sequence(&self, _id: &SequenceId) -> crate::store::StoreResult<Option<Sequence>> {
                Err(StoreError::Unavailable("connection refused".into()))
            }
            fn list_sequences(&self) -> crate::store::StoreResult<Vec<Sequence>> {
                Err(StoreError::Unavailable("connection refused".into()))
            }
            fn create_sequence(&mut self, _sequence: Sequence) -> crate::store::StoreResult<SequenceId> {
                Err(StoreError::Unavailable("connection refused".into()))
            }
            fn update_step_sequence(&mut self, _sequence: Sequence) -> crate::store::StoreResult<()> {
                Err(StoreError::Unavailable("connection refused".into()))
            }
            fn delete_sequence(&mut self, _id: &SequenceId) -> crate::store::StoreResult<Sequence> {
                Err(StoreError::Unavailable("connection refused".into()))
            }
        }

        let mut player = Player::new();
        assert!(matches!(
            player.play(&Offline, &id("seq-1")),
            Err(PlaybackError::Store(StoreError::Unavailable(_)))
        ));
        assert_eq!(player.state(), PlaybackState::Stopped);
    }

    #[test]
    fn test_session_json_uses_camel_case() {
        let store = store();
        let mut player = Player::new();
        player.play(&store, &id("seq-1")).unwrap();

        let json = serde_json::to_value(session(&player)).unwrap();
        assert_eq!(json["sequenceId"], "seq-1");
        assert_eq!(json["currentStepIndex"], 0);
        assert_eq!(json["remainingTimeSeconds"], 10);
        assert_eq!(json["state"], "playing");
    }
}
