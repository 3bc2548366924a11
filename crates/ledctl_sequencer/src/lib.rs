// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequence playback engine for the LED controller.
//!
//! This crate provides:
//! - Step-list and binary-file sequences
//! - A header parser for `PSEQ` binary sequence files
//! - A playback state machine with pause, resume, looping and manual steps
//! - The store seam the engine loads sequences through
//!
//! ## Architecture
//!
//! The engine is built on:
//! - A single owned [`Player`] holding at most one session
//! - Externally driven ticks; the player owns no timer
//! - A [`SequenceStore`] trait for lookup, with an in-memory implementation

pub mod binary;
pub mod playback;
pub mod sequence;
pub mod step;
pub mod store;

pub use binary::{parse_binary_sequence, encode_header, BinaryMetadata, FormatVersion, ParseError};
pub use playback::{PlaybackError, PlaybackSession, PlaybackState, Player, TickOutcome};
pub use sequence::{BinarySequence, Sequence, SequenceId, SequenceKind, SequenceType, StepSequence};
pub use step::{EffectParams, Step, StepId, TransitionKind};
pub use store::{MemoryStore, SequenceStore, StoreError, StoreResult};
