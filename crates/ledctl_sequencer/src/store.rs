// SPDX-License-Identifier: MIT OR Apache-2.0
//! Sequence store seam.
//!
//! The player reads sequences through [`SequenceStore`] when playback starts
//! and never otherwise. Hosts plug in whatever backing they have; a failing
//! backend reports [`StoreError::Unavailable`] instead of pretending the
//! library is empty.

use crate::sequence::{Sequence, SequenceId, SequenceType};
use indexmap::IndexMap;

/// Errors reported by a sequence store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No sequence with this ID
    #[error("sequence not found: {0}")]
    NotFound(SequenceId),

    /// A sequence with this ID already exists
    #[error("sequence already exists: {0}")]
    AlreadyExists(SequenceId),

    /// Update tried to change a sequence's type
    #[error("sequence {0} cannot change type")]
    VariantMismatch(SequenceId),

    /// Backend could not be reached or read
    #[error("sequence store unavailable: {0}")]
    Unavailable(String),
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Source of playable sequences
pub trait SequenceStore {
    /// Look up a sequence by ID. `Ok(None)` means the store answered and the
    /// sequence does not exist.
    fn get_sequence(&self, id: &SequenceId) -> StoreResult<Option<Sequence>>;

    /// All sequences, in store order
    fn list_sequences(&self) -> StoreResult<Vec<Sequence>>;

    /// Add a new sequence
    fn create_sequence(&mut self, sequence: Sequence) -> StoreResult<SequenceId>;

    /// Replace an existing step sequence
    fn update_step_sequence(&mut self, sequence: Sequence) -> StoreResult<()>;

    /// Remove a sequence, returning it
    fn delete_sequence(&mut self, id: &SequenceId) -> StoreResult<Sequence>;
}

/// In-memory sequence store
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    sequences: IndexMap<SequenceId, Sequence>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding the given sequences
    pub fn with_sequences(sequences: impl IntoIterator<Item = Sequence>) -> Self {
        Self {
            sequences: sequences.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    /// Number of stored sequences
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Iterate without cloning
    pub fn iter(&self) -> impl Iterator<Item = &Sequence> {
        self.sequences.values()
    }

    /// Insert a sequence, replacing any sequence with the same ID in place.
    ///
    /// No variant check; returns the replaced sequence.
    pub fn put_sequence(&mut self, sequence: Sequence) -> Option<Sequence> {
        self.sequences.insert(sequence.id.clone(), sequence)
    }
}

impl SequenceStore for MemoryStore {
    fn get_sequence(&self, id: &SequenceId) -> StoreResult<Option<Sequence>> {
        Ok(self.sequences.get(id).cloned())
    }

    fn list_sequences(&self) -> StoreResult<Vec<Sequence>> {
        Ok(self.sequences.values().cloned().collect())
    }

    fn create_sequence(&mut self, sequence: Sequence) -> StoreResult<SequenceId> {
        if self.sequences.contains_key(&sequence.id) {
            return Err(StoreError::AlreadyExists(sequence.id));
        }
        let id = sequence.id.clone();
        self.sequences.insert(id.clone(), sequence);
        Ok(id)
    }

    fn update_step_sequence(&mut self, mut sequence: Sequence) -> StoreResult<()> {
        let Some(existing) = self.sequences.get_mut(&sequence.id) else {
            return Err(StoreError::NotFound(sequence.id));
        };

        if existing.sequence_type() != SequenceType::Steps
            || sequence.sequence_type() != SequenceType::Steps
        {
            return Err(StoreError::VariantMismatch(sequence.id));
        }

        sequence.created_at = existing.created_at;
        sequence.touch();
        *existing = sequence;
        Ok(())
    }

    fn delete_sequence(&mut self, id: &SequenceId) -> StoreResult<Sequence> {
        self.sequences
            .shift_remove(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }
}
