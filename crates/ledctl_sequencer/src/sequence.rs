// SPDX-License-Identifier: MIT OR Apache-2.0
//! Playable sequences: step lists and binary animation files.

use crate::binary::BinaryMetadata;
use crate::step::Step;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Unique identifier for a sequence
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(pub String);

impl SequenceId {
    /// Create a new random sequence ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the raw identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SequenceId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for SequenceId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Discriminant of a sequence, for listings and snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceType {
    /// Ordered list of effect steps
    Steps,
    /// Externally authored binary animation
    Binary,
}

impl SequenceType {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Steps => "Steps",
            Self::Binary => "Binary",
        }
    }
}

/// Body of a step-list sequence
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepSequence {
    /// Steps in playback order
    pub steps: Vec<Step>,
    /// Whether playback wraps to the first step after the last
    #[serde(default)]
    pub looping: bool,
}

impl StepSequence {
    /// Create a step sequence
    pub fn new(steps: Vec<Step>, looping: bool) -> Self {
        Self { steps, looping }
    }

    /// Sum of all step durations, ignoring manual steps
    pub fn cycle_duration(&self) -> u64 {
        self.steps.iter().map(|s| u64::from(s.duration_secs)).sum()
    }

    /// Whether any step waits for manual navigation
    pub fn has_manual_steps(&self) -> bool {
        self.steps.iter().any(Step::is_manual)
    }
}

/// Body of a binary-file sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinarySequence {
    /// Where the animation file lives
    pub file: PathBuf,
    /// Size of the file in bytes
    pub file_size: u64,
    /// Metadata read from the file header
    pub metadata: BinaryMetadata,
    /// Whether the timeline restarts when it ends; absent means no
    #[serde(default)]
    pub looping: Option<bool>,
    /// Audio played alongside the animation
    #[serde(default)]
    pub audio_file: Option<PathBuf>,
}

impl BinarySequence {
    /// Create a binary sequence from a parsed file
    pub fn new(file: impl Into<PathBuf>, metadata: BinaryMetadata) -> Self {
        Self {
            file: file.into(),
            file_size: metadata.file_size(),
            metadata,
            looping: None,
            audio_file: None,
        }
    }

    /// Whether playback restarts after the last frame
    pub fn is_looping(&self) -> bool {
        self.looping.unwrap_or(false)
    }
}

/// The two playable shapes. Fixed when the sequence is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceKind {
    /// Ordered list of effect steps
    Steps(StepSequence),
    /// Externally authored binary animation
    Binary(BinarySequence),
}

impl SequenceKind {
    /// Get the discriminant
    pub fn sequence_type(&self) -> SequenceType {
        match self {
            Self::Steps(_) => SequenceType::Steps,
            Self::Binary(_) => SequenceType::Binary,
        }
    }
}

/// A playable sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    /// Unique sequence ID
    pub id: SequenceId,
    /// Sequence name
    pub name: String,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Creation time, UNIX seconds
    pub created_at: u64,
    /// Last modification time, UNIX seconds
    pub updated_at: u64,
    kind: SequenceKind,
}

impl Sequence {
    /// Create a sequence of the given kind
    pub fn new(name: impl Into<String>, kind: SequenceKind) -> Self {
        let now = unix_now();
        Self {
            id: SequenceId::new(),
            name: name.into(),
            description: None,
            created_at: now,
            updated_at: now,
            kind,
        }
    }

    /// Create a step-list sequence
    pub fn steps(name: impl Into<String>, steps: Vec<Step>, looping: bool) -> Self {
        Self::new(name, SequenceKind::Steps(StepSequence::new(steps, looping)))
    }

    /// Create a binary-file sequence
    pub fn binary(name: impl Into<String>, body: BinarySequence) -> Self {
        Self::new(name, SequenceKind::Binary(body))
    }

    /// Replace the generated ID
    pub fn with_id(mut self, id: impl Into<SequenceId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The sequence body
    pub fn kind(&self) -> &SequenceKind {
        &self.kind
    }

    /// Get the discriminant
    pub fn sequence_type(&self) -> SequenceType {
        self.kind.sequence_type()
    }

    /// Step-list body, if this is a step sequence
    pub fn step_body(&self) -> Option<&StepSequence> {
        match &self.kind {
            SequenceKind::Steps(body) => Some(body),
            SequenceKind::Binary(_) => None,
        }
    }

    /// Mutable step-list body, if this is a step sequence.
    ///
    /// There is no way to swap the variant: a binary sequence never hands
    /// out a step list and vice versa.
    pub fn step_body_mut(&mut self) -> Option<&mut StepSequence> {
        match &mut self.kind {
            SequenceKind::Steps(body) => Some(body),
            SequenceKind::Binary(_) => None,
        }
    }

    /// Binary body, if this is a binary sequence
    pub fn binary_body(&self) -> Option<&BinarySequence> {
        match &self.kind {
            SequenceKind::Binary(body) => Some(body),
            SequenceKind::Steps(_) => None,
        }
    }

    /// Whether playback wraps around at the end
    pub fn is_looping(&self) -> bool {
        match &self.kind {
            SequenceKind::Steps(body) => body.looping,
            SequenceKind::Binary(body) => body.is_looping(),
        }
    }

    /// Number of steps; binary sequences have none
    pub fn step_count(&self) -> usize {
        self.step_body().map_or(0, |body| body.steps.len())
    }

    /// Bump the modification time
    pub fn touch(&mut self) {
        self.updated_at = unix_now().max(self.created_at);
    }
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
