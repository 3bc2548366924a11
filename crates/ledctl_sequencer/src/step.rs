// SPDX-License-Identifier: MIT OR Apache-2.0
//! Step definitions for step-list sequences.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a step
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub String);

impl StepId {
    /// Create a new random step ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for StepId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

/// How the output moves from the previous step into this one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    /// Cut straight to the new effect
    #[default]
    Instant,
    /// Fade through black
    Fade,
    /// Blend the outgoing and incoming effects
    Crossfade,
}

impl TransitionKind {
    /// Get the display name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Instant => "Instant",
            Self::Fade => "Fade",
            Self::Crossfade => "Crossfade",
        }
    }
}

/// Effect parameters, keyed by parameter name.
///
/// Values are opaque to the sequencer; only the effect catalog on the
/// controller interprets them.
pub type EffectParams = IndexMap<String, serde_json::Value>;

/// One effect invocation in a step sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Unique step ID
    pub id: StepId,
    /// Key of the effect in the controller's effect catalog
    pub effect_id: String,
    /// Effect parameters
    #[serde(default)]
    pub params: EffectParams,
    /// Duration in whole seconds; 0 marks a manual step
    pub duration_secs: u32,
    /// Transition into this step
    #[serde(default)]
    pub transition: TransitionKind,
}

impl Step {
    /// Create a new step with no parameters and an instant transition
    pub fn new(effect_id: impl Into<String>, duration_secs: u32) -> Self {
        Self {
            id: StepId::new(),
            effect_id: effect_id.into(),
            params: IndexMap::new(),
            duration_secs,
            transition: TransitionKind::Instant,
        }
    }

    /// Create a manual step, which stays active until navigated away from
    pub fn manual(effect_id: impl Into<String>) -> Self {
        Self::new(effect_id, 0)
    }

    /// Set the transition kind
    pub fn with_transition(mut self, transition: TransitionKind) -> Self {
        self.transition = transition;
        self
    }

    /// Set a single effect parameter
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Whether this step never expires on its own
    pub fn is_manual(&self) -> bool {
        self.duration_secs == 0
    }
}
