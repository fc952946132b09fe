//! Confidence gate.
//!
//! High-confidence fused results are accepted automatically. Anything below
//! the threshold is held for a binary human decision: confirm the top label
//! or fall back to the runner-up.

use crate::emotion::{Distribution, Emotion, ScoredEmotion};
use serde::{Deserialize, Serialize};

/// Default acceptance threshold.
pub const DEFAULT_THRESHOLD: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    AutoAccept(Emotion),
    NeedsConfirmation {
        top: ScoredEmotion,
        second: Option<ScoredEmotion>,
    },
}

/// The user's answer to "are you feeling {top}?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Choice {
    Confirm,
    Reject,
}

impl GateDecision {
    /// Final label for a pending decision. An auto-accepted decision ignores
    /// the choice.
    ///
    /// Rejecting falls back to the second-ranked label; if there is no
    /// runner-up with any weight the top label is kept.
    pub fn resolve(&self, choice: Choice) -> Emotion {
        match *self {
            Self::AutoAccept(label) => label,
            Self::NeedsConfirmation { top, second } => match choice {
                Choice::Confirm => top.label,
                Choice::Reject => second
                    .filter(|s| s.confidence > 0.0)
                    .map(|s| s.label)
                    .unwrap_or(top.label),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceGate {
    threshold: f64,
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

impl ConfidenceGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns `None` for an empty distribution; fusion never hands one over.
    pub fn evaluate(&self, main: &Distribution) -> Option<GateDecision> {
        let top = *main.top()?;
        if top.confidence >= self.threshold {
            Some(GateDecision::AutoAccept(top.label))
        } else {
            Some(GateDecision::NeedsConfirmation {
                top,
                second: main.second().copied(),
            })
        }
    }
}
