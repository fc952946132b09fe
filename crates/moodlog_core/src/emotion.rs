//! Canonical emotion vocabulary and the value types that flow through the
//! check-in pipeline.
//!
//! Every classifier speaks its own label set. Everything downstream of the
//! reducer speaks only [`Emotion`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three canonical emotion buckets.
///
/// Declaration order is the tie-break order: happy before sad before angry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Angry,
}

impl Emotion {
    /// All buckets in tie-break order.
    pub const ALL: [Emotion; 3] = [Emotion::Happy, Emotion::Sad, Emotion::Angry];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Happy => "happy",
            Self::Sad => "sad",
            Self::Angry => "angry",
        }
    }

    /// Map a raw classifier label onto a bucket.
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace.
    /// Unrecognized labels return `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "happy" | "joy" | "excited" | "surprise" | "neutral" | "calm" => Some(Self::Happy),
            "sad" | "depressed" | "bored" | "tired" | "lonely" | "fear" => Some(Self::Sad),
            "angry" | "annoyed" | "frustrated" | "disgust" | "contempt" => Some(Self::Angry),
            _ => None,
        }
    }

    /// Ordinal used to decide whether a change of mood is an improvement.
    ///
    /// Negative emotions rank 1, positive ones 3. Rank 2 is reserved for a
    /// neutral class; none of the canonical buckets currently use it.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Sad | Self::Angry => 1,
            Self::Happy => 3,
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Emotion {
    type Err = String;

    /// Strict parse of a canonical name. Use [`Emotion::from_label`] for
    /// classifier vocabularies.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "happy" => Ok(Self::Happy),
            "sad" => Ok(Self::Sad),
            "angry" => Ok(Self::Angry),
            other => Err(format!("unknown emotion: {}", other)),
        }
    }
}

/// An independent emotion-signal source.
///
/// Declaration order is the fusion priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Face,
    Text,
    Audio,
}

impl Modality {
    pub const ALL: [Modality; 3] = [Modality::Face, Modality::Text, Modality::Audio];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Face => "face",
            Self::Text => "text",
            Self::Audio => "audio",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw (label, confidence) pair as produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub label: String,
    /// Non-negative score. Not assumed to be normalized; may be NaN when
    /// the service sent something non-numeric.
    pub confidence: f64,
}

impl Candidate {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

/// A canonical emotion with its normalized probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredEmotion {
    pub label: Emotion,
    pub confidence: f64,
}

/// Output of the three-class reducer.
///
/// Either empty (no signal) or exactly one entry per bucket, summing to 1.0
/// and sorted by descending confidence with ties in [`Emotion::ALL`] order.
/// Only the reducer constructs non-empty values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Distribution(Vec<ScoredEmotion>);

impl Distribution {
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub(crate) fn from_sorted(scores: Vec<ScoredEmotion>) -> Self {
        Self(scores)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn top(&self) -> Option<&ScoredEmotion> {
        self.0.first()
    }

    pub fn second(&self) -> Option<&ScoredEmotion> {
        self.0.get(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScoredEmotion> {
        self.0.iter()
    }

    pub fn confidence_of(&self, emotion: Emotion) -> f64 {
        self.0
            .iter()
            .find(|s| s.label == emotion)
            .map(|s| s.confidence)
            .unwrap_or(0.0)
    }

    /// Re-express as raw candidates, e.g. to feed back through the reducer.
    pub fn to_candidates(&self) -> Vec<Candidate> {
        self.0
            .iter()
            .map(|s| Candidate::new(s.label.as_str(), s.confidence))
            .collect()
    }
}

/// One modality's reduced signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModalityResult {
    #[serde(rename = "type")]
    pub modality: Modality,
    pub distribution: Distribution,
}

impl ModalityResult {
    pub fn new(modality: Modality, distribution: Distribution) -> Self {
        Self {
            modality,
            distribution,
        }
    }
}

/// Per-bucket scores as persisted on an entry (each in `0..=1`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionScores {
    pub happy: f64,
    pub sad: f64,
    pub angry: f64,
}

impl EmotionScores {
    pub fn get(&self, emotion: Emotion) -> f64 {
        match emotion {
            Emotion::Happy => self.happy,
            Emotion::Sad => self.sad,
            Emotion::Angry => self.angry,
        }
    }

    /// All mass on a single bucket.
    pub fn one_hot(emotion: Emotion) -> Self {
        let mut scores = Self::default();
        match emotion {
            Emotion::Happy => scores.happy = 1.0,
            Emotion::Sad => scores.sad = 1.0,
            Emotion::Angry => scores.angry = 1.0,
        }
        scores
    }
}

impl From<&Distribution> for EmotionScores {
    fn from(dist: &Distribution) -> Self {
        Self {
            happy: dist.confidence_of(Emotion::Happy),
            sad: dist.confidence_of(Emotion::Sad),
            angry: dist.confidence_of(Emotion::Angry),
        }
    }
}
