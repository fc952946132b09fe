use crate::emotion::{Emotion, EmotionScores};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A finalized daily check-in as persisted by the entry store.
///
/// `date` is the unique key per user; saving another entry for the same
/// date replaces this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Serialized as `YYYY-MM-DD`.
    pub date: NaiveDate,
    pub diary: String,
    pub face: EmotionScores,
    /// Scores from the raw-audio modality.
    pub voice: EmotionScores,
    #[serde(rename = "final")]
    pub final_emotion: Emotion,
}
