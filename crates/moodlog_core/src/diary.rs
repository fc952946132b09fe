//! Keyword-based emotion hint for diary text.
//!
//! Backs the optional diary override policy: when enabled, a diary that
//! clearly names one emotion replaces the fused result before saving.
//! Disabled by default (`policy.diary_override`).

use crate::emotion::{Emotion, EmotionScores};
use crate::entry::Entry;

const HAPPY: &[&str] = &[
    "happy", "glad", "joy", "great", "excited", "grateful", "awesome", "love", "wonderful",
    "fun", "😊", "😄", "❤️",
];

const SAD: &[&str] = &[
    "sad", "lonely", "tired", "depressed", "cry", "cried", "miss", "down", "upset", "bored",
    "😢", "😞",
];

const ANGRY: &[&str] = &[
    "angry", "mad", "furious", "annoyed", "hate", "frustrated", "irritated", "pissed", "😡",
];

fn hits(text: &str, words: &[&str]) -> usize {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && c.is_ascii())
        .filter(|t| !t.is_empty())
        .collect();
    words
        .iter()
        .map(|w| {
            if w.is_ascii() {
                tokens.iter().filter(|t| *t == w).count()
            } else {
                lower.matches(*w).count()
            }
        })
        .sum()
}

/// The emotion the diary text points at, if any single one clearly leads.
///
/// Returns `None` for text without keywords or with a tie for first place.
pub fn analyze_diary(text: &str) -> Option<Emotion> {
    let counts = [
        (Emotion::Happy, hits(text, HAPPY)),
        (Emotion::Sad, hits(text, SAD)),
        (Emotion::Angry, hits(text, ANGRY)),
    ];
    let best = counts.iter().map(|(_, n)| *n).max().unwrap_or(0);
    if best == 0 {
        return None;
    }
    let mut leaders = counts.iter().filter(|(_, n)| *n == best);
    let (emotion, _) = leaders.next()?;
    if leaders.next().is_some() {
        return None;
    }
    Some(*emotion)
}

/// Apply the override to an entry about to be saved.
///
/// The face scores are replaced with a one-hot vector so the trend chart
/// agrees with the overridden label. Returns whether anything changed.
pub fn apply_override(entry: &mut Entry) -> bool {
    let Some(emotion) = analyze_diary(&entry.diary) else {
        return false;
    };
    tracing::info!(
        "Diary override: {} -> {} for {}",
        entry.final_emotion,
        emotion,
        entry.date
    );
    entry.final_emotion = emotion;
    entry.face = EmotionScores::one_hot(emotion);
    true
}
