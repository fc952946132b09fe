//! Three-class reducer: arbitrary classifier labels → {happy, sad, angry}.
//!
//! Contract:
//! - Each candidate's label is lower-cased and looked up in the bucket table
//!   ([`Emotion::from_label`]). Unknown labels and non-positive or non-finite
//!   confidences contribute nothing.
//! - Confidences landing in the same bucket are combined with the configured
//!   [`Aggregation`]. The default is [`Aggregation::Sum`].
//! - If every bucket is zero the result is empty (no decision possible).
//! - Otherwise the buckets are divided by their total, rounded to
//!   [`PRECISION_DIGITS`] decimals and sorted descending, ties resolved
//!   happy > sad > angry. The rounded shares sum to exactly 1.0, so
//!   reducing a reduced distribution returns it unchanged.

use crate::emotion::{Candidate, Distribution, Emotion, ScoredEmotion};
use serde::Deserialize;
use std::cmp::Ordering;

/// Decimal digits kept after normalization.
pub const PRECISION_DIGITS: i32 = 6;

const UNIT_SCALE: f64 = 1_000_000.0;

/// How far a bucket total may sit from 1.0 and still count as normalized.
const NORMALIZED_TOLERANCE: f64 = 1e-9;

/// How several candidates mapping to the same bucket are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Add all confidences for the bucket.
    #[default]
    Sum,
    /// Keep only the strongest confidence for the bucket.
    Max,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Reducer {
    aggregation: Aggregation,
}

impl Reducer {
    pub fn new(aggregation: Aggregation) -> Self {
        Self { aggregation }
    }

    pub fn aggregation(&self) -> Aggregation {
        self.aggregation
    }

    pub fn reduce(&self, candidates: &[Candidate]) -> Distribution {
        let usable: Vec<(Emotion, f64)> = candidates
            .iter()
            .filter_map(|c| {
                let bucket = Emotion::from_label(&c.label)?;
                let usable = c.confidence.is_finite() && c.confidence > 0.0;
                usable.then_some((bucket, c.confidence))
            })
            .collect();

        // Scale huge raw scores down so aggregation cannot overflow.
        let peak = usable.iter().map(|(_, c)| *c).fold(0.0, f64::max);
        if peak <= 0.0 {
            return Distribution::empty();
        }
        let scale = peak.max(1.0);

        let mut sums = [0.0f64; 3];
        for (bucket, c) in usable {
            let slot = &mut sums[bucket_index(bucket)];
            let c = c / scale;
            match self.aggregation {
                Aggregation::Sum => *slot += c,
                Aggregation::Max => *slot = slot.max(c),
            }
        }

        let total: f64 = sums.iter().sum();
        if total <= 0.0 || !total.is_finite() {
            return Distribution::empty();
        }
        // An already-normalized input is only re-rounded.
        let divisor = if (total - 1.0).abs() <= NORMALIZED_TOLERANCE {
            1.0
        } else {
            total
        };

        let units = to_units(sums.map(|s| s / divisor));
        let mut scores: Vec<ScoredEmotion> = Emotion::ALL
            .iter()
            .map(|&label| ScoredEmotion {
                label,
                confidence: units[bucket_index(label)] as f64 / UNIT_SCALE,
            })
            .collect();

        // Stable sort keeps the happy/sad/angry order among equal scores.
        scores.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });

        Distribution::from_sorted(scores)
    }
}

/// Reduce with the default (sum) aggregation.
pub fn reduce(candidates: &[Candidate]) -> Distribution {
    Reducer::default().reduce(candidates)
}

fn bucket_index(emotion: Emotion) -> usize {
    match emotion {
        Emotion::Happy => 0,
        Emotion::Sad => 1,
        Emotion::Angry => 2,
    }
}

/// Round each share to whole units of `10^-PRECISION_DIGITS` and hand the
/// rounding residual to the largest share, so the units sum to exactly one.
fn to_units(shares: [f64; 3]) -> [i64; 3] {
    let mut units = shares.map(|s| (s * UNIT_SCALE).round() as i64);
    let residual = UNIT_SCALE as i64 - units.iter().sum::<i64>();
    let mut largest = 0;
    for i in 1..units.len() {
        if units[i] > units[largest] {
            largest = i;
        }
    }
    units[largest] += residual;
    units
}
