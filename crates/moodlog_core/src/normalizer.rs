//! Candidate normalizer.
//!
//! Inference back-ends have been swapped several times and each one wraps
//! its predictions differently. This module turns any of those envelopes
//! into a flat `Vec<Candidate>` so the reducer never sees the churn.
//!
//! Shapes are tried in priority order; the first one that recognizes the
//! response wins. Malformed input yields an empty list, never an error.

use crate::emotion::Candidate;
use serde_json::Value;

/// A recognizer for one response envelope.
pub trait ResponseShape: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` means "not my shape", letting the next matcher try.
    fn try_normalize(&self, raw: &Value) -> Option<Vec<Candidate>>;
}

/// `{ "predictions": [ { "class" | "label": .., "confidence": .. }, .. ] }`
pub struct PredictionsEnvelope;

impl ResponseShape for PredictionsEnvelope {
    fn name(&self) -> &'static str {
        "predictions"
    }

    fn try_normalize(&self, raw: &Value) -> Option<Vec<Candidate>> {
        let items = raw.get("predictions")?.as_array()?;
        Some(
            items
                .iter()
                .map(|item| Candidate {
                    label: named_label(item).unwrap_or_default(),
                    confidence: item.get("confidence").map(coerce_confidence).unwrap_or(f64::NAN),
                })
                .collect(),
        )
    }
}

/// A bare list of items, either named (`label`/`confidence`) or positional
/// (`["joy", 0.8]`).
pub struct BareList;

impl ResponseShape for BareList {
    fn name(&self) -> &'static str {
        "list"
    }

    fn try_normalize(&self, raw: &Value) -> Option<Vec<Candidate>> {
        let items = raw.as_array()?;
        Some(
            items
                .iter()
                .map(|item| {
                    let label = named_label(item)
                        .or_else(|| item.get(0).and_then(Value::as_str).map(str::to_string))
                        .unwrap_or_default();
                    let confidence = item
                        .get("confidence")
                        .or_else(|| item.get(1))
                        .map(coerce_confidence)
                        .unwrap_or(f64::NAN);
                    Candidate { label, confidence }
                })
                .collect(),
        )
    }
}

/// Ordered collection of shape matchers.
pub struct Normalizer {
    shapes: Vec<Box<dyn ResponseShape>>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            shapes: vec![Box::new(PredictionsEnvelope), Box::new(BareList)],
        }
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a matcher with the lowest priority.
    pub fn with_shape(mut self, shape: Box<dyn ResponseShape>) -> Self {
        self.shapes.push(shape);
        self
    }

    pub fn normalize(&self, raw: &Value) -> Vec<Candidate> {
        for shape in &self.shapes {
            if let Some(candidates) = shape.try_normalize(raw) {
                tracing::debug!(
                    "Normalized {} candidates via '{}' shape",
                    candidates.len(),
                    shape.name()
                );
                return candidates;
            }
        }
        tracing::debug!("Unrecognized response shape, no candidates");
        Vec::new()
    }
}

/// Normalize with the default matcher list.
pub fn normalize(raw: &Value) -> Vec<Candidate> {
    Normalizer::default().normalize(raw)
}

fn named_label(item: &Value) -> Option<String> {
    item.get("class")
        .and_then(Value::as_str)
        .or_else(|| item.get("label").and_then(Value::as_str))
        .map(str::to_string)
}

/// Numbers pass through, numeric strings are parsed, anything else is NaN.
fn coerce_confidence(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        _ => f64::NAN,
    }
}
