//! Canned classifiers for offline runs and tests.

use anyhow::Result;
use async_trait::async_trait;
use moodlog_core::{EmotionClassifier, ModalityPayload, Transcriber};
use serde_json::Value;

/// Always answers with the same raw response.
#[derive(Debug, Clone)]
pub struct StaticClassifier {
    response: Value,
}

impl StaticClassifier {
    pub fn new(response: Value) -> Self {
        Self { response }
    }

    /// A single full-confidence prediction for `label`.
    pub fn always(label: &str) -> Self {
        Self::new(serde_json::json!({
            "predictions": [{ "label": label, "confidence": 1.0 }]
        }))
    }
}

#[async_trait]
impl EmotionClassifier for StaticClassifier {
    async fn classify(&self, _payload: &ModalityPayload) -> Result<Value> {
        Ok(self.response.clone())
    }
}

#[derive(Debug, Clone)]
pub struct StaticTranscriber(pub String);

#[async_trait]
impl Transcriber for StaticTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> Result<String> {
        Ok(self.0.clone())
    }
}
