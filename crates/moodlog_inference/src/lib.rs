pub mod fixed;
pub mod http;
pub mod retry;

pub use fixed::{StaticClassifier, StaticTranscriber};
pub use http::{HttpClassifier, HttpTranscriber};
pub use retry::RetryPolicy;

use anyhow::Result;
use moodlog_core::config::InferenceConfig;
use moodlog_core::{EntryStore, Services};
use std::sync::Arc;
use std::time::Duration;

/// Wire the three HTTP classifiers and the transcriber from config.
pub fn http_services(config: &InferenceConfig, store: Arc<dyn EntryStore>) -> Result<Services> {
    let timeout = Duration::from_secs(config.timeout_secs);
    let retry = RetryPolicy::with_attempts(config.max_attempts);
    tracing::info!(
        "Inference endpoints: face={} text={} audio={}",
        config.face_url,
        config.text_url,
        config.audio_url
    );
    let classifier = |name: &str, url: &str| {
        HttpClassifier::new(name, url, timeout, retry.clone()).map(Arc::new)
    };
    Ok(Services {
        face: classifier("face classifier", &config.face_url)?,
        text: classifier("text classifier", &config.text_url)?,
        audio: classifier("audio classifier", &config.audio_url)?,
        transcriber: Arc::new(HttpTranscriber::new(&config.audio_url, timeout, retry)?),
        store,
    })
}

/// Every modality answers `label` with full confidence; the transcript is fixed.
pub fn static_services(label: &str, transcript: &str, store: Arc<dyn EntryStore>) -> Services {
    let classifier = Arc::new(StaticClassifier::always(label));
    Services {
        face: classifier.clone(),
        text: classifier.clone(),
        audio: classifier,
        transcriber: Arc::new(StaticTranscriber(transcript.to_string())),
        store,
    }
}
