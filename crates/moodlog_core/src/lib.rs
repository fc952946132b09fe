pub mod config;
pub mod diary;
pub mod emotion;
pub mod entry;
pub mod error;
pub mod fusion;
pub mod gate;
pub mod insight;
pub mod normalizer;
pub mod reducer;
pub mod session;
pub mod trend;

pub use config::MoodlogConfig;
pub use emotion::{
    Candidate, Distribution, Emotion, EmotionScores, Modality, ModalityResult, ScoredEmotion,
};
pub use entry::Entry;
pub use error::CheckinError;
pub use gate::{Choice, ConfidenceGate, GateDecision};
pub use insight::Insights;
pub use reducer::{Aggregation, Reducer};
pub use session::{
    CheckinContext, CheckinSession, CheckinSummary, PipelineSettings, Services, SessionStatus,
    SubmitOutcome,
};
pub use trend::TrendSeries;

use async_trait::async_trait;
use chrono::NaiveDate;

/// What gets sent to a modality's inference service.
#[derive(Debug, Clone)]
pub enum ModalityPayload {
    /// Encoded still image (JPEG/PNG).
    Image(Vec<u8>),
    Text(String),
    /// Encoded voice recording.
    Audio(Vec<u8>),
}

impl ModalityPayload {
    pub fn modality(&self) -> Modality {
        match self {
            Self::Image(_) => Modality::Face,
            Self::Text(_) => Modality::Text,
            Self::Audio(_) => Modality::Audio,
        }
    }
}

/// A black-box emotion classifier for one modality.
///
/// Returns the service's raw JSON; shape differences are handled by the
/// normalizer, not by implementations.
#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    async fn classify(&self, payload: &ModalityPayload) -> anyhow::Result<serde_json::Value>;
}

/// Speech-to-text for the voice diary.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &[u8]) -> anyhow::Result<String>;
}

/// Durable per-user, per-date storage of finalized entries.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Insert, or overwrite the entry with the same date.
    async fn upsert(&self, user: &str, entry: &Entry) -> anyhow::Result<()>;

    /// All entries for a user, ascending by date.
    async fn list(&self, user: &str) -> anyhow::Result<Vec<Entry>>;

    /// Delete the entry for `date`. Returns whether one existed.
    async fn remove(&self, user: &str, date: NaiveDate) -> anyhow::Result<bool>;
}
