//! End-to-end check-in flow against in-process fakes for the classifiers
//! and the entry store.

use async_trait::async_trait;
use chrono::NaiveDate;
use moodlog_core::config::ClockConfig;
use moodlog_core::{
    CheckinError, CheckinSession, ConfidenceGate, Emotion, EmotionClassifier, Entry, EntryStore,
    Modality, ModalityPayload, PipelineSettings, Services, SessionStatus, SubmitOutcome,
    Transcriber,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ============================================================================
// Fakes
// ============================================================================

struct FixedClassifier {
    response: Option<Value>,
    calls: AtomicUsize,
}

impl FixedClassifier {
    fn ok(response: Value) -> Arc<Self> {
        Arc::new(Self { response: Some(response), calls: AtomicUsize::new(0) })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self { response: None, calls: AtomicUsize::new(0) })
    }
}

#[async_trait]
impl EmotionClassifier for FixedClassifier {
    async fn classify(&self, _payload: &ModalityPayload) -> anyhow::Result<Value> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.response {
            Some(v) => Ok(v.clone()),
            None => anyhow::bail!("connection refused"),
        }
    }
}

struct FixedTranscriber(&'static str);

#[async_trait]
impl Transcriber for FixedTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> anyhow::Result<String> {
        Ok(self.0.to_string())
    }
}

struct BrokenTranscriber;

#[async_trait]
impl Transcriber for BrokenTranscriber {
    async fn transcribe(&self, _audio: &[u8]) -> anyhow::Result<String> {
        anyhow::bail!("speech service timed out")
    }
}

#[derive(Default)]
struct MemoryStore {
    entries: Mutex<Vec<(String, Entry)>>,
    fail_writes: AtomicBool,
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn upsert(&self, user: &str, entry: &Entry) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            anyhow::bail!("disk full");
        }
        let mut entries = self.entries.lock().unwrap();
        entries.retain(|(u, e)| !(u == user && e.date == entry.date));
        entries.push((user.to_string(), entry.clone()));
        Ok(())
    }

    async fn list(&self, user: &str) -> anyhow::Result<Vec<Entry>> {
        let mut out: Vec<Entry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| u == user)
            .map(|(_, e)| e.clone())
            .collect();
        out.sort_by_key(|e| e.date);
        Ok(out)
    }

    async fn remove(&self, user: &str, date: NaiveDate) -> anyhow::Result<bool> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|(u, e)| !(u == user && e.date == date));
        Ok(entries.len() != before)
    }
}

struct Harness {
    face: Arc<FixedClassifier>,
    text: Arc<FixedClassifier>,
    audio: Arc<FixedClassifier>,
    store: Arc<MemoryStore>,
    settings: PipelineSettings,
}

impl Harness {
    fn new(
        face: Arc<FixedClassifier>,
        text: Arc<FixedClassifier>,
        audio: Arc<FixedClassifier>,
    ) -> Self {
        Self {
            face,
            text,
            audio,
            store: Arc::new(MemoryStore::default()),
            settings: PipelineSettings {
                gate: ConfidenceGate::new(0.6),
                clock: ClockConfig { utc_offset_hours: 0 },
                ..PipelineSettings::default()
            },
        }
    }

    fn session(&self, transcript: &'static str) -> CheckinSession {
        self.session_with(Arc::new(FixedTranscriber(transcript)))
    }

    fn session_with(&self, transcriber: Arc<dyn Transcriber>) -> CheckinSession {
        let services = Services {
            face: self.face.clone(),
            text: self.text.clone(),
            audio: self.audio.clone(),
            transcriber,
            store: self.store.clone(),
        };
        CheckinSession::start("alice@example.com", services, self.settings.clone())
    }

    async fn saved(&self) -> Vec<Entry> {
        self.store.list("alice@example.com").await.unwrap()
    }
}

async fn ready_session(h: &Harness) -> CheckinSession {
    let mut s = h.session("Long day at work, but dinner with friends was nice");
    s.capture_photo(vec![0xFF, 0xD8, 0xFF]);
    let transcript = s.finish_recording(vec![1, 2, 3]).await;
    assert!(!transcript.is_empty());
    s
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_confident_result_saves_immediately() {
    let h = Harness::new(
        FixedClassifier::ok(json!({"predictions": [
            {"class": "joy", "confidence": 0.9},
            {"class": "sad", "confidence": 0.1}
        ]})),
        FixedClassifier::ok(json!([["angry", 0.5], ["sad", 0.5]])),
        FixedClassifier::ok(json!({"transcript": "x", "predictions": [
            {"label": "calm", "confidence": 0.3},
            {"label": "fear", "confidence": 0.7}
        ]})),
    );
    let mut s = ready_session(&h).await;

    let outcome = s.submit().await.unwrap();
    let SubmitOutcome::Saved(summary) = outcome else {
        panic!("expected auto-accept, got {:?}", outcome);
    };
    assert_eq!(summary.entry.final_emotion, Emotion::Happy);
    assert!((summary.entry.face.happy - 0.9).abs() < 1e-9);
    assert!((summary.entry.voice.sad - 0.7).abs() < 1e-9);
    assert_eq!(summary.entry.date, h.settings.clock.today());
    assert_eq!(summary.insights.streak, 1);
    assert_eq!(s.status(), SessionStatus::Completed);

    let saved = h.saved().await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0], summary.entry);
}

#[tokio::test]
async fn test_classifiers_called_once_each() {
    let h = Harness::new(
        FixedClassifier::ok(json!([["joy", 1.0]])),
        FixedClassifier::ok(json!([["joy", 1.0]])),
        FixedClassifier::ok(json!([["joy", 1.0]])),
    );
    let mut s = ready_session(&h).await;
    s.submit().await.unwrap();
    assert_eq!(h.face.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.text.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.audio.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_low_confidence_reject_saves_second_label() {
    // Fused top is 0.55 with threshold 0.6.
    let h = Harness::new(
        FixedClassifier::ok(json!([["joy", 0.55], ["fear", 0.30], ["angry", 0.15]])),
        FixedClassifier::ok(json!([["joy", 0.5], ["sad", 0.5]])),
        FixedClassifier::ok(json!([])),
    );
    let mut s = ready_session(&h).await;

    let outcome = s.submit().await.unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::AwaitingConfirmation {
            label: Emotion::Happy,
            confidence: 0.55,
            modality: Modality::Face,
        }
    );
    assert!(h.saved().await.is_empty(), "nothing persisted while suspended");

    let summary = s.reject().await.unwrap();
    assert_eq!(summary.entry.final_emotion, Emotion::Sad);
    assert_eq!(h.saved().await[0].final_emotion, Emotion::Sad);
}

#[tokio::test]
async fn test_low_confidence_confirm_saves_top_label() {
    let h = Harness::new(
        FixedClassifier::ok(json!([["angry", 0.5], ["sad", 0.4], ["joy", 0.1]])),
        FixedClassifier::failing(),
        FixedClassifier::failing(),
    );
    let mut s = ready_session(&h).await;
    assert!(matches!(
        s.submit().await.unwrap(),
        SubmitOutcome::AwaitingConfirmation { label: Emotion::Angry, .. }
    ));
    let summary = s.confirm().await.unwrap();
    assert_eq!(summary.entry.final_emotion, Emotion::Angry);
}

#[tokio::test]
async fn test_all_modalities_empty_fails_without_saving() {
    let h = Harness::new(
        FixedClassifier::ok(json!({"predictions": []})),
        FixedClassifier::ok(json!([["confused", 0.9]])),
        FixedClassifier::failing(),
    );
    let mut s = ready_session(&h).await;
    assert_eq!(s.submit().await, Err(CheckinError::AllModalitiesEmpty));
    assert!(h.saved().await.is_empty());
    // The user can still retry: captured data is kept.
    assert!(matches!(
        s.status(),
        SessionStatus::Collecting { has_photo: true, has_transcript: true }
    ));
}

#[tokio::test]
async fn test_failed_modality_is_excluded_from_fusion() {
    let h = Harness::new(
        FixedClassifier::failing(),
        FixedClassifier::ok(json!([["annoyed", 0.8], ["calm", 0.2]])),
        FixedClassifier::failing(),
    );
    let mut s = ready_session(&h).await;
    let SubmitOutcome::Saved(summary) = s.submit().await.unwrap() else {
        panic!("expected save");
    };
    assert_eq!(summary.entry.final_emotion, Emotion::Angry);
    // Failed modalities persist as all-zero scores.
    assert_eq!(summary.entry.face.happy + summary.entry.face.sad + summary.entry.face.angry, 0.0);
}

#[tokio::test]
async fn test_missing_preconditions_make_no_calls() {
    let h = Harness::new(
        FixedClassifier::ok(json!([["joy", 1.0]])),
        FixedClassifier::ok(json!([["joy", 1.0]])),
        FixedClassifier::ok(json!([["joy", 1.0]])),
    );

    let mut no_photo = h.session("hello");
    no_photo.finish_recording(vec![1]).await;
    assert!(matches!(no_photo.submit().await, Err(CheckinError::MissingPrecondition(_))));

    let mut no_transcript = h.session("   ");
    no_transcript.capture_photo(vec![1]);
    assert!(matches!(no_transcript.submit().await, Err(CheckinError::MissingPrecondition(_))));
    no_transcript.finish_recording(vec![1]).await;
    assert!(matches!(no_transcript.submit().await, Err(CheckinError::MissingPrecondition(_))));

    assert_eq!(h.face.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.text.calls.load(Ordering::SeqCst), 0);
    assert!(h.saved().await.is_empty());
}

#[tokio::test]
async fn test_persistence_failure_keeps_context_for_retry() {
    let h = Harness::new(
        FixedClassifier::ok(json!([["joy", 0.95], ["sad", 0.05]])),
        FixedClassifier::failing(),
        FixedClassifier::failing(),
    );
    h.store.fail_writes.store(true, Ordering::SeqCst);
    let mut s = ready_session(&h).await;

    let err = s.submit().await.unwrap_err();
    assert!(matches!(err, CheckinError::PersistenceFailure(_)));
    assert_eq!(s.status(), SessionStatus::PendingSave { label: Emotion::Happy });
    assert!(s.pending_context().is_some());

    h.store.fail_writes.store(false, Ordering::SeqCst);
    let summary = s.retry_save().await.unwrap();
    assert_eq!(summary.entry.final_emotion, Emotion::Happy);
    assert_eq!(h.face.calls.load(Ordering::SeqCst), 1, "no re-inference on retry");
    assert_eq!(h.saved().await.len(), 1);
}

#[tokio::test]
async fn test_recapture_keeps_unsaved_result() {
    let h = Harness::new(
        FixedClassifier::ok(json!([["sad", 0.9], ["joy", 0.1]])),
        FixedClassifier::failing(),
        FixedClassifier::failing(),
    );
    h.store.fail_writes.store(true, Ordering::SeqCst);
    let mut s = ready_session(&h).await;
    assert!(matches!(s.submit().await, Err(CheckinError::PersistenceFailure(_))));

    s.capture_photo(vec![0x89, 0x50]);
    s.finish_recording(vec![4, 5, 6]).await;
    assert_eq!(s.status(), SessionStatus::PendingSave { label: Emotion::Sad });

    h.store.fail_writes.store(false, Ordering::SeqCst);
    let summary = s.retry_save().await.unwrap();
    assert_eq!(summary.entry.final_emotion, Emotion::Sad);
    assert_eq!(h.face.calls.load(Ordering::SeqCst), 1);
    assert_eq!(h.saved().await.len(), 1);
}

#[tokio::test]
async fn test_recapture_drops_unanswered_confirmation() {
    let h = Harness::new(
        FixedClassifier::ok(json!([["joy", 0.5], ["sad", 0.5]])),
        FixedClassifier::failing(),
        FixedClassifier::failing(),
    );
    let mut s = ready_session(&h).await;
    assert!(matches!(s.submit().await.unwrap(), SubmitOutcome::AwaitingConfirmation { .. }));

    s.capture_photo(vec![1]);
    assert!(matches!(s.status(), SessionStatus::Collecting { .. }));
    assert_eq!(s.confirm().await, Err(CheckinError::NoPendingConfirmation));
}

#[tokio::test]
async fn test_failed_transcription_blocks_submit() {
    let h = Harness::new(
        FixedClassifier::ok(json!([["joy", 1.0]])),
        FixedClassifier::ok(json!([["joy", 1.0]])),
        FixedClassifier::ok(json!([["joy", 1.0]])),
    );
    let mut s = h.session_with(Arc::new(BrokenTranscriber));
    s.capture_photo(vec![1]);

    assert_eq!(s.finish_recording(vec![1, 2]).await, "");
    assert_eq!(
        s.status(),
        SessionStatus::Collecting { has_photo: true, has_transcript: false }
    );
    assert!(matches!(s.submit().await, Err(CheckinError::MissingPrecondition(_))));

    assert_eq!(h.face.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.text.calls.load(Ordering::SeqCst), 0);
    assert_eq!(h.audio.calls.load(Ordering::SeqCst), 0);
    assert!(h.saved().await.is_empty());
}

#[tokio::test]
async fn test_confirm_without_pending_is_rejected() {
    let h = Harness::new(
        FixedClassifier::ok(json!([["joy", 1.0]])),
        FixedClassifier::failing(),
        FixedClassifier::failing(),
    );
    let mut s = ready_session(&h).await;
    assert_eq!(s.confirm().await, Err(CheckinError::NoPendingConfirmation));
    assert_eq!(s.retry_save().await, Err(CheckinError::NothingToSave));
}

#[tokio::test]
async fn test_abandon_persists_nothing() {
    let h = Harness::new(
        FixedClassifier::ok(json!([["joy", 0.5], ["sad", 0.5]])),
        FixedClassifier::failing(),
        FixedClassifier::failing(),
    );
    let mut s = ready_session(&h).await;
    assert!(matches!(s.submit().await.unwrap(), SubmitOutcome::AwaitingConfirmation { .. }));
    s.abandon();
    assert!(h.saved().await.is_empty());
}

#[tokio::test]
async fn test_second_checkin_same_day_overwrites() {
    let h = Harness::new(
        FixedClassifier::ok(json!([["joy", 1.0]])),
        FixedClassifier::failing(),
        FixedClassifier::failing(),
    );
    ready_session(&h).await.submit().await.unwrap();

    let h2 = Harness {
        face: FixedClassifier::ok(json!([["tired", 1.0]])),
        text: h.text.clone(),
        audio: h.audio.clone(),
        store: h.store.clone(),
        settings: h.settings.clone(),
    };
    ready_session(&h2).await.submit().await.unwrap();

    let saved = h.saved().await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].final_emotion, Emotion::Sad);
}

#[tokio::test]
async fn test_diary_override_policy() {
    let mut h = Harness::new(
        FixedClassifier::ok(json!([["joy", 1.0]])),
        FixedClassifier::failing(),
        FixedClassifier::failing(),
    );
    h.settings.diary_override = true;

    let mut s = h.session("I am so angry and frustrated today");
    s.capture_photo(vec![1]);
    s.finish_recording(vec![1]).await;
    let SubmitOutcome::Saved(summary) = s.submit().await.unwrap() else {
        panic!("expected save");
    };
    assert_eq!(summary.entry.final_emotion, Emotion::Angry);
    assert_eq!(summary.entry.face.angry, 1.0);
}

#[tokio::test]
async fn test_diary_override_off_by_default() {
    let h = Harness::new(
        FixedClassifier::ok(json!([["joy", 1.0]])),
        FixedClassifier::failing(),
        FixedClassifier::failing(),
    );
    let mut s = h.session("I am so angry and frustrated today");
    s.capture_photo(vec![1]);
    s.finish_recording(vec![1]).await;
    let SubmitOutcome::Saved(summary) = s.submit().await.unwrap() else {
        panic!("expected save");
    };
    assert_eq!(summary.entry.final_emotion, Emotion::Happy);
}
