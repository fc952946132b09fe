//! One user's daily check-in, from capture to saved entry.
//!
//! A `CheckinSession` owns everything that used to be ambient page state:
//! the captured photo, the recording and its transcript, and the pending
//! context while the confidence gate waits for the user. It is created when
//! the check-in starts and consumed by [`CheckinSession::abandon`] or
//! dropped once the entry is saved. Nothing here is shared across sessions.
//!
//! Stage transitions:
//!
//! ```text
//! Collecting ──submit──► (auto-accept) ──save──► Completed
//!      │                                  │
//!      └──submit──► AwaitingConfirmation ─confirm/reject─► save
//!                                         │
//!                        save fails ──► PendingSave ──retry_save──► Completed
//! ```

use crate::config::{ClockConfig, MoodlogConfig};
use crate::diary;
use crate::emotion::{Distribution, Emotion, Modality, ModalityResult};
use crate::entry::Entry;
use crate::error::{CheckinError, Result};
use crate::fusion::select_main;
use crate::gate::{Choice, ConfidenceGate, GateDecision};
use crate::insight::Insights;
use crate::normalizer::Normalizer;
use crate::reducer::Reducer;
use crate::{EmotionClassifier, EntryStore, ModalityPayload, Transcriber};
use chrono::NaiveDate;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// External collaborators a check-in talks to.
#[derive(Clone)]
pub struct Services {
    pub face: Arc<dyn EmotionClassifier>,
    pub text: Arc<dyn EmotionClassifier>,
    pub audio: Arc<dyn EmotionClassifier>,
    pub transcriber: Arc<dyn Transcriber>,
    pub store: Arc<dyn EntryStore>,
}

/// Tunables for the reduction and gating steps.
#[derive(Debug, Clone, Default)]
pub struct PipelineSettings {
    pub gate: ConfidenceGate,
    pub reducer: Reducer,
    pub clock: ClockConfig,
    pub diary_override: bool,
}

impl PipelineSettings {
    pub fn from_config(config: &MoodlogConfig) -> Self {
        Self {
            gate: ConfidenceGate::new(config.gate.threshold),
            reducer: Reducer::new(config.reducer.aggregation),
            clock: config.clock.clone(),
            diary_override: config.policy.diary_override,
        }
    }
}

/// Everything gathered once all modality calls have settled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckinContext {
    pub date: NaiveDate,
    pub diary: String,
    pub face: Distribution,
    pub text: Distribution,
    pub audio: Distribution,
    pub main: ModalityResult,
}

impl CheckinContext {
    pub fn to_entry(&self, label: Emotion) -> Entry {
        Entry {
            date: self.date,
            diary: self.diary.clone(),
            face: (&self.face).into(),
            voice: (&self.audio).into(),
            final_emotion: label,
        }
    }
}

/// Result of a successful save.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckinSummary {
    pub entry: Entry,
    #[serde(flatten)]
    pub insights: Insights,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Saved(CheckinSummary),
    /// The fused result was below threshold; call `confirm` or `reject`.
    AwaitingConfirmation {
        label: Emotion,
        confidence: f64,
        modality: Modality,
    },
}

/// Coarse view of where a session is, for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum SessionStatus {
    Collecting { has_photo: bool, has_transcript: bool },
    AwaitingConfirmation { label: Emotion, confidence: f64 },
    PendingSave { label: Emotion },
    Completed,
}

struct Recording {
    audio: Vec<u8>,
    transcript: String,
}

enum Stage {
    Collecting,
    AwaitingConfirmation {
        context: CheckinContext,
        decision: GateDecision,
    },
    PendingSave {
        context: CheckinContext,
        label: Emotion,
    },
    Completed,
}

pub struct CheckinSession {
    id: Uuid,
    user: String,
    services: Services,
    settings: PipelineSettings,
    normalizer: Normalizer,
    photo: Option<Vec<u8>>,
    recording: Option<Recording>,
    stage: Stage,
}

impl CheckinSession {
    pub fn start(user: impl Into<String>, services: Services, settings: PipelineSettings) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            user: user.into(),
            services,
            settings,
            normalizer: Normalizer::default(),
            photo: None,
            recording: None,
            stage: Stage::Collecting,
        };
        tracing::info!("Check-in {} started for {}", session.id, session.user);
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn transcript(&self) -> Option<&str> {
        self.recording.as_ref().map(|r| r.transcript.as_str())
    }

    pub fn pending_context(&self) -> Option<&CheckinContext> {
        match &self.stage {
            Stage::AwaitingConfirmation { context, .. } | Stage::PendingSave { context, .. } => {
                Some(context)
            }
            _ => None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match &self.stage {
            Stage::Collecting => SessionStatus::Collecting {
                has_photo: self.photo.is_some(),
                has_transcript: self.transcript().is_some_and(|t| !t.trim().is_empty()),
            },
            Stage::AwaitingConfirmation { decision, .. } => match decision {
                GateDecision::NeedsConfirmation { top, .. } => SessionStatus::AwaitingConfirmation {
                    label: top.label,
                    confidence: top.confidence,
                },
                GateDecision::AutoAccept(label) => SessionStatus::PendingSave { label: *label },
            },
            Stage::PendingSave { label, .. } => SessionStatus::PendingSave { label: *label },
            Stage::Completed => SessionStatus::Completed,
        }
    }

    /// Store a captured frame, replacing any earlier capture.
    pub fn capture_photo(&mut self, image: Vec<u8>) {
        tracing::debug!("Check-in {}: captured photo ({} bytes)", self.id, image.len());
        self.photo = Some(image);
        self.reopen_capture();
    }

    /// Store a finished recording and transcribe it.
    ///
    /// A failed transcription is logged and leaves an empty transcript; the
    /// user is asked to re-record when they submit.
    pub async fn finish_recording(&mut self, audio: Vec<u8>) -> String {
        let transcript = match self.services.transcriber.transcribe(&audio).await {
            Ok(t) => t.trim().to_string(),
            Err(e) => {
                tracing::warn!("Check-in {}: transcription failed: {:#}", self.id, e);
                String::new()
            }
        };
        tracing::debug!(
            "Check-in {}: recording {} bytes, transcript {} chars",
            self.id,
            audio.len(),
            transcript.len()
        );
        self.recording = Some(Recording {
            audio,
            transcript: transcript.clone(),
        });
        self.reopen_capture();
        transcript
    }

    /// A new capture drops an unanswered confirmation. A classified result
    /// whose save failed stays pending so `retry_save` can still write it.
    fn reopen_capture(&mut self) {
        if let Stage::PendingSave { label, .. } = &self.stage {
            tracing::warn!(
                "Check-in {}: keeping unsaved {} result across new capture",
                self.id,
                label
            );
            return;
        }
        self.stage = Stage::Collecting;
    }

    /// Run the three classifiers, fuse, and either save or wait for the user.
    pub async fn submit(&mut self) -> Result<SubmitOutcome> {
        let photo = self
            .photo
            .clone()
            .ok_or(CheckinError::MissingPrecondition("capture a photo before submitting"))?;
        let (audio, transcript) = match &self.recording {
            Some(r) if !r.transcript.is_empty() => (r.audio.clone(), r.transcript.clone()),
            _ => {
                return Err(CheckinError::MissingPrecondition(
                    "record a voice diary with a transcript before submitting",
                ))
            }
        };

        let (face, text, audio) = tokio::join!(
            self.classify(self.services.face.as_ref(), ModalityPayload::Image(photo)),
            self.classify(self.services.text.as_ref(), ModalityPayload::Text(transcript.clone())),
            self.classify(self.services.audio.as_ref(), ModalityPayload::Audio(audio)),
        );

        let results = [
            ModalityResult::new(Modality::Face, face.clone()),
            ModalityResult::new(Modality::Text, text.clone()),
            ModalityResult::new(Modality::Audio, audio.clone()),
        ];
        let main = match select_main(&results) {
            Ok(m) => m.clone(),
            Err(e) => {
                tracing::warn!("Check-in {}: {}", self.id, e);
                return Err(e);
            }
        };

        let context = CheckinContext {
            date: self.settings.clock.today(),
            diary: transcript,
            face,
            text,
            audio,
            main,
        };

        let decision = self
            .settings
            .gate
            .evaluate(&context.main.distribution)
            .ok_or(CheckinError::AllModalitiesEmpty)?;

        match decision {
            GateDecision::AutoAccept(label) => {
                tracing::info!(
                    "Check-in {}: auto-accepted {} from {}",
                    self.id,
                    label,
                    context.main.modality
                );
                self.finalize(context, label).await.map(SubmitOutcome::Saved)
            }
            GateDecision::NeedsConfirmation { top, .. } => {
                tracing::info!(
                    "Check-in {}: {} at {:.2} below threshold {:.2}, awaiting confirmation",
                    self.id,
                    top.label,
                    top.confidence,
                    self.settings.gate.threshold()
                );
                let modality = context.main.modality;
                self.stage = Stage::AwaitingConfirmation { context, decision };
                Ok(SubmitOutcome::AwaitingConfirmation {
                    label: top.label,
                    confidence: top.confidence,
                    modality,
                })
            }
        }
    }

    /// Accept the suggested label.
    pub async fn confirm(&mut self) -> Result<CheckinSummary> {
        self.resolve(Choice::Confirm).await
    }

    /// Decline the suggested label; the runner-up is saved instead.
    pub async fn reject(&mut self) -> Result<CheckinSummary> {
        self.resolve(Choice::Reject).await
    }

    pub async fn resolve(&mut self, choice: Choice) -> Result<CheckinSummary> {
        let (context, decision) = match std::mem::replace(&mut self.stage, Stage::Collecting) {
            Stage::AwaitingConfirmation { context, decision } => (context, decision),
            other => {
                self.stage = other;
                return Err(CheckinError::NoPendingConfirmation);
            }
        };
        let label = decision.resolve(choice);
        tracing::info!("Check-in {}: user chose {:?}, saving {}", self.id, choice, label);
        self.finalize(context, label).await
    }

    /// Retry a save that failed, without redoing capture or inference.
    pub async fn retry_save(&mut self) -> Result<CheckinSummary> {
        let (context, label) = match std::mem::replace(&mut self.stage, Stage::Collecting) {
            Stage::PendingSave { context, label } => (context, label),
            other => {
                self.stage = other;
                return Err(CheckinError::NothingToSave);
            }
        };
        self.finalize(context, label).await
    }

    /// Discard the check-in. Nothing is persisted.
    pub fn abandon(self) {
        tracing::info!("Check-in {} abandoned by {}", self.id, self.user);
    }

    async fn classify(
        &self,
        classifier: &dyn EmotionClassifier,
        payload: ModalityPayload,
    ) -> Distribution {
        let modality = payload.modality();
        match classifier.classify(&payload).await {
            Ok(raw) => {
                let candidates = self.normalizer.normalize(&raw);
                let dist = self.settings.reducer.reduce(&candidates);
                if dist.is_empty() {
                    tracing::warn!("Check-in {}: {}", self.id, CheckinError::NoSignal(modality));
                }
                dist
            }
            Err(e) => {
                let err = CheckinError::ServiceUnavailable {
                    modality,
                    reason: format!("{:#}", e),
                };
                tracing::warn!("Check-in {}: {}", self.id, err);
                Distribution::empty()
            }
        }
    }

    async fn finalize(
        &mut self,
        context: CheckinContext,
        label: Emotion,
    ) -> Result<CheckinSummary> {
        let mut entry = context.to_entry(label);
        if self.settings.diary_override {
            diary::apply_override(&mut entry);
        }

        if let Err(e) = self.services.store.upsert(&self.user, &entry).await {
            tracing::error!("Check-in {}: failed to save entry: {:#}", self.id, e);
            self.stage = Stage::PendingSave { context, label };
            return Err(CheckinError::PersistenceFailure(format!("{:#}", e)));
        }

        tracing::info!(
            "Check-in {}: saved {} for {} on {}",
            self.id,
            entry.final_emotion,
            self.user,
            entry.date
        );

        self.stage = Stage::Completed;
        self.photo = None;
        self.recording = None;

        let today = self.settings.clock.today();
        let insights = match self.services.store.list(&self.user).await {
            Ok(entries) => Insights::compute(&entries, today),
            Err(e) => {
                tracing::warn!("Check-in {}: could not reload entries: {:#}", self.id, e);
                Insights::compute(std::slice::from_ref(&entry), today)
            }
        };

        Ok(CheckinSummary { entry, insights })
    }
}
