use crate::emotion::Modality;
use thiserror::Error;

/// Failures a check-in can run into.
///
/// Only `NoSignal` and `ServiceUnavailable` are recoverable inside the
/// pipeline (the modality is dropped from fusion). Everything else is
/// reported to the caller of the action that triggered it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CheckinError {
    /// The modality answered, but nothing survived reduction.
    #[error("No usable emotion signal from {0}")]
    NoSignal(Modality),

    /// Every modality came back empty; the check-in cannot complete.
    #[error("No emotion predictions returned by any modality")]
    AllModalitiesEmpty,

    /// The inference call itself failed.
    #[error("{modality} service unavailable: {reason}")]
    ServiceUnavailable { modality: Modality, reason: String },

    /// The entry store could not durably write. The pending check-in is kept.
    #[error("Failed to save entry: {0}")]
    PersistenceFailure(String),

    /// Submission attempted before capture/recording was complete.
    #[error("Missing precondition: {0}")]
    MissingPrecondition(&'static str),

    /// confirm/reject called while nothing is awaiting confirmation.
    #[error("No check-in is awaiting confirmation")]
    NoPendingConfirmation,

    /// retry_save called while no save is pending.
    #[error("No check-in is waiting to be saved")]
    NothingToSave,
}

impl CheckinError {
    /// Whether the pipeline can keep going without this modality.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoSignal(_) | Self::ServiceUnavailable { .. })
    }
}

pub type Result<T> = std::result::Result<T, CheckinError>;
