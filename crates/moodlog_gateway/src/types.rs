use chrono::NaiveDate;
use moodlog_core::{
    CheckinSummary, Emotion, Entry, Modality, SessionStatus, SubmitOutcome, TrendSeries,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoUpload {
    pub image_base64: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingUpload {
    pub audio_base64: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingResponse {
    pub transcript: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrendQuery {
    #[serde(default)]
    pub highlight: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardResponse {
    pub user: String,
    pub entries: Vec<Entry>,
    pub streak: u32,
    pub recap: Vec<String>,
}

/// Chart data plus the diary shown in each point's tooltip.
#[derive(Debug, Clone, Serialize)]
pub struct TrendResponse {
    #[serde(flatten)]
    pub series: TrendSeries,
    pub diaries: Vec<String>,
}

impl From<TrendSeries> for TrendResponse {
    fn from(series: TrendSeries) -> Self {
        let diaries = series
            .dates
            .iter()
            .map(|d: &NaiveDate| series.diary_for(*d).to_string())
            .collect();
        Self { series, diaries }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub status: SessionStatus,
}

/// Outcome of submit, confirm, reject and retry.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckinResponse {
    Saved {
        success: bool,
        #[serde(flatten)]
        summary: CheckinSummary,
    },
    NeedsConfirmation {
        label: Emotion,
        confidence: f64,
        modality: Modality,
        message: String,
    },
}

impl From<CheckinSummary> for CheckinResponse {
    fn from(summary: CheckinSummary) -> Self {
        Self::Saved {
            success: true,
            summary,
        }
    }
}

impl From<SubmitOutcome> for CheckinResponse {
    fn from(outcome: SubmitOutcome) -> Self {
        match outcome {
            SubmitOutcome::Saved(summary) => summary.into(),
            SubmitOutcome::AwaitingConfirmation {
                label,
                confidence,
                modality,
            } => Self::NeedsConfirmation {
                label,
                confidence,
                modality,
                message: format!(
                    "Is your mood today {}? ({:.0}% sure from {})",
                    label,
                    confidence * 100.0,
                    modality
                ),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ResetResponse {
    pub success: bool,
    pub removed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_needs_confirmation_shape() {
        let resp: CheckinResponse = SubmitOutcome::AwaitingConfirmation {
            label: Emotion::Happy,
            confidence: 0.55,
            modality: Modality::Face,
        }
        .into();
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v["status"], "needs_confirmation");
        assert_eq!(v["label"], "happy");
        assert_eq!(v["modality"], "face");
        assert!(v["message"].as_str().unwrap().contains("55%"));
    }

    #[test]
    fn test_trend_query_defaults() {
        let q: TrendQuery = serde_json::from_value(json!({})).unwrap();
        assert!(q.highlight.is_none());
    }
}
