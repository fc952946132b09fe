use crate::gate::DEFAULT_THRESHOLD;
use crate::reducer::Aggregation;
use anyhow::{Context, Result};
use chrono::{FixedOffset, NaiveDate, Offset, Utc};
use serde::Deserialize;
use std::path::Path;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MoodlogConfig {
    pub gate: GateConfig,
    pub reducer: ReducerConfig,
    pub inference: InferenceConfig,
    pub store: StoreConfig,
    pub server: ServerConfig,
    pub clock: ClockConfig,
    pub policy: PolicyConfig,
}

impl MoodlogConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: MoodlogConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        config.sanitize();
        Ok(config)
    }

    /// Try to load from path; if file doesn't exist, return defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg.sanitize();
                cfg
            }
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("MOODLOG_FACE_URL") {
            self.inference.face_url = v;
        }
        if let Ok(v) = std::env::var("MOODLOG_TEXT_URL") {
            self.inference.text_url = v;
        }
        if let Ok(v) = std::env::var("MOODLOG_AUDIO_URL") {
            self.inference.audio_url = v;
        }
        if let Ok(v) = std::env::var("MOODLOG_DB_PATH") {
            self.store.db_path = v;
        }
        if let Ok(v) = std::env::var("MOODLOG_HOST") {
            self.server.host = v;
        }
        if let Ok(v) = std::env::var("MOODLOG_PORT") {
            if let Ok(n) = v.parse() {
                self.server.port = n;
            }
        }
        if let Ok(v) = std::env::var("MOODLOG_CONFIDENCE_THRESHOLD") {
            if let Ok(n) = v.parse() {
                self.gate.threshold = n;
            }
        }
        if let Ok(v) = std::env::var("MOODLOG_UTC_OFFSET_HOURS") {
            if let Ok(n) = v.parse() {
                self.clock.utc_offset_hours = n;
            }
        }
    }
}

impl MoodlogConfig {
    /// Replace values the pipeline cannot work with by their defaults.
    fn sanitize(&mut self) {
        let threshold = self.gate.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            tracing::warn!(
                "Confidence threshold {} is outside 0..=1, using {}",
                threshold,
                DEFAULT_THRESHOLD
            );
            self.gate.threshold = DEFAULT_THRESHOLD;
        }
    }
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Top-candidate confidence at or above which a check-in is accepted
    /// without asking the user.
    pub threshold: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReducerConfig {
    pub aggregation: Aggregation,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub face_url: String,
    pub text_url: String,
    /// Also serves transcription: the response carries a `transcript` field.
    pub audio_url: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            face_url: "http://127.0.0.1:7860/face".to_string(),
            text_url: "http://127.0.0.1:7860/text".to_string(),
            audio_url: "http://127.0.0.1:7860/audio".to_string(),
            timeout_secs: 30,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub db_path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: "moodlog.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Calendar days roll over at midnight in this fixed offset from UTC.
    pub utc_offset_hours: i32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        // WIB (Asia/Jakarta)
        Self { utc_offset_hours: 7 }
    }
}

impl ClockConfig {
    pub fn offset(&self) -> FixedOffset {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }

    /// Today's calendar date in the configured offset.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset()).date_naive()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Let strong diary keywords override the fused emotion before saving.
    pub diary_override: bool,
}

// ============================================================================
// Tests
// ============================================================================
