use crate::retry::{send_with_retry, RetryPolicy};
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use moodlog_core::{EmotionClassifier, ModalityPayload, Transcriber};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Request body shared by every modality endpoint.
#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    source: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    audio_base64: Option<String>,
}

impl<'a> InferenceRequest<'a> {
    fn from_payload(payload: &'a ModalityPayload) -> Self {
        let source = payload.modality().as_str();
        match payload {
            ModalityPayload::Image(bytes) => Self {
                source,
                image_base64: Some(BASE64.encode(bytes)),
                text: None,
                audio_base64: None,
            },
            ModalityPayload::Text(text) => Self {
                source,
                image_base64: None,
                text: Some(text),
                audio_base64: None,
            },
            ModalityPayload::Audio(bytes) => Self::audio(bytes),
        }
    }

    fn audio(bytes: &[u8]) -> Self {
        Self {
            source: "audio",
            image_base64: None,
            text: None,
            audio_base64: Some(BASE64.encode(bytes)),
        }
    }
}

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")
}

async fn post_json(
    client: &reqwest::Client,
    url: &str,
    retry: &RetryPolicy,
    service: &str,
    body: &InferenceRequest<'_>,
) -> Result<Value> {
    let response = send_with_retry(retry, service, || client.post(url).json(body).send()).await?;
    response
        .json::<Value>()
        .await
        .with_context(|| format!("{} returned a non-JSON body", service))
}

/// Emotion classifier behind an HTTP endpoint.
pub struct HttpClassifier {
    name: String,
    url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpClassifier {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            url: url.into(),
            client: build_client(timeout)?,
            retry,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl EmotionClassifier for HttpClassifier {
    async fn classify(&self, payload: &ModalityPayload) -> Result<Value> {
        tracing::debug!("{}: classifying {} payload", self.name, payload.modality());
        let body = InferenceRequest::from_payload(payload);
        post_json(&self.client, &self.url, &self.retry, &self.name, &body).await
    }
}

/// Speech-to-text through the audio endpoint, which answers with a
/// `transcript` field next to its predictions.
pub struct HttpTranscriber {
    url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpTranscriber {
    pub fn new(url: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        Ok(Self {
            url: url.into(),
            client: build_client(timeout)?,
            retry,
        })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        let body = InferenceRequest::audio(audio);
        let json = post_json(&self.client, &self.url, &self.retry, "transcriber", &body).await?;
        let transcript = json
            .get("transcript")
            .and_then(Value::as_str)
            .context("transcriber response has no transcript field")?;
        Ok(transcript.to_string())
    }
}
