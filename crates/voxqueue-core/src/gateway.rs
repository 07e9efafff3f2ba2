//! Remote speech synthesis.
//!
//! [`SpeechGateway`] is the single seam between the queue and the network:
//! one call per item, base64 PCM back or a [`VoxqueueError::GatewayError`].

use crate::error::{VoxqueueError, VoxqueueResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Default Gemini REST endpoint
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Default text-to-speech model
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";

/// Text-to-speech service boundary
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechGateway: Send + Sync {
    /// Synthesize `text` with the voice `voice_id`, returning base64 encoded
    /// 24 kHz mono 16-bit little-endian PCM
    ///
    /// # Errors
    ///
    /// Returns a gateway error on missing credentials, network or service
    /// failure, or when the response carries no audio
    async fn synthesize(&self, text: &str, voice_id: &str) -> VoxqueueResult<String>;
}

/// Connection settings for [`GeminiGateway`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiConfig {
    /// API key sent as `x-goog-api-key`
    pub api_key: Option<String>,
    /// Base URL, without the `/models/...` suffix
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl GeminiConfig {
    /// Settings with the given API key and defaults elsewhere
    #[must_use]
    pub fn with_api_key<S: Into<String>>(api_key: S) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

/// Gemini `generateContent` text-to-speech client
#[derive(Debug, Clone)]
pub struct GeminiGateway {
    config: GeminiConfig,
    client: reqwest::Client,
}

impl GeminiGateway {
    /// Create a gateway
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built
    pub fn new(config: GeminiConfig) -> VoxqueueResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| VoxqueueError::configuration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    /// Get the gateway settings
    #[must_use]
    pub const fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[allow(dead_code)]
    mime_type: Option<String>,
    data: String,
}

impl GenerateContentResponse {
    fn into_audio(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|part| part.inline_data)
            .map(|inline| inline.data)
            .filter(|data| !data.is_empty())
    }
}

#[async_trait]
impl SpeechGateway for GeminiGateway {
    async fn synthesize(&self, text: &str, voice_id: &str) -> VoxqueueResult<String> {
        let api_key = self.config.api_key.as_deref().filter(|k| !k.is_empty()).ok_or_else(|| {
            VoxqueueError::gateway("API key not found. Set GEMINI_API_KEY or API_KEY.")
        })?;

        let body = json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": voice_id }
                    }
                }
            }
        });

        debug!(model = %self.config.model, voice = voice_id, chars = text.len(), "Requesting speech");

        let response = self
            .client
            .post(self.config.url())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(VoxqueueError::gateway(format!(
                "Synthesis service returned {status}: {}",
                body.trim()
            )));
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            VoxqueueError::gateway(format!("Unreadable response from synthesis service: {e}"))
        })?;

        parsed
            .into_audio()
            .ok_or_else(|| VoxqueueError::gateway("No audio data received from the synthesis service"))
    }
}
