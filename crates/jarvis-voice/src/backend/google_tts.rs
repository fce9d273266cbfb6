//! Google Cloud Text-to-Speech adapter (REST `v1`).
//!
//! Requests `LINEAR16` audio and strips the WAV container the API wraps it
//! in, so the bytes handed to the session are raw PCM16 LE ready to stream.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use jarvis_core::{Settings, SpeechSynthesizer, SynthesisError};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const API_BASE: &str = "https://texttospeech.googleapis.com/v1";

/// Voice and output format for synthesis requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleTtsConfig {
    pub api_key: String,
    pub language_code: String,
    pub voice_name: String,
    pub sample_rate: u32,
}

impl From<&Settings> for GoogleTtsConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            api_key: settings.google_api_key.clone(),
            language_code: settings.tts_language_code.clone(),
            voice_name: settings.tts_voice_name.clone(),
            sample_rate: settings.tts_sample_rate,
        }
    }
}

// ── Wire types ─────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    sample_rate_hertz: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// One entry of the voice catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceInfo {
    pub name: String,
    #[serde(default)]
    pub language_codes: Vec<String>,
    #[serde(default)]
    pub ssml_gender: Option<String>,
    #[serde(default)]
    pub natural_sample_rate_hertz: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<VoiceInfo>,
}

// ── Client ─────────────────────────────────────────────────────────

/// [`SpeechSynthesizer`] backed by Google Cloud Text-to-Speech.
#[derive(Debug, Clone)]
pub struct GoogleTts {
    http: Client,
    config: GoogleTtsConfig,
}

impl GoogleTts {
    pub const fn new(http: Client, config: GoogleTtsConfig) -> Self {
        Self { http, config }
    }

    #[must_use]
    pub const fn config(&self) -> &GoogleTtsConfig {
        &self.config
    }

    /// List available voices, optionally restricted to one language.
    pub async fn list_voices(&self, language: Option<&str>) -> Result<Vec<VoiceInfo>, SynthesisError> {
        let mut request = self
            .http
            .get(format!("{API_BASE}/voices"))
            .query(&[("key", self.config.api_key.as_str())]);
        if let Some(language) = language {
            request = request.query(&[("languageCode", language)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;
        let response = check_status(response).await?;
        let body: VoicesResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::Decode(e.to_string()))?;
        Ok(body.voices)
    }

    fn request_body<'a>(&'a self, text: &'a str) -> SynthesizeRequest<'a> {
        SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.config.language_code,
                name: &self.config.voice_name,
            },
            audio_config: AudioConfig {
                audio_encoding: "LINEAR16",
                sample_rate_hertz: self.config.sample_rate,
            },
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    async fn synthesize(&self, text: &str) -> Result<Option<Vec<u8>>, SynthesisError> {
        if text.trim().is_empty() {
            return Ok(None);
        }

        let response = self
            .http
            .post(format!("{API_BASE}/text:synthesize"))
            .query(&[("key", self.config.api_key.as_str())])
            .json(&self.request_body(text))
            .send()
            .await
            .map_err(|e| SynthesisError::Request(e.to_string()))?;
        let response = check_status(response).await?;

        let body: SynthesizeResponse = response
            .json()
            .await
            .map_err(|e| SynthesisError::Decode(e.to_string()))?;
        let wav = STANDARD
            .decode(body.audio_content)
            .map_err(|e| SynthesisError::Decode(e.to_string()))?;
        let pcm = strip_wav_header(wav)?;

        tracing::debug!(bytes = pcm.len(), voice = %self.config.voice_name, "Sentence synthesized");
        Ok(Some(pcm))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SynthesisError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SynthesisError::Status {
        status: status.as_u16(),
        body,
    })
}

/// Return the payload of the `data` chunk of a RIFF/WAVE buffer.
///
/// Buffers that are not RIFF are assumed to be raw PCM already.
fn strip_wav_header(mut bytes: Vec<u8>) -> Result<Vec<u8>, SynthesisError> {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Ok(bytes);
    }

    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        let size = u32::from_le_bytes([
            bytes[offset + 4],
            bytes[offset + 5],
            bytes[offset + 6],
            bytes[offset + 7],
        ]) as usize;
        let body = offset + 8;

        if id == b"data" {
            let end = body.saturating_add(size).min(bytes.len());
            bytes.truncate(end);
            bytes.drain(..body);
            return Ok(bytes);
        }
        // Chunks are word-aligned.
        offset = body.saturating_add(size).saturating_add(size & 1);
    }

    Err(SynthesisError::Decode("WAV payload has no data chunk".into()))
}
