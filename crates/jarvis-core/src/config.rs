//! Process-wide settings.
//!
//! Settings are read once at start-up from environment variables (the CLI
//! merges an optional `.env` file first) and shared read-only with every
//! session. Loading goes through a lookup function so tests never touch the
//! real process environment.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;

/// Default model used for the live conversation.
pub const DEFAULT_MODEL_ID: &str = "gemini-2.5-pro";

/// Default Google Cloud TTS voice.
pub const DEFAULT_TTS_VOICE: &str = "fr-FR-Neural2-C";

/// Default system instruction sent when the model session opens.
pub const DEFAULT_SYSTEM_INSTRUCTION: &str = "Tu es Jarvis, une assistante domotique. Tu réponds de manière brève, précise et chaleureuse.";

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8000;

/// Microphone audio format accepted from clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioSettings {
    /// Input sample rate in Hz (PCM16 LE, mono).
    pub sample_rate: u32,
    /// Input channel count. Only mono is supported.
    pub channels: u16,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            channels: 1,
        }
    }
}

/// Wake-word gate tuning.
#[derive(Debug, Clone, PartialEq)]
pub struct WakeWordSettings {
    /// Keyword model for the scorer. `None` runs the gate in passthrough mode.
    pub model_path: Option<PathBuf>,
    /// Confidence at or above which a keyword counts as detected.
    pub threshold: f32,
    /// Confidences at or above this (but below `threshold`) are logged.
    pub log_floor: f32,
    /// Minimum time between two accepted detections.
    pub debounce: Duration,
}

impl Default for WakeWordSettings {
    fn default() -> Self {
        Self {
            model_path: None,
            threshold: 0.5,
            log_floor: 0.1,
            debounce: Duration::from_secs(1),
        }
    }
}

/// Per-session timing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Bounded wait on the text queue; also the interrupt polling interval.
    pub poll_interval: Duration,
    /// Delay before re-entering an exhausted model response stream.
    pub stream_retry_delay: Duration,
    /// Consecutive empty re-entries tolerated before the session fails.
    /// `0` retries forever.
    pub max_empty_reentries: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            stream_retry_delay: Duration::from_millis(100),
            max_empty_reentries: 50,
        }
    }
}

/// Application settings.
#[derive(Clone, PartialEq)]
pub struct Settings {
    pub google_api_key: String,
    pub project_id: String,
    pub location: String,
    pub gemini_model_id: String,
    pub tts_voice_name: String,
    pub tts_language_code: String,
    /// Sample rate of synthesized PCM sent back to clients.
    pub tts_sample_rate: u32,
    pub system_instruction: String,
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub audio: AudioSettings,
    pub wake_word: WakeWordSettings,
    pub session: SessionSettings,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("google_api_key", &"<redacted>")
            .field("project_id", &self.project_id)
            .field("location", &self.location)
            .field("gemini_model_id", &self.gemini_model_id)
            .field("tts_voice_name", &self.tts_voice_name)
            .field("tts_language_code", &self.tts_language_code)
            .field("tts_sample_rate", &self.tts_sample_rate)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("audio", &self.audio)
            .field("wake_word", &self.wake_word)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl Settings {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let google_api_key = get("GOOGLE_API_KEY").ok_or(ConfigError::Missing("GOOGLE_API_KEY"))?;

        let wake_defaults = WakeWordSettings::default();
        let session_defaults = SessionSettings::default();
        let audio_defaults = AudioSettings::default();

        let settings = Self {
            google_api_key,
            project_id: get("PROJECT_ID").unwrap_or_else(|| "project-id-placeholder".to_string()),
            location: get("LOCATION").unwrap_or_else(|| "europe-west9".to_string()),
            gemini_model_id: get("GEMINI_MODEL_ID").unwrap_or_else(|| DEFAULT_MODEL_ID.to_string()),
            tts_voice_name: get("TTS_VOICE_NAME").unwrap_or_else(|| DEFAULT_TTS_VOICE.to_string()),
            tts_language_code: get("TTS_LANGUAGE_CODE").unwrap_or_else(|| "fr-FR".to_string()),
            tts_sample_rate: parse_or(&get, "TTS_SAMPLE_RATE", 24_000)?,
            system_instruction: get("SYSTEM_INSTRUCTION")
                .unwrap_or_else(|| DEFAULT_SYSTEM_INSTRUCTION.to_string()),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            audio: AudioSettings {
                sample_rate: parse_or(&get, "SAMPLE_RATE", audio_defaults.sample_rate)?,
                channels: parse_or(&get, "CHANNELS", audio_defaults.channels)?,
            },
            wake_word: WakeWordSettings {
                model_path: get("WAKE_WORD_MODEL").map(PathBuf::from),
                threshold: parse_or(&get, "WAKE_WORD_THRESHOLD", wake_defaults.threshold)?,
                log_floor: parse_or(&get, "WAKE_WORD_LOG_FLOOR", wake_defaults.log_floor)?,
                debounce: millis_or(&get, "WAKE_DEBOUNCE_MS", wake_defaults.debounce)?,
            },
            session: SessionSettings {
                poll_interval: millis_or(&get, "POLL_INTERVAL_MS", session_defaults.poll_interval)?,
                stream_retry_delay: millis_or(
                    &get,
                    "STREAM_RETRY_DELAY_MS",
                    session_defaults.stream_retry_delay,
                )?,
                max_empty_reentries: parse_or(
                    &get,
                    "MAX_EMPTY_REENTRIES",
                    session_defaults.max_empty_reentries,
                )?,
            },
        };

        settings.validate()?;
        tracing::debug!(settings = ?settings, "Settings loaded");
        Ok(settings)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.audio.channels != 1 {
            return Err(ConfigError::Unsupported(format!(
                "only mono input is supported, got {} channels",
                self.audio.channels
            )));
        }
        if self.audio.sample_rate == 0 || self.tts_sample_rate == 0 {
            return Err(ConfigError::Unsupported("sample rates must be non-zero".to_string()));
        }
        let wake = &self.wake_word;
        if !(wake.threshold > 0.0 && wake.threshold <= 1.0) {
            return Err(ConfigError::Unsupported(format!(
                "wake-word threshold must be in (0, 1], got {}",
                wake.threshold
            )));
        }
        if wake.log_floor < 0.0 || wake.log_floor > wake.threshold {
            return Err(ConfigError::Unsupported(format!(
                "wake-word log floor must be in [0, threshold], got {}",
                wake.log_floor
            )));
        }
        if self.session.poll_interval.is_zero() {
            return Err(ConfigError::Unsupported("poll interval must be non-zero".to_string()));
        }
        Ok(())
    }

    /// Socket address string the HTTP server binds to.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}

fn millis_or<G>(get: &G, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
    parse_or(get, key, default_ms).map(Duration::from_millis)
}
