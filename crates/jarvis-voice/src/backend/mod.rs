//! Concrete collaborators for the session ports.
//!
//! | Feature     | Module           | Port                  |
//! |-------------|------------------|-----------------------|
//! |             | [`gemini_live`]  | `ModelSession`        |
//! |             | [`google_tts`]   | `SpeechSynthesizer`   |
//! | `wake-word` | `rustpotter`     | `WakeWordScorer`      |
//!
//! [`GoogleBackends`] bundles them behind [`VoiceBackends`] so the server
//! can open fresh handles for every connection.

pub mod gemini_live;
pub mod google_tts;
#[cfg(feature = "wake-word")]
pub mod rustpotter;

use std::sync::Arc;

use async_trait::async_trait;
use jarvis_core::{
    ModelError, ModelSession, ScorerError, Settings, SpeechSynthesizer, VoiceBackends,
    WakeWordScorer, WakeWordSettings,
};

use self::gemini_live::{GeminiLiveConfig, GeminiLiveSession};
use self::google_tts::{GoogleTts, GoogleTtsConfig};

/// Gemini Live + Cloud TTS (+ rustpotter when built with `wake-word`).
pub struct GoogleBackends {
    settings: Arc<Settings>,
    http: reqwest::Client,
}

impl GoogleBackends {
    #[must_use]
    pub fn new(settings: Arc<Settings>) -> Self {
        Self {
            settings,
            http: reqwest::Client::new(),
        }
    }

    /// A synthesizer sharing this backend's HTTP connection pool.
    #[must_use]
    pub fn tts(&self) -> GoogleTts {
        GoogleTts::new(self.http.clone(), GoogleTtsConfig::from(self.settings.as_ref()))
    }

    #[must_use]
    pub const fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

#[async_trait]
impl VoiceBackends for GoogleBackends {
    async fn open_model_session(&self) -> Result<Arc<dyn ModelSession>, ModelError> {
        let config = GeminiLiveConfig::from(self.settings.as_ref());
        let session = GeminiLiveSession::connect(&config).await?;
        Ok(Arc::new(session))
    }

    fn synthesizer(&self) -> Arc<dyn SpeechSynthesizer> {
        Arc::new(self.tts())
    }

    fn wake_scorer(&self) -> Result<Option<Box<dyn WakeWordScorer>>, ScorerError> {
        let Some(path) = self.settings.wake_word.model_path.as_deref() else {
            return Ok(None);
        };
        load_scorer(path, &self.settings).map(Some)
    }
}

/// Score the detector must reach before it reports anything.
///
/// The gate applies the wake threshold itself and logs the scores between
/// the floor and the threshold, so the detector has to pass those through.
#[cfg_attr(not(feature = "wake-word"), allow(dead_code))]
fn detection_floor(wake_word: &WakeWordSettings) -> f32 {
    wake_word.log_floor.min(wake_word.threshold)
}

#[cfg(feature = "wake-word")]
fn load_scorer(
    path: &std::path::Path,
    settings: &Settings,
) -> Result<Box<dyn WakeWordScorer>, ScorerError> {
    let scorer = self::rustpotter::RustpotterScorer::load(
        path,
        settings.audio.sample_rate,
        detection_floor(&settings.wake_word),
    )?;
    Ok(Box::new(scorer))
}

#[cfg(not(feature = "wake-word"))]
fn load_scorer(
    path: &std::path::Path,
    _settings: &Settings,
) -> Result<Box<dyn WakeWordScorer>, ScorerError> {
    tracing::error!(
        path = %path.display(),
        "WAKE_WORD_MODEL is set but this build has no wake-word backend (enable the `wake-word` feature)"
    );
    Err(ScorerError::Unavailable)
}
