//! Test doubles shared by the adapter integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use jarvis_axum::AxumContext;
use jarvis_core::{
    AudioFrame, ModelError, ModelResponse, ModelSession, ScorerError, Settings,
    SpeechSynthesizer, SynthesisError, VoiceBackends, WakeWordScorer,
};
use tokio::sync::{mpsc, watch};

// ── Model ──────────────────────────────────────────────────────────

/// Replays queued responses, then blocks until closed.
pub struct FakeModel {
    responses: tokio::sync::Mutex<mpsc::UnboundedReceiver<ModelResponse>>,
    closed: watch::Sender<bool>,
    frames: Mutex<Vec<AudioFrame>>,
}

impl FakeModel {
    pub fn new(script: Vec<ModelResponse>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        for response in script {
            tx.send(response).unwrap();
        }
        let (closed, _) = watch::channel(false);
        Self {
            responses: tokio::sync::Mutex::new(rx),
            closed,
            frames: Mutex::new(Vec::new()),
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    pub fn frames(&self) -> Vec<AudioFrame> {
        self.frames.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelSession for FakeModel {
    async fn send_audio(&self, frame: &AudioFrame) -> Result<(), ModelError> {
        if self.is_closed() {
            return Err(ModelError::Closed);
        }
        self.frames.lock().unwrap().push(frame.clone());
        Ok(())
    }

    async fn receive(&self) -> Result<Option<ModelResponse>, ModelError> {
        let mut closed = self.closed.subscribe();
        let mut responses = self.responses.lock().await;
        tokio::select! {
            Some(response) = responses.recv() => Ok(Some(response)),
            _ = closed.wait_for(|closed| *closed) => Err(ModelError::Closed),
        }
    }

    async fn close(&self) {
        self.closed.send_replace(true);
    }
}

// ── Synthesizer ────────────────────────────────────────────────────

/// "Synthesizes" a sentence into its own UTF-8 bytes.
pub struct EchoSynth;

#[async_trait]
impl SpeechSynthesizer for EchoSynth {
    async fn synthesize(&self, text: &str) -> Result<Option<Vec<u8>>, SynthesisError> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(text.as_bytes().to_vec()))
    }
}

// ── Backends ───────────────────────────────────────────────────────

/// Hands every connection a fresh [`FakeModel`] built from the same script.
pub struct FakeBackends {
    script: Vec<ModelResponse>,
    fail_open: bool,
    opened: Mutex<Vec<Arc<FakeModel>>>,
}

impl FakeBackends {
    pub fn new(script: Vec<ModelResponse>) -> Self {
        Self {
            script,
            fail_open: false,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_open: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn opened(&self) -> Vec<Arc<FakeModel>> {
        self.opened.lock().unwrap().clone()
    }
}

#[async_trait]
impl VoiceBackends for FakeBackends {
    async fn open_model_session(&self) -> Result<Arc<dyn ModelSession>, ModelError> {
        if self.fail_open {
            return Err(ModelError::Connect("refused".into()));
        }
        let model = Arc::new(FakeModel::new(self.script.clone()));
        self.opened.lock().unwrap().push(Arc::clone(&model));
        Ok(model)
    }

    fn synthesizer(&self) -> Arc<dyn SpeechSynthesizer> {
        Arc::new(EchoSynth)
    }

    fn wake_scorer(&self) -> Result<Option<Box<dyn WakeWordScorer>>, ScorerError> {
        Ok(None)
    }
}

pub fn settings() -> Arc<Settings> {
    let settings = Settings::from_lookup(|key| match key {
        "GOOGLE_API_KEY" => Some("test-key".to_string()),
        "POLL_INTERVAL_MS" => Some("10".to_string()),
        "STREAM_RETRY_DELAY_MS" => Some("1".to_string()),
        _ => None,
    })
    .unwrap();
    Arc::new(settings)
}

pub fn context(backends: Arc<FakeBackends>) -> AxumContext {
    AxumContext::new(settings(), backends)
}
