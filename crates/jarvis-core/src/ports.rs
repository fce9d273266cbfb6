//! Port definitions (trait abstractions) for the session's external
//! collaborators.
//!
//! # Design Rules
//!
//! - No vendor wire types in any signature; adapters convert at the edge
//! - Every trait is object-safe so sessions hold `Arc<dyn …>` / `Box<dyn …>`
//! - Async methods use [`async_trait`] for dyn compatibility

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{AudioFrame, ModelResponse, WakeScores};
use crate::error::{ModelError, ScorerError, SynthesisError};

// ── Wake word ──────────────────────────────────────────────────────

/// Scores one audio frame against the configured wake words.
///
/// Called synchronously from the session's inbound flow, once per frame.
/// Implementations may keep internal cross-frame state (e.g. a sliding
/// feature window); the gate assumes nothing beyond that.
pub trait WakeWordScorer: Send {
    /// Confidence in `[0, 1]` for each keyword.
    fn score(&mut self, samples: &[i16]) -> WakeScores;
}

// ── Conversational model ───────────────────────────────────────────

/// A live conversational model session, opened once per connection.
///
/// `send_audio` and `receive` are called concurrently from different
/// session tasks, so implementations must serialise internally.
#[async_trait]
pub trait ModelSession: Send + Sync {
    /// Forward one microphone frame. Fire-and-forget: no per-frame
    /// end-of-turn marker is sent.
    async fn send_audio(&self, frame: &AudioFrame) -> Result<(), ModelError>;

    /// Read the next response.
    ///
    /// `Ok(None)` means the current response stream ended without the
    /// session closing; the caller re-enters after a short delay. Any
    /// `Err` is fatal to the session.
    async fn receive(&self) -> Result<Option<ModelResponse>, ModelError>;

    /// Close the session, unblocking any pending `receive`. Idempotent.
    async fn close(&self);
}

// ── Speech synthesis ───────────────────────────────────────────────

/// Text-to-speech backend.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize one sentence to PCM16 LE audio.
    ///
    /// Whitespace-only input returns `Ok(None)` without contacting the
    /// backend.
    async fn synthesize(&self, text: &str) -> Result<Option<Vec<u8>>, SynthesisError>;
}

// ── Composition ────────────────────────────────────────────────────

/// Factory for the per-connection collaborators.
///
/// The server holds one of these and asks it for fresh handles on every
/// accepted connection, so no session shares collaborator state with
/// another.
#[async_trait]
pub trait VoiceBackends: Send + Sync {
    /// Open a new model session.
    async fn open_model_session(&self) -> Result<Arc<dyn ModelSession>, ModelError>;

    /// Create a synthesizer handle.
    fn synthesizer(&self) -> Arc<dyn SpeechSynthesizer>;

    /// Create a wake-word scorer, or `None` when no wake word is configured.
    fn wake_scorer(&self) -> Result<Option<Box<dyn WakeWordScorer>>, ScorerError>;
}
