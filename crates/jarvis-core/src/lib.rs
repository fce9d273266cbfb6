//! # jarvis-core
//!
//! Domain types, settings and port definitions shared by the Jarvis voice
//! bridge crates.
//!
//! - [`config`]: process-wide [`Settings`] loaded from the environment
//! - [`domain`]: audio frames, transport messages, model responses
//! - [`ports`]: trait abstractions over the wake-word scorer, the
//!   conversational model session and the speech synthesizer
//! - [`error`]: error enums for each of the above
//!
//! This crate has no runtime or transport dependencies; adapters live in
//! `jarvis-voice` and `jarvis-axum`.

pub mod config;
pub mod domain;
pub mod error;
pub mod ports;

// Re-export commonly used types for convenience
pub use config::{AudioSettings, SessionSettings, Settings, WakeWordSettings};
pub use domain::{
    AudioFrame, ControlMessage, InboundMessage, ModelResponse, OutboundMessage, TextItem,
    WakeScores,
};
pub use error::{
    ConfigError, FrameError, ModelError, ScorerError, SessionError, SynthesisError,
    TransportError,
};
pub use ports::{ModelSession, SpeechSynthesizer, VoiceBackends, WakeWordScorer};
