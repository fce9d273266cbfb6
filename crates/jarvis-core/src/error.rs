//! Error types for the voice bridge.
//!
//! Each external collaborator gets its own error family so the session
//! orchestrator can tell transient per-item failures (synthesis, malformed
//! frames) apart from failures that end the session (transport, model).

use thiserror::Error;

/// Settings could not be loaded from the environment.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    /// The value parses but is outside what the bridge supports.
    #[error("Unsupported configuration: {0}")]
    Unsupported(String),
}

/// A binary transport message is not a valid PCM16 frame.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum FrameError {
    /// PCM16 needs two bytes per sample.
    #[error("Odd-length PCM16 frame ({0} bytes)")]
    OddLength(usize),
}

/// Failures of the conversational model session.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Could not establish the session.
    #[error("Failed to connect to model: {0}")]
    Connect(String),

    /// The session sent something we could not understand.
    #[error("Model protocol error: {0}")]
    Protocol(String),

    /// Sending input to the model failed.
    #[error("Failed to send to model: {0}")]
    Send(String),

    /// The session was closed by either side.
    #[error("Model session closed")]
    Closed,

    /// The response stream kept ending without producing anything.
    #[error("Model response stream ended {0} times in a row")]
    StreamExhausted(u32),
}

/// Failures of a single synthesis call. Never fatal to a session.
#[derive(Debug, Error)]
pub enum SynthesisError {
    /// The request could not be sent or the response not read.
    #[error("Synthesis request failed: {0}")]
    Request(String),

    /// The backend answered with a non-success status.
    #[error("Synthesis backend returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend answered with audio we could not decode.
    #[error("Failed to decode synthesized audio: {0}")]
    Decode(String),
}

/// The wake-word scorer could not be created.
#[derive(Debug, Error)]
pub enum ScorerError {
    /// Loading the keyword model failed.
    #[error("Failed to load wake-word model: {0}")]
    Load(String),

    /// A model was configured but this build has no scorer backend.
    #[error("Wake-word model configured but no scorer backend is compiled in")]
    Unavailable,
}

/// Failures of the client transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The client went away.
    #[error("Transport closed")]
    Closed,

    /// The underlying connection reported an error.
    #[error("Transport protocol error: {0}")]
    Protocol(String),
}

/// A session ended because of an unrecoverable error.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Scorer(#[from] ScorerError),

    /// One of the session tasks panicked or was aborted unexpectedly.
    #[error("Session task failed: {0}")]
    TaskFailed(String),
}
