//! Domain types exchanged between the transport, the session flows and the
//! external collaborators.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FrameError;

/// Per-keyword confidence in `[0, 1]` produced by a wake-word scorer.
///
/// Ordered so that gate decisions are deterministic when several keywords
/// fire on the same frame.
pub type WakeScores = BTreeMap<String, f32>;

// ── Audio ──────────────────────────────────────────────────────────

/// One chunk of microphone audio: PCM16, mono, at the configured input rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrame {
    /// Arrival order on the connection, starting at 0.
    pub seq: u64,
    /// Signed 16-bit samples.
    pub samples: Vec<i16>,
}

impl AudioFrame {
    /// Decode a little-endian PCM16 payload.
    pub fn from_pcm16_le(seq: u64, bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() % 2 != 0 {
            return Err(FrameError::OddLength(bytes.len()));
        }
        let samples = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(Self { seq, samples })
    }

    /// Re-encode the samples as little-endian PCM16.
    #[must_use]
    pub fn to_pcm16_le(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.samples.len() * 2);
        for sample in &self.samples {
            buf.extend_from_slice(&sample.to_le_bytes());
        }
        buf
    }

    /// Number of samples in the frame.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.samples.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

// ── Transport messages ─────────────────────────────────────────────

/// JSON control envelope carried in text transport messages.
///
/// The same shape travels both ways: a client sends it to barge in, the
/// server sends it to tell the client to drop any audio it has not played.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    Interrupt,
}

impl ControlMessage {
    /// Parse a text transport message.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Serialize for a text transport message.
    pub fn to_json(self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self)
    }
}

/// A message received from the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Raw PCM16 LE microphone audio.
    Audio(Vec<u8>),
    /// UTF-8 control JSON.
    Control(String),
}

/// A message the session sends to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    /// Synthesized PCM16 LE audio for one sentence.
    Audio(Vec<u8>),
    /// Out-of-band control notification.
    Control(ControlMessage),
}

// ── Model output ───────────────────────────────────────────────────

/// One response read from the conversational model session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResponse {
    /// The model detected the user talking over it.
    pub interrupted: bool,
    /// Incremental text fragments, in order.
    pub text: Vec<String>,
    /// The model finished its turn.
    pub turn_complete: bool,
}

impl ModelResponse {
    /// Response carrying text fragments only.
    #[must_use]
    pub fn text<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            text: parts.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Response reporting a model-side interruption.
    #[must_use]
    pub fn interrupted() -> Self {
        Self {
            interrupted: true,
            ..Self::default()
        }
    }

    /// Response marking the end of a turn.
    #[must_use]
    pub fn turn_complete() -> Self {
        Self {
            turn_complete: true,
            ..Self::default()
        }
    }
}

/// Item on the session text queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextItem {
    /// An incremental text fragment from the model.
    Delta(String),
    /// Reserved sentinel: the producer is gone, the consumer must stop.
    Finished,
}
