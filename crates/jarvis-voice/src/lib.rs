//! # jarvis-voice
//!
//! The duplex core of the Jarvis voice bridge: wake-word gating, barge-in
//! handling, sentence segmentation with streaming synthesis, and the
//! per-connection [`VoiceSession`] that runs them as three concurrent flows.
//!
//! Concrete Google backends live in [`backend`]; everything else talks to
//! the ports defined in `jarvis-core`.

pub mod backend;
pub mod gate;
pub mod interrupt;
pub mod segmenter;
pub mod session;
pub mod synthesis;

// Re-export key types for convenience
pub use backend::GoogleBackends;
pub use gate::{GateConfig, GateOutcome, GateTransition, WakeState, WakeWordGate};
pub use interrupt::{InterruptSignal, InterruptSource};
pub use segmenter::SentenceSegmenter;
pub use session::{SessionConfig, VoiceSession};
pub use synthesis::{StreamingSynthesizer, SynthesisStats};
