//! Wake-word gate: decides which microphone frames reach the model.
//!
//! The gate wraps a [`WakeWordScorer`] in a small debounced state machine:
//!
//! ```text
//!   Asleep ──(keyword ≥ threshold)──▶ Awake
//!     ▲                                  │
//!     └──(keyword again, after debounce)─┘  + interrupt
//! ```
//!
//! Saying the wake word while the assistant is already awake is a
//! "stop and reset", not a new turn: the gate raises the session's
//! [`InterruptSignal`] and goes back to sleep.
//!
//! The awake flag itself lives in [`WakeState`], shared with the model-output
//! and synthesis flows which must read it on every iteration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use jarvis_core::{AudioFrame, WakeWordScorer, WakeWordSettings};

use crate::interrupt::{InterruptSignal, InterruptSource};

// ── Shared wake state ──────────────────────────────────────────────

/// Shared `Asleep` / `Awake` flag for one session.
///
/// Clones share state. Readers must call [`is_awake`](Self::is_awake) each
/// time rather than caching the result, since any flow may flip it.
#[derive(Debug, Clone, Default)]
pub struct WakeState {
    awake: Arc<AtomicBool>,
}

impl WakeState {
    /// Create a new wake state (initially asleep).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the session is currently awake.
    #[must_use]
    pub fn is_awake(&self) -> bool {
        self.awake.load(Ordering::SeqCst)
    }

    /// Transition to `Awake`. Returns `true` if the state changed.
    pub fn wake(&self) -> bool {
        let changed = !self.awake.swap(true, Ordering::SeqCst);
        if changed {
            tracing::debug!("Wake state: awake");
        }
        changed
    }

    /// Transition to `Asleep`. Returns `true` if the state changed.
    pub fn sleep(&self) -> bool {
        let changed = self.awake.swap(false, Ordering::SeqCst);
        if changed {
            tracing::debug!("Wake state: asleep");
        }
        changed
    }
}

// ── Gate ───────────────────────────────────────────────────────────

/// Detection tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateConfig {
    pub threshold: f32,
    pub log_floor: f32,
    pub debounce: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self::from(&WakeWordSettings::default())
    }
}

impl From<&WakeWordSettings> for GateConfig {
    fn from(settings: &WakeWordSettings) -> Self {
        Self {
            threshold: settings.threshold,
            log_floor: settings.log_floor,
            debounce: settings.debounce,
        }
    }
}

/// State change caused by one frame.
#[derive(Debug, Clone, PartialEq)]
pub enum GateTransition {
    /// `Asleep → Awake` on a keyword.
    Woke { keyword: String, confidence: f32 },
    /// Keyword while awake: interrupt raised, `Awake → Asleep`.
    Retriggered { keyword: String, confidence: f32 },
    /// Passthrough gate woke up again on plain audio.
    Rearmed,
}

/// Result of running one frame through the gate.
#[derive(Debug, Clone, PartialEq)]
pub struct GateOutcome {
    /// Whether the frame should be forwarded to the model.
    pub forward: bool,
    pub transition: Option<GateTransition>,
}

/// Debounced wake-word state machine.
pub struct WakeWordGate {
    /// `None` runs the gate in passthrough mode.
    scorer: Option<Box<dyn WakeWordScorer>>,
    state: WakeState,
    interrupt: InterruptSignal,
    config: GateConfig,
    last_wake: Option<Instant>,
}

impl WakeWordGate {
    /// Create a gate driven by a scorer. The session starts asleep.
    pub fn new(
        scorer: Box<dyn WakeWordScorer>,
        state: WakeState,
        interrupt: InterruptSignal,
        config: GateConfig,
    ) -> Self {
        state.sleep();
        Self {
            scorer: Some(scorer),
            state,
            interrupt,
            config,
            last_wake: None,
        }
    }

    /// Create a gate without a wake word.
    ///
    /// The session starts awake and every frame is forwarded. If another
    /// flow puts the session to sleep (model-side interruption), the next
    /// frame wakes it again.
    pub fn passthrough(state: WakeState, interrupt: InterruptSignal) -> Self {
        state.wake();
        Self {
            scorer: None,
            state,
            interrupt,
            config: GateConfig::default(),
            last_wake: None,
        }
    }

    /// Whether the gate has no scorer.
    #[must_use]
    pub const fn is_passthrough(&self) -> bool {
        self.scorer.is_none()
    }

    #[must_use]
    pub fn is_awake(&self) -> bool {
        self.state.is_awake()
    }

    /// Run one frame through the gate using the current time.
    pub fn process_frame(&mut self, frame: &AudioFrame) -> GateOutcome {
        self.process_frame_at(frame, Instant::now())
    }

    /// Run one frame through the gate as if it arrived at `now`.
    pub fn process_frame_at(&mut self, frame: &AudioFrame, now: Instant) -> GateOutcome {
        let Some(scorer) = self.scorer.as_mut() else {
            let transition = self.state.wake().then_some(GateTransition::Rearmed);
            return GateOutcome {
                forward: true,
                transition,
            };
        };

        let scores = scorer.score(&frame.samples);
        let mut transition = None;

        for (keyword, &confidence) in &scores {
            if confidence < self.config.threshold {
                if confidence >= self.config.log_floor {
                    tracing::debug!(%keyword, confidence, seq = frame.seq, "Wake word below threshold");
                }
                continue;
            }

            if self
                .last_wake
                .is_some_and(|last| now.saturating_duration_since(last) <= self.config.debounce)
            {
                tracing::debug!(%keyword, confidence, "Wake word within debounce window, ignored");
                continue;
            }
            self.last_wake = Some(now);

            if self.state.is_awake() {
                // Sleep first so the synthesis loop never sees the interrupt
                // while still awake.
                self.state.sleep();
                self.interrupt.trigger(InterruptSource::WakeWord);
                tracing::info!(%keyword, confidence, "Wake word while awake: stop and reset");
                transition = Some(GateTransition::Retriggered {
                    keyword: keyword.clone(),
                    confidence,
                });
            } else {
                self.state.wake();
                tracing::info!(%keyword, confidence, "Wake word detected");
                transition = Some(GateTransition::Woke {
                    keyword: keyword.clone(),
                    confidence,
                });
            }
        }

        GateOutcome {
            forward: self.state.is_awake(),
            transition,
        }
    }
}
