//! Per-connection session orchestration.
//!
//! One [`VoiceSession`] owns the wake state, the interrupt signal and the
//! text queue of a single client connection, and runs three flows on it:
//!
//! ```text
//!   inbound ──frames──▶ WakeWordGate ──(awake)──▶ ModelSession
//!                                                      │
//!   synthesis ◀──TextItem queue── model output ◀──responses
//!       │
//!       └──audio / interrupt──▶ outbound
//! ```
//!
//! The first flow to exit ends the session. The model session is then
//! closed, which unblocks the model-output flow; that flow always leaves the
//! [`TextItem::Finished`] sentinel on the queue on its way out, which stops
//! the synthesis flow.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use jarvis_core::{
    AudioFrame, ControlMessage, InboundMessage, ModelError, ModelSession, OutboundMessage,
    SessionError, SessionSettings, SpeechSynthesizer, TextItem, TransportError, WakeWordScorer,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::gate::{GateConfig, WakeState, WakeWordGate};
use crate::interrupt::{InterruptSignal, InterruptSource};
use crate::synthesis::StreamingSynthesizer;

/// Timing knobs for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Bounded wait on the text queue.
    pub poll_interval: Duration,
    /// Pause before re-entering an exhausted model response stream.
    pub stream_retry_delay: Duration,
    /// Consecutive empty re-entries before giving up. `0` never gives up.
    pub max_empty_reentries: u32,
    /// How long the remaining flows get to wind down once one has exited.
    pub shutdown_grace: Duration,
}

impl From<&SessionSettings> for SessionConfig {
    fn from(settings: &SessionSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval,
            stream_retry_delay: settings.stream_retry_delay,
            max_empty_reentries: settings.max_empty_reentries,
            shutdown_grace: Duration::from_secs(2),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from(&SessionSettings::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Inbound,
    ModelOutput,
    Synthesis,
}

/// State and collaborators of one client connection.
pub struct VoiceSession {
    id: Uuid,
    config: SessionConfig,
    model: Arc<dyn ModelSession>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    gate: WakeWordGate,
    wake: WakeState,
    interrupt: InterruptSignal,
}

impl VoiceSession {
    /// Build a session. Without a scorer the gate runs in passthrough mode
    /// and the session starts awake.
    pub fn new(
        config: SessionConfig,
        model: Arc<dyn ModelSession>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        scorer: Option<Box<dyn WakeWordScorer>>,
        gate_config: GateConfig,
    ) -> Self {
        let wake = WakeState::new();
        let interrupt = InterruptSignal::new();
        let gate = match scorer {
            Some(scorer) => {
                WakeWordGate::new(scorer, wake.clone(), interrupt.clone(), gate_config)
            }
            None => WakeWordGate::passthrough(wake.clone(), interrupt.clone()),
        };

        Self {
            id: Uuid::new_v4(),
            config,
            model,
            synthesizer,
            gate,
            wake,
            interrupt,
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Handle on the session's wake state.
    #[must_use]
    pub fn wake_state(&self) -> WakeState {
        self.wake.clone()
    }

    /// Handle on the session's interrupt signal.
    #[must_use]
    pub fn interrupt_signal(&self) -> InterruptSignal {
        self.interrupt.clone()
    }

    /// Run the session until the client disconnects or a flow fails.
    ///
    /// `inbound` yields client messages in arrival order; synthesized audio
    /// and interrupt notifications go to `outbound`. When this returns, the
    /// model session has been closed and every flow has stopped, so dropping
    /// the transport is all that is left to do.
    pub async fn run<S>(
        self,
        inbound: S,
        outbound: mpsc::Sender<OutboundMessage>,
    ) -> Result<(), SessionError>
    where
        S: Stream<Item = Result<InboundMessage, TransportError>> + Send + Unpin + 'static,
    {
        let span = tracing::info_span!("session", id = %self.id);
        self.run_flows(inbound, outbound).instrument(span).await
    }

    async fn run_flows<S>(
        self,
        inbound: S,
        outbound: mpsc::Sender<OutboundMessage>,
    ) -> Result<(), SessionError>
    where
        S: Stream<Item = Result<InboundMessage, TransportError>> + Send + Unpin + 'static,
    {
        let Self {
            id: _,
            config,
            model,
            synthesizer,
            gate,
            wake,
            interrupt,
        } = self;

        tracing::info!(
            passthrough = gate.is_passthrough(),
            awake = wake.is_awake(),
            "Session started"
        );

        let (text_tx, text_rx) = mpsc::unbounded_channel();

        let mut inbound_task = tokio::spawn(
            inbound_flow(inbound, gate, Arc::clone(&model), interrupt.clone()).in_current_span(),
        );
        let mut model_task = tokio::spawn(
            model_output_flow(
                Arc::clone(&model),
                TextQueue::new(text_tx),
                wake.clone(),
                interrupt.clone(),
                config,
            )
            .in_current_span(),
        );
        let synth = StreamingSynthesizer::new(
            synthesizer,
            wake,
            interrupt,
            outbound,
            config.poll_interval,
        );
        let mut synth_task = tokio::spawn(
            async move {
                let stats = synth.run(text_rx).await?;
                tracing::info!(
                    sent = stats.sentences_sent,
                    dropped = stats.sentences_dropped,
                    failures = stats.synthesis_failures,
                    interrupts = stats.interrupts_handled,
                    "Synthesis stats"
                );
                Ok::<(), SessionError>(())
            }
            .in_current_span(),
        );

        let (first, outcome) = tokio::select! {
            res = &mut inbound_task => (Flow::Inbound, joined(res)),
            res = &mut model_task => (Flow::ModelOutput, joined(res)),
            res = &mut synth_task => (Flow::Synthesis, joined(res)),
        };
        tracing::debug!(flow = ?first, ok = outcome.is_ok(), "First flow exited, shutting down");

        // Unblocks the model-output reader, which then enqueues the sentinel.
        model.close().await;

        if first != Flow::Inbound {
            inbound_task.abort();
            let _ = inbound_task.await;
        }
        if first != Flow::ModelOutput {
            wind_down(model_task, Flow::ModelOutput, config.shutdown_grace).await;
        }
        if first != Flow::Synthesis {
            wind_down(synth_task, Flow::Synthesis, config.shutdown_grace).await;
        }

        match &outcome {
            Ok(()) => tracing::info!("Session ended"),
            Err(err) => tracing::error!(error = %err, flow = ?first, "Session failed"),
        }
        outcome
    }
}

fn joined(
    res: Result<Result<(), SessionError>, tokio::task::JoinError>,
) -> Result<(), SessionError> {
    res.map_err(|err| SessionError::TaskFailed(err.to_string()))?
}

/// Wait for a flow that should already be stopping; abort it if it doesn't.
async fn wind_down(
    mut task: JoinHandle<Result<(), SessionError>>,
    flow: Flow,
    grace: Duration,
) {
    match tokio::time::timeout(grace, &mut task).await {
        Ok(res) => {
            if let Err(err) = joined(res) {
                tracing::debug!(?flow, error = %err, "Flow error during shutdown");
            }
        }
        Err(_) => {
            tracing::warn!(?flow, ?grace, "Flow did not stop in time, aborting");
            task.abort();
        }
    }
}

// ── Inbound flow ───────────────────────────────────────────────────

async fn inbound_flow<S>(
    mut inbound: S,
    mut gate: WakeWordGate,
    model: Arc<dyn ModelSession>,
    interrupt: InterruptSignal,
) -> Result<(), SessionError>
where
    S: Stream<Item = Result<InboundMessage, TransportError>> + Unpin,
{
    let mut seq: u64 = 0;
    let mut forwarded: u64 = 0;

    while let Some(message) = inbound.next().await {
        match message? {
            InboundMessage::Audio(bytes) => {
                let frame_seq = seq;
                seq += 1;
                let frame = match AudioFrame::from_pcm16_le(frame_seq, &bytes) {
                    Ok(frame) => frame,
                    Err(err) => {
                        tracing::warn!(error = %err, seq = frame_seq, "Skipping malformed audio frame");
                        continue;
                    }
                };

                if gate.process_frame(&frame).forward {
                    model.send_audio(&frame).await?;
                    forwarded += 1;
                }
            }
            InboundMessage::Control(text) => match ControlMessage::parse(&text) {
                Ok(ControlMessage::Interrupt) => {
                    interrupt.trigger(InterruptSource::Client);
                }
                Err(err) => {
                    tracing::warn!(error = %err, message = %text, "Ignoring unrecognized control message");
                }
            },
        }
    }

    tracing::info!(frames = seq, forwarded, "Client disconnected");
    Ok(())
}

// ── Model-output flow ──────────────────────────────────────────────

/// Producer side of the text queue. Enqueues the sentinel when dropped, so
/// the synthesis flow stops on every exit path of the model-output flow,
/// panics included.
struct TextQueue {
    tx: mpsc::UnboundedSender<TextItem>,
}

impl TextQueue {
    const fn new(tx: mpsc::UnboundedSender<TextItem>) -> Self {
        Self { tx }
    }

    fn push(&self, text: String) {
        if self.tx.send(TextItem::Delta(text)).is_err() {
            tracing::debug!("Synthesis flow gone, dropping text");
        }
    }
}

impl Drop for TextQueue {
    fn drop(&mut self) {
        let _ = self.tx.send(TextItem::Finished);
    }
}

async fn model_output_flow(
    model: Arc<dyn ModelSession>,
    queue: TextQueue,
    wake: WakeState,
    interrupt: InterruptSignal,
    config: SessionConfig,
) -> Result<(), SessionError> {
    let mut empty_reentries: u32 = 0;
    // Set by an interruption, cleared at the next turn boundary. Waking up
    // again does not unmute the turn that was cut off.
    let mut turn_interrupted = false;

    loop {
        let response = match model.receive().await {
            Ok(Some(response)) => {
                empty_reentries = 0;
                response
            }
            Ok(None) => {
                empty_reentries += 1;
                if config.max_empty_reentries > 0 && empty_reentries >= config.max_empty_reentries {
                    return Err(ModelError::StreamExhausted(empty_reentries).into());
                }
                if std::mem::take(&mut turn_interrupted) {
                    tracing::debug!("Response stream ended, interrupted turn is over");
                }
                if empty_reentries == 1 {
                    tracing::debug!("Model response stream ended, re-entering");
                } else {
                    tracing::warn!(attempt = empty_reentries, "Model response stream empty again, re-entering");
                }
                tokio::time::sleep(config.stream_retry_delay).await;
                continue;
            }
            Err(ModelError::Closed) => {
                tracing::info!("Model session closed");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        if response.interrupted {
            wake.sleep();
            interrupt.trigger(InterruptSource::Model);
            turn_interrupted = !response.turn_complete;
            tracing::debug!(skipped = response.text.len(), "Model reported interruption");
            continue;
        }

        for text in response.text {
            if turn_interrupted {
                tracing::debug!(len = text.len(), "Interrupted turn, dropping model text");
            } else if wake.is_awake() {
                queue.push(text);
            } else {
                tracing::debug!(len = text.len(), "Asleep, dropping model text");
            }
        }

        if response.turn_complete {
            turn_interrupted = false;
            tracing::debug!("Model turn complete");
        }
    }
}
