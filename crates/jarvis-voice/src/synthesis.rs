//! Streaming synthesis consumer: text queue → sentences → audio frames.
//!
//! A single sequential loop. Sentences are synthesized and sent strictly in
//! the order the model produced them; there is no parallel synthesis.
//!
//! The loop never blocks longer than one poll interval on the queue, so a
//! pending [`InterruptSignal`] is always acted on promptly even when the
//! model is silent. Every sentence is bracketed by two checks of the
//! interrupt and wake state, one before the synthesis call and one before
//! transmission, and the synthesis call itself is abandoned as soon as an
//! interruption is raised.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use jarvis_core::{
    ControlMessage, OutboundMessage, SessionError, SpeechSynthesizer, TextItem, TransportError,
};
use tokio::sync::mpsc;

use crate::gate::WakeState;
use crate::interrupt::InterruptSignal;
use crate::segmenter::SentenceSegmenter;

/// Counters reported when the loop exits.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisStats {
    pub sentences_sent: u64,
    /// Sentences abandoned because of an interruption or the session going
    /// to sleep.
    pub sentences_dropped: u64,
    pub synthesis_failures: u64,
    pub interrupts_handled: u64,
}

/// The synthesis flow of one session.
pub struct StreamingSynthesizer {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    segmenter: SentenceSegmenter,
    wake: WakeState,
    interrupt: InterruptSignal,
    outbound: mpsc::Sender<OutboundMessage>,
    poll_interval: Duration,
    stats: SynthesisStats,
}

impl StreamingSynthesizer {
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        wake: WakeState,
        interrupt: InterruptSignal,
        outbound: mpsc::Sender<OutboundMessage>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            synthesizer,
            segmenter: SentenceSegmenter::new(),
            wake,
            interrupt,
            outbound,
            poll_interval,
            stats: SynthesisStats::default(),
        }
    }

    /// Consume the text queue until the sentinel arrives or every producer
    /// is gone.
    ///
    /// Only a closed outbound channel is fatal; synthesis failures are
    /// logged and skipped.
    pub async fn run(
        mut self,
        mut queue: mpsc::UnboundedReceiver<TextItem>,
    ) -> Result<SynthesisStats, SessionError> {
        tracing::debug!(poll_interval = ?self.poll_interval, "Synthesis loop started");

        loop {
            if self.interrupt.is_set() {
                if self.handle_interrupt(&mut queue).await.is_break() {
                    break;
                }
                continue;
            }

            let item = tokio::select! {
                biased;
                () = self.interrupt.triggered() => continue,
                item = tokio::time::timeout(self.poll_interval, queue.recv()) => item,
            };

            match item {
                // Nothing queued this interval; go round and re-check flags.
                Err(_) => {}
                Ok(None | Some(TextItem::Finished)) => break,
                Ok(Some(TextItem::Delta(delta))) => self.process_delta(&delta).await?,
            }
        }

        tracing::debug!(
            sent = self.stats.sentences_sent,
            dropped = self.stats.sentences_dropped,
            failures = self.stats.synthesis_failures,
            interrupts = self.stats.interrupts_handled,
            "Synthesis loop finished"
        );
        Ok(self.stats)
    }

    fn tripped(&self) -> bool {
        self.interrupt.is_set() || !self.wake.is_awake()
    }

    fn abandon(&mut self, remaining: usize) {
        self.segmenter.clear();
        self.stats.sentences_dropped += remaining as u64;
    }

    async fn process_delta(&mut self, delta: &str) -> Result<(), SessionError> {
        if !self.wake.is_awake() {
            let buffered = self.segmenter.clear();
            tracing::debug!(len = delta.len(), buffered, "Asleep, discarding text");
            return Ok(());
        }

        let sentences = self.segmenter.push(delta);
        let total = sentences.len();

        for (idx, sentence) in sentences.into_iter().enumerate() {
            if self.tripped() {
                self.abandon(total - idx);
                break;
            }
            if sentence.trim().is_empty() {
                continue;
            }

            tracing::info!(sentence = %sentence.trim(), "Synthesizing");
            let result = tokio::select! {
                biased;
                () = self.interrupt.triggered() => None,
                result = self.synthesizer.synthesize(&sentence) => Some(result),
            };

            let audio = match result {
                None => {
                    tracing::debug!("Synthesis abandoned on interrupt");
                    self.abandon(total - idx);
                    break;
                }
                Some(Ok(Some(audio))) => audio,
                Some(Ok(None)) => continue,
                Some(Err(err)) => {
                    tracing::warn!(error = %err, sentence = %sentence.trim(), "Synthesis failed, skipping sentence");
                    self.stats.synthesis_failures += 1;
                    continue;
                }
            };

            if self.tripped() {
                tracing::debug!(bytes = audio.len(), "Discarding stale audio");
                self.abandon(total - idx);
                break;
            }

            // A full outbound channel must not hold up an interruption.
            let sent = tokio::select! {
                biased;
                () = self.interrupt.triggered() => false,
                res = self.outbound.send(OutboundMessage::Audio(audio)) => {
                    res.map_err(|_| TransportError::Closed)?;
                    true
                }
            };
            if !sent {
                tracing::debug!("Interrupted while waiting for the client, audio dropped");
                self.abandon(total - idx);
                break;
            }
            self.stats.sentences_sent += 1;
        }

        Ok(())
    }

    /// Drop all pending text, tell the client to stop playback, then clear
    /// the signal. Breaks if the sentinel turned up in the drained items.
    async fn handle_interrupt(
        &mut self,
        queue: &mut mpsc::UnboundedReceiver<TextItem>,
    ) -> ControlFlow<()> {
        let buffered = self.segmenter.clear();

        let mut drained = 0usize;
        let mut finished = false;
        while let Ok(item) = queue.try_recv() {
            match item {
                TextItem::Delta(_) => drained += 1,
                TextItem::Finished => {
                    finished = true;
                    break;
                }
            }
        }

        if self
            .outbound
            .send(OutboundMessage::Control(ControlMessage::Interrupt))
            .await
            .is_err()
        {
            tracing::warn!("Could not notify client of interrupt, transport closed");
        }

        self.interrupt.clear();
        self.stats.interrupts_handled += 1;
        tracing::info!(buffered, drained, "Interrupt handled");

        if finished {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}
