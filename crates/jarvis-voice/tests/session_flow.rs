//! Integration tests for `VoiceSession`.
//!
//! Each test runs a full session (inbound, model-output and synthesis flows)
//! against hand-written fakes: a scripted model session, a synthesizer that
//! echoes sentence text as "audio", and a scorer that fires on a marker
//! sample. No network or audio hardware is involved.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use jarvis_core::{
    AudioFrame, ControlMessage, InboundMessage, ModelError, ModelResponse, ModelSession,
    OutboundMessage, SessionError, SpeechSynthesizer, SynthesisError, TransportError, WakeScores,
    WakeWordScorer,
};
use jarvis_voice::{GateConfig, InterruptSignal, SessionConfig, VoiceSession, WakeState};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Sample value that makes [`MarkerScorer`] report the wake word.
const WAKE_MARKER: i16 = i16::MAX;

type ScriptItem = Result<Option<ModelResponse>, ModelError>;

// ── Fakes ──────────────────────────────────────────────────────────

/// Model session that replays a script and records forwarded frames.
///
/// Once the script runs dry, `receive` blocks until the session is closed.
struct ScriptedModel {
    sent: Mutex<Vec<AudioFrame>>,
    script: tokio::sync::Mutex<mpsc::UnboundedReceiver<ScriptItem>>,
    closed: watch::Sender<bool>,
}

impl ScriptedModel {
    fn new() -> (Arc<Self>, mpsc::UnboundedSender<ScriptItem>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);
        let model = Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            script: tokio::sync::Mutex::new(rx),
            closed,
        });
        (model, tx)
    }

    fn sent_seqs(&self) -> Vec<u64> {
        self.sent.lock().unwrap().iter().map(|f| f.seq).collect()
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    async fn wait_closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

#[async_trait]
impl ModelSession for ScriptedModel {
    async fn send_audio(&self, frame: &AudioFrame) -> Result<(), ModelError> {
        self.sent.lock().unwrap().push(frame.clone());
        Ok(())
    }

    async fn receive(&self) -> Result<Option<ModelResponse>, ModelError> {
        let mut script = self.script.lock().await;
        tokio::select! {
            () = self.wait_closed() => Err(ModelError::Closed),
            item = script.recv() => match item {
                Some(item) => item,
                None => {
                    self.wait_closed().await;
                    Err(ModelError::Closed)
                }
            },
        }
    }

    async fn close(&self) {
        self.closed.send_replace(true);
    }
}

/// Synthesizer that returns the sentence bytes as audio.
#[derive(Default)]
struct EchoSynthesizer {
    calls: Mutex<Vec<String>>,
}

impl EchoSynthesizer {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for EchoSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Option<Vec<u8>>, SynthesisError> {
        self.calls.lock().unwrap().push(text.to_string());
        Ok(Some(text.as_bytes().to_vec()))
    }
}

/// Reports "jarvis" at 0.9 when the frame starts with [`WAKE_MARKER`].
struct MarkerScorer;

impl WakeWordScorer for MarkerScorer {
    fn score(&mut self, samples: &[i16]) -> WakeScores {
        let confidence = if samples.first() == Some(&WAKE_MARKER) { 0.9 } else { 0.0 };
        WakeScores::from([("jarvis".to_string(), confidence)])
    }
}

// ── Harness ────────────────────────────────────────────────────────

struct Harness {
    inbound: mpsc::UnboundedSender<Result<InboundMessage, TransportError>>,
    outbound: mpsc::Receiver<OutboundMessage>,
    script: mpsc::UnboundedSender<ScriptItem>,
    model: Arc<ScriptedModel>,
    synth: Arc<EchoSynthesizer>,
    wake: WakeState,
    interrupt: InterruptSignal,
    task: JoinHandle<Result<(), SessionError>>,
}

fn test_config() -> SessionConfig {
    SessionConfig {
        poll_interval: Duration::from_millis(10),
        stream_retry_delay: Duration::from_millis(1),
        max_empty_reentries: 0,
        shutdown_grace: Duration::from_millis(500),
    }
}

fn start(config: SessionConfig, scorer: Option<Box<dyn WakeWordScorer>>) -> Harness {
    let (model, script) = ScriptedModel::new();
    let synth = Arc::new(EchoSynthesizer::default());
    let gate_config = GateConfig {
        threshold: 0.5,
        log_floor: 0.1,
        debounce: Duration::from_millis(20),
    };

    let session = VoiceSession::new(
        config,
        model.clone(),
        synth.clone(),
        scorer,
        gate_config,
    );
    let wake = session.wake_state();
    let interrupt = session.interrupt_signal();

    let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
    let (outbound_tx, outbound_rx) = mpsc::channel(32);
    let inbound = futures_util::stream::poll_fn(move |cx| inbound_rx.poll_recv(cx));
    let task = tokio::spawn(session.run(inbound, outbound_tx));

    Harness {
        inbound: inbound_tx,
        outbound: outbound_rx,
        script,
        model,
        synth,
        wake,
        interrupt,
        task,
    }
}

fn quiet_frame() -> InboundMessage {
    InboundMessage::Audio(vec![0; 320])
}

fn wake_frame() -> InboundMessage {
    let mut bytes = WAKE_MARKER.to_le_bytes().to_vec();
    bytes.resize(320, 0);
    InboundMessage::Audio(bytes)
}

async fn next_out(rx: &mut mpsc::Receiver<OutboundMessage>) -> OutboundMessage {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for outbound message")
        .expect("outbound channel closed")
}

async fn eventually(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition never held: {what}");
}

async fn finish(h: Harness) -> (Result<(), SessionError>, Arc<ScriptedModel>) {
    drop(h.inbound);
    let result = tokio::time::timeout(Duration::from_secs(2), h.task)
        .await
        .expect("session did not shut down")
        .expect("session task panicked");
    (result, h.model)
}

// ── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn frames_reach_model_only_after_wake_word() {
    let h = start(test_config(), Some(Box::new(MarkerScorer)));
    assert!(!h.wake.is_awake());

    for _ in 0..3 {
        h.inbound.send(Ok(quiet_frame())).unwrap();
    }
    h.inbound.send(Ok(wake_frame())).unwrap();
    h.inbound.send(Ok(quiet_frame())).unwrap();

    let model = h.model.clone();
    eventually("two frames forwarded", || model.sent_seqs().len() == 2).await;
    assert_eq!(h.model.sent_seqs(), vec![3, 4]);
    assert!(h.wake.is_awake());

    let (result, _) = finish(h).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn fragments_are_spoken_as_one_sentence() {
    let mut h = start(test_config(), None);
    for delta in ["Bonjour", " le", " monde."] {
        h.script.send(Ok(Some(ModelResponse::text([delta])))).unwrap();
    }
    h.script.send(Ok(Some(ModelResponse::turn_complete()))).unwrap();

    assert_eq!(
        next_out(&mut h.outbound).await,
        OutboundMessage::Audio(b"Bonjour le monde.".to_vec())
    );
    assert_eq!(h.synth.calls(), vec!["Bonjour le monde."]);

    let (result, model) = finish(h).await;
    assert!(result.is_ok());
    assert!(model.is_closed());
}

#[tokio::test]
async fn model_interruption_silences_rest_of_turn() {
    let mut h = start(test_config(), None);
    h.script.send(Ok(Some(ModelResponse::text(["Je disais que "])))).unwrap();
    h.script.send(Ok(Some(ModelResponse::interrupted()))).unwrap();
    h.script.send(Ok(Some(ModelResponse::text(["la suite arrive."])))).unwrap();

    assert_eq!(
        next_out(&mut h.outbound).await,
        OutboundMessage::Control(ControlMessage::Interrupt)
    );
    let interrupt = h.interrupt.clone();
    eventually("interrupt cleared", || !interrupt.is_set()).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(!h.wake.is_awake());
    assert!(h.synth.calls().is_empty());
    assert!(h.outbound.try_recv().is_err());

    let (result, _) = finish(h).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn interrupted_turn_stays_silent_after_rearm() {
    let mut h = start(test_config(), None);
    h.script.send(Ok(Some(ModelResponse::text(["Je disais que "])))).unwrap();
    h.script.send(Ok(Some(ModelResponse::interrupted()))).unwrap();

    assert_eq!(
        next_out(&mut h.outbound).await,
        OutboundMessage::Control(ControlMessage::Interrupt)
    );
    let interrupt = h.interrupt.clone();
    eventually("interrupt cleared", || !interrupt.is_set()).await;

    // The client keeps streaming, which re-arms a passthrough gate.
    h.inbound.send(Ok(quiet_frame())).unwrap();
    let wake = h.wake.clone();
    eventually("re-armed", || wake.is_awake()).await;

    h.script.send(Ok(Some(ModelResponse::text(["la suite arrive."])))).unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.synth.calls().is_empty());
    assert!(h.outbound.try_recv().is_err());

    // The next turn is spoken normally.
    h.script.send(Ok(Some(ModelResponse::turn_complete()))).unwrap();
    h.script.send(Ok(Some(ModelResponse::text(["Nouvelle réponse."])))).unwrap();
    assert_eq!(
        next_out(&mut h.outbound).await,
        OutboundMessage::Audio("Nouvelle réponse.".as_bytes().to_vec())
    );
    assert_eq!(h.synth.calls(), vec!["Nouvelle réponse."]);

    let (result, _) = finish(h).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn interrupted_turn_ends_with_response_stream() {
    let mut h = start(test_config(), None);
    h.script.send(Ok(Some(ModelResponse::interrupted()))).unwrap();
    assert_eq!(
        next_out(&mut h.outbound).await,
        OutboundMessage::Control(ControlMessage::Interrupt)
    );
    let interrupt = h.interrupt.clone();
    eventually("interrupt cleared", || !interrupt.is_set()).await;

    h.inbound.send(Ok(quiet_frame())).unwrap();
    let wake = h.wake.clone();
    eventually("re-armed", || wake.is_awake()).await;

    h.script.send(Ok(None)).unwrap();
    h.script.send(Ok(Some(ModelResponse::text(["Je vous écoute."])))).unwrap();
    assert_eq!(
        next_out(&mut h.outbound).await,
        OutboundMessage::Audio("Je vous écoute.".as_bytes().to_vec())
    );

    let (result, _) = finish(h).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn client_interrupt_is_acknowledged() {
    let mut h = start(test_config(), None);
    h.inbound
        .send(Ok(InboundMessage::Control(r#"{"type":"volume_up"}"#.to_string())))
        .unwrap();
    h.inbound
        .send(Ok(InboundMessage::Control(r#"{"type": "interrupt"}"#.to_string())))
        .unwrap();

    assert_eq!(
        next_out(&mut h.outbound).await,
        OutboundMessage::Control(ControlMessage::Interrupt)
    );
    let interrupt = h.interrupt.clone();
    eventually("interrupt cleared", || !interrupt.is_set()).await;

    // The session keeps speaking after the interruption is handled.
    h.script.send(Ok(Some(ModelResponse::text(["Oui?"])))).unwrap();
    assert_eq!(
        next_out(&mut h.outbound).await,
        OutboundMessage::Audio(b"Oui?".to_vec())
    );

    let (result, _) = finish(h).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn odd_length_frames_are_skipped() {
    let h = start(test_config(), None);
    h.inbound.send(Ok(InboundMessage::Audio(vec![1, 2, 3]))).unwrap();
    h.inbound.send(Ok(quiet_frame())).unwrap();

    let model = h.model.clone();
    eventually("valid frame forwarded", || !model.sent_seqs().is_empty()).await;
    assert_eq!(h.model.sent_seqs(), vec![1]);

    let (result, _) = finish(h).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn repeated_wake_word_stops_and_resets() {
    let mut h = start(test_config(), Some(Box::new(MarkerScorer)));
    h.inbound.send(Ok(wake_frame())).unwrap();
    let wake = h.wake.clone();
    eventually("awake", || wake.is_awake()).await;

    h.script.send(Ok(Some(ModelResponse::text(["À votre service."])))).unwrap();
    assert_eq!(
        next_out(&mut h.outbound).await,
        OutboundMessage::Audio("À votre service.".as_bytes().to_vec())
    );

    tokio::time::sleep(Duration::from_millis(50)).await;
    h.inbound.send(Ok(wake_frame())).unwrap();

    assert_eq!(
        next_out(&mut h.outbound).await,
        OutboundMessage::Control(ControlMessage::Interrupt)
    );
    assert!(!h.wake.is_awake());
    // The re-trigger frame itself is not forwarded.
    assert_eq!(h.model.sent_seqs(), vec![0]);

    let (result, _) = finish(h).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn transport_error_ends_session_and_closes_model() {
    let h = start(test_config(), None);
    h.inbound
        .send(Err(TransportError::Protocol("reset by peer".into())))
        .unwrap();

    let (result, model) = finish(h).await;
    assert!(matches!(
        result,
        Err(SessionError::Transport(TransportError::Protocol(_)))
    ));
    assert!(model.is_closed());
}

#[tokio::test]
async fn stream_exhaustion_is_bounded() {
    let config = SessionConfig {
        max_empty_reentries: 3,
        ..test_config()
    };
    let h = start(config, None);
    for _ in 0..3 {
        h.script.send(Ok(None)).unwrap();
    }

    let result = tokio::time::timeout(Duration::from_secs(2), h.task)
        .await
        .expect("session did not shut down")
        .expect("session task panicked");
    assert!(matches!(
        result,
        Err(SessionError::Model(ModelError::StreamExhausted(3)))
    ));
    assert!(h.model.is_closed());
}

#[tokio::test]
async fn stream_reentry_recovers() {
    let config = SessionConfig {
        max_empty_reentries: 3,
        ..test_config()
    };
    let mut h = start(config, None);
    h.script.send(Ok(None)).unwrap();
    h.script.send(Ok(None)).unwrap();
    h.script.send(Ok(Some(ModelResponse::text(["Me revoilà."])))).unwrap();
    // The counter resets on every real response.
    h.script.send(Ok(None)).unwrap();
    h.script.send(Ok(None)).unwrap();

    assert_eq!(
        next_out(&mut h.outbound).await,
        OutboundMessage::Audio("Me revoilà.".as_bytes().to_vec())
    );

    let (result, _) = finish(h).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn model_disconnect_ends_session_cleanly() {
    let h = start(test_config(), None);
    h.script.send(Err(ModelError::Closed)).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), h.task)
        .await
        .expect("session did not shut down")
        .expect("session task panicked");
    assert!(result.is_ok());
}

#[tokio::test]
async fn model_protocol_error_is_fatal() {
    let h = start(test_config(), None);
    h.script
        .send(Err(ModelError::Protocol("unexpected frame".into())))
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(2), h.task)
        .await
        .expect("session did not shut down")
        .expect("session task panicked");
    assert!(matches!(result, Err(SessionError::Model(ModelError::Protocol(_)))));
    assert!(h.model.is_closed());
}
