//! Gemini Live (`BidiGenerateContent`) model session over WebSocket.
//!
//! The session is configured for text responses: microphone audio goes up
//! as base64 PCM chunks, the model answers with streamed text parts that the
//! session speaks through its own synthesizer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use jarvis_core::{AudioFrame, ModelError, ModelResponse, ModelSession, Settings};
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

const LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";
const MODELS_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";
const SETUP_TIMEOUT: Duration = Duration::from_secs(10);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection parameters for a live session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeminiLiveConfig {
    pub api_key: String,
    pub model_id: String,
    pub system_instruction: String,
    /// Sample rate of the PCM forwarded to the model.
    pub input_sample_rate: u32,
}

impl From<&Settings> for GeminiLiveConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            api_key: settings.google_api_key.clone(),
            model_id: settings.gemini_model_id.clone(),
            system_instruction: settings.system_instruction.clone(),
            input_sample_rate: settings.audio.sample_rate,
        }
    }
}

// ── Client → server ────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SetupMessage<'a> {
    setup: Setup<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Setup<'a> {
    model: String,
    generation_config: GenerationConfig,
    system_instruction: InstructionContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: [&'static str; 1],
}

#[derive(Debug, Serialize)]
struct InstructionContent<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeInputMessage<'a> {
    realtime_input: RealtimeInput<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RealtimeInput<'a> {
    media_chunks: [MediaChunk<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct MediaChunk<'a> {
    mime_type: &'a str,
    data: String,
}

fn setup_message(config: &GeminiLiveConfig) -> SetupMessage<'_> {
    let model = if config.model_id.starts_with("models/") {
        config.model_id.clone()
    } else {
        format!("models/{}", config.model_id)
    };
    SetupMessage {
        setup: Setup {
            model,
            generation_config: GenerationConfig {
                response_modalities: ["TEXT"],
            },
            system_instruction: InstructionContent {
                parts: [TextPart {
                    text: &config.system_instruction,
                }],
            },
        },
    }
}

// ── Server → client ────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerMessage {
    setup_complete: Option<serde_json::Value>,
    server_content: Option<ServerContent>,
    go_away: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ServerContent {
    model_turn: Option<Turn>,
    #[serde(default)]
    interrupted: bool,
    #[serde(default)]
    turn_complete: bool,
}

#[derive(Debug, Default, Deserialize)]
struct Turn {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Default, Deserialize)]
struct Part {
    text: Option<String>,
}

impl From<ServerContent> for ModelResponse {
    fn from(content: ServerContent) -> Self {
        let text = content
            .model_turn
            .map(|turn| turn.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        Self {
            interrupted: content.interrupted,
            text,
            turn_complete: content.turn_complete,
        }
    }
}

fn parse_server_message(payload: &[u8]) -> Result<ServerMessage, ModelError> {
    serde_json::from_slice(payload).map_err(|e| ModelError::Protocol(e.to_string()))
}

// ── Session ────────────────────────────────────────────────────────

/// An open Gemini Live session.
///
/// After each `turnComplete`, the next [`receive`](ModelSession::receive)
/// reports the end of that response stream with `Ok(None)`.
pub struct GeminiLiveSession {
    writer: Mutex<SplitSink<WsStream, Message>>,
    reader: Mutex<SplitStream<WsStream>>,
    mime_type: String,
    turn_ended: AtomicBool,
    closed: watch::Sender<bool>,
}

impl GeminiLiveSession {
    /// Open a session and wait for the server to acknowledge the setup.
    pub async fn connect(config: &GeminiLiveConfig) -> Result<Self, ModelError> {
        tracing::info!(model = %config.model_id, "Connecting to Gemini Live");

        let url = format!("{LIVE_ENDPOINT}?key={}", config.api_key);
        let (stream, _) = connect_async(url)
            .await
            .map_err(|e| ModelError::Connect(e.to_string()))?;
        let (mut writer, mut reader) = stream.split();

        let setup = serde_json::to_string(&setup_message(config))
            .map_err(|e| ModelError::Protocol(e.to_string()))?;
        writer
            .send(Message::Text(setup))
            .await
            .map_err(|e| ModelError::Connect(e.to_string()))?;

        tokio::time::timeout(SETUP_TIMEOUT, await_setup_complete(&mut reader))
            .await
            .map_err(|_| ModelError::Connect("timed out waiting for setupComplete".into()))??;

        tracing::info!(model = %config.model_id, "Gemini Live session ready");
        let (closed, _) = watch::channel(false);
        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            mime_type: format!("audio/pcm;rate={}", config.input_sample_rate),
            turn_ended: AtomicBool::new(false),
            closed,
        })
    }

    fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

async fn await_setup_complete(reader: &mut SplitStream<WsStream>) -> Result<(), ModelError> {
    while let Some(message) = reader.next().await {
        let payload = match message.map_err(|e| ModelError::Connect(e.to_string()))? {
            Message::Text(text) => text.into_bytes(),
            Message::Binary(bytes) => bytes,
            Message::Close(frame) => {
                let reason = frame.map(|f| f.reason.to_string()).unwrap_or_default();
                return Err(ModelError::Connect(format!("closed during setup: {reason}")));
            }
            _ => continue,
        };
        if parse_server_message(&payload)?.setup_complete.is_some() {
            return Ok(());
        }
    }
    Err(ModelError::Connect("connection ended during setup".into()))
}

#[async_trait]
impl ModelSession for GeminiLiveSession {
    async fn send_audio(&self, frame: &AudioFrame) -> Result<(), ModelError> {
        if self.is_closed() {
            return Err(ModelError::Closed);
        }
        let message = RealtimeInputMessage {
            realtime_input: RealtimeInput {
                media_chunks: [MediaChunk {
                    mime_type: &self.mime_type,
                    data: STANDARD.encode(frame.to_pcm16_le()),
                }],
            },
        };
        let json = serde_json::to_string(&message).map_err(|e| ModelError::Send(e.to_string()))?;
        self.writer
            .lock()
            .await
            .send(Message::Text(json))
            .await
            .map_err(|e| ModelError::Send(e.to_string()))
    }

    async fn receive(&self) -> Result<Option<ModelResponse>, ModelError> {
        if self.turn_ended.swap(false, Ordering::SeqCst) {
            return Ok(None);
        }

        let mut closed = self.closed.subscribe();
        let mut reader = self.reader.lock().await;
        loop {
            let next = tokio::select! {
                biased;
                () = async {
                    let _ = closed.wait_for(|closed| *closed).await;
                } => return Err(ModelError::Closed),
                next = reader.next() => next,
            };

            let payload = match next {
                None => return Err(ModelError::Closed),
                Some(Err(err)) => return Err(ModelError::Protocol(err.to_string())),
                Some(Ok(Message::Text(text))) => text.into_bytes(),
                Some(Ok(Message::Binary(bytes))) => bytes,
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(?frame, "Gemini Live closed the session");
                    return Err(ModelError::Closed);
                }
                Some(Ok(_)) => continue,
            };

            let message = parse_server_message(&payload)?;
            if let Some(content) = message.server_content {
                let response = ModelResponse::from(content);
                if response.turn_complete {
                    self.turn_ended.store(true, Ordering::SeqCst);
                }
                return Ok(Some(response));
            }
            if let Some(go_away) = message.go_away {
                tracing::warn!(%go_away, "Gemini Live is about to disconnect");
            }
        }
    }

    async fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        if let Err(err) = self.writer.lock().await.close().await {
            tracing::debug!(error = %err, "Error closing Gemini Live socket");
        }
    }
}

// ── Model catalogue ────────────────────────────────────────────────

/// One entry of the model catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub supported_generation_methods: Vec<String>,
}

impl ModelInfo {
    /// Whether the model can be used for a live session.
    #[must_use]
    pub fn supports_live(&self) -> bool {
        self.supported_generation_methods
            .iter()
            .any(|m| m == "bidiGenerateContent")
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ModelsPage {
    #[serde(default)]
    models: Vec<ModelInfo>,
    next_page_token: Option<String>,
}

/// List every model visible to the API key.
pub async fn list_models(http: &reqwest::Client, api_key: &str) -> Result<Vec<ModelInfo>, ModelError> {
    let mut models = Vec::new();
    let mut page_token: Option<String> = None;

    loop {
        let mut request = http
            .get(MODELS_ENDPOINT)
            .query(&[("key", api_key), ("pageSize", "1000")]);
        if let Some(token) = &page_token {
            request = request.query(&[("pageToken", token.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ModelError::Connect(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Protocol(format!("{status}: {body}")));
        }
        let page: ModelsPage = response
            .json()
            .await
            .map_err(|e| ModelError::Protocol(e.to_string()))?;

        models.extend(page.models);
        match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(token) => page_token = Some(token),
            None => break,
        }
    }

    Ok(models)
}
