//! Full-duplex audio WebSocket: one [`VoiceSession`] per connection.
//!
//! The session owns the three flows; this handler only opens the
//! collaborators, wires the socket halves to the session, and tears the
//! connection down once the session returns.

use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::StreamExt;
use jarvis_voice::{GateConfig, SessionConfig, VoiceSession};
use tokio::sync::mpsc;

use crate::state::AppState;
use crate::ws_transport;

/// Outbound messages buffered between the synthesis flow and the socket.
const OUTBOUND_BUFFER: usize = 64;

/// How long the egress task gets to flush after the session has ended.
const EGRESS_GRACE: Duration = Duration::from_secs(2);

/// `GET /ws/audio`
pub async fn audio_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_audio_ws(socket, state))
}

async fn handle_audio_ws(mut socket: WebSocket, state: AppState) {
    tracing::info!("Audio WebSocket connected");

    let model = match state.backends.open_model_session().await {
        Ok(model) => model,
        Err(err) => {
            tracing::error!(error = %err, "Failed to open model session");
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let scorer = match state.backends.wake_scorer() {
        Ok(scorer) => scorer,
        Err(err) => {
            tracing::error!(error = %err, "Failed to create wake-word scorer");
            model.close().await;
            let _ = socket.send(Message::Close(None)).await;
            return;
        }
    };

    let session = VoiceSession::new(
        SessionConfig::from(&state.settings.session),
        model,
        state.backends.synthesizer(),
        scorer,
        GateConfig::from(&state.settings.wake_word),
    );
    let session_id = session.id();

    let (sink, stream) = socket.split();
    let (out_tx, out_rx) = mpsc::channel(OUTBOUND_BUFFER);
    let mut egress = tokio::spawn(ws_transport::forward_outbound(sink, out_rx));

    if let Err(err) = session
        .run(ws_transport::inbound_stream(stream), out_tx)
        .await
    {
        tracing::warn!(session = %session_id, error = %err, "Voice session ended with error");
    }

    // The session dropped its sender, so egress drains what is left and closes.
    match tokio::time::timeout(EGRESS_GRACE, &mut egress).await {
        Ok(Ok(sent)) => tracing::debug!(session = %session_id, sent, "Egress finished"),
        Ok(Err(err)) => tracing::warn!(session = %session_id, error = %err, "Egress task failed"),
        Err(_) => {
            tracing::warn!(session = %session_id, "Egress did not finish in time, aborting");
            egress.abort();
        }
    }

    tracing::info!(session = %session_id, "Audio WebSocket disconnected");
}
