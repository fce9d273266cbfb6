//! Mapping between axum WebSocket messages and session transport messages.
//!
//! Binary frames carry PCM16 audio both ways; text frames carry the JSON
//! control envelope. Ping/pong is handled by the socket itself.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{BoxStream, SplitSink};
use futures_util::{SinkExt, Stream, StreamExt, future};
use jarvis_core::{InboundMessage, OutboundMessage, TransportError};
use tokio::sync::mpsc;

/// Convert one received WebSocket message.
///
/// Returns `None` for messages the session does not care about. A close
/// frame never reaches this point: [`inbound_stream`] ends before it.
pub fn map_inbound(
    message: Result<Message, axum::Error>,
) -> Option<Result<InboundMessage, TransportError>> {
    match message {
        Ok(Message::Binary(bytes)) => Some(Ok(InboundMessage::Audio(bytes))),
        Ok(Message::Text(text)) => Some(Ok(InboundMessage::Control(text))),
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Close(_)) => None,
        Err(err) => Some(Err(TransportError::Protocol(err.to_string()))),
    }
}

/// Inbound half of the socket as a session message stream.
///
/// Ends cleanly when the client sends a close frame; anything after it is
/// never read.
pub fn inbound_stream<S>(socket: S) -> BoxStream<'static, Result<InboundMessage, TransportError>>
where
    S: Stream<Item = Result<Message, axum::Error>> + Send + 'static,
{
    socket
        .take_while(|message| future::ready(!matches!(message, Ok(Message::Close(_)))))
        .filter_map(|message| future::ready(map_inbound(message)))
        .boxed()
}

/// Convert one outbound session message.
pub fn to_ws_message(message: OutboundMessage) -> Result<Message, serde_json::Error> {
    match message {
        OutboundMessage::Audio(pcm) => Ok(Message::Binary(pcm)),
        OutboundMessage::Control(control) => control.to_json().map(Message::Text),
    }
}

/// Drain the session's outbound channel into the socket.
///
/// Runs until the session drops its sender or the client goes away, then
/// closes the sink. Returns the number of messages written.
pub async fn forward_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut outbound: mpsc::Receiver<OutboundMessage>,
) -> u64 {
    let mut sent: u64 = 0;

    while let Some(message) = outbound.recv().await {
        let message = match to_ws_message(message) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(error = %err, "Failed to encode outbound message");
                continue;
            }
        };
        if let Err(err) = sink.send(message).await {
            tracing::debug!(error = %err, "Client socket closed, stopping egress");
            break;
        }
        sent += 1;
    }

    let _ = sink.close().await;
    sent
}
