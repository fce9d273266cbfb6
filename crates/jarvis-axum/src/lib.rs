//! # jarvis-axum
//!
//! HTTP/WebSocket adapter for the Jarvis voice bridge.
//!
//! Exposes a liveness check and the full-duplex `/ws/audio` endpoint. Each
//! accepted socket gets fresh collaborators from the shared
//! [`VoiceBackends`](jarvis_core::VoiceBackends) and runs one
//! [`VoiceSession`](jarvis_voice::VoiceSession).

pub mod bootstrap;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod ws_transport;

pub use bootstrap::{AxumContext, ServerConfig, bootstrap, start_server};
pub use routes::create_router;
pub use state::AppState;
