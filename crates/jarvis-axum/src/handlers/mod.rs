//! HTTP and WebSocket handlers.

pub mod audio_ws;
pub mod health;
