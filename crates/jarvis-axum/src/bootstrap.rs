//! Axum server bootstrap - the composition root.
//!
//! This module is the ONLY place where the concrete voice backends are
//! instantiated for the web adapter.

use std::sync::Arc;

use anyhow::{Context, Result};
use jarvis_core::{Settings, VoiceBackends};
use jarvis_voice::GoogleBackends;
use tokio::net::TcpListener;

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.port,
        }
    }

    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Application context for the Axum adapter.
pub struct AxumContext {
    /// Read-only process settings.
    pub settings: Arc<Settings>,
    /// Per-connection collaborator factory.
    pub backends: Arc<dyn VoiceBackends>,
}

impl AxumContext {
    pub fn new(settings: Arc<Settings>, backends: Arc<dyn VoiceBackends>) -> Self {
        Self { settings, backends }
    }
}

/// Wire the Google backends.
///
/// A configured wake-word model is loaded once here so a bad path or a
/// build without the scorer backend fails at startup rather than on the
/// first connection.
pub fn bootstrap(settings: Arc<Settings>) -> Result<AxumContext> {
    let backends = Arc::new(GoogleBackends::new(Arc::clone(&settings)));

    let wake_word = backends
        .wake_scorer()
        .context("Failed to initialise wake-word scorer")?
        .is_some();

    tracing::info!(
        model = %settings.gemini_model_id,
        voice = %settings.tts_voice_name,
        sample_rate = settings.audio.sample_rate,
        wake_word,
        "Voice backends ready"
    );

    Ok(AxumContext::new(settings, backends))
}

/// Bootstrap and serve until Ctrl-C.
pub async fn start_server(settings: Settings, config: ServerConfig) -> Result<()> {
    let ctx = bootstrap(Arc::new(settings))?;
    let app = crate::routes::create_router(ctx);

    let addr = config.bind_address();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!("Jarvis voice bridge listening on http://{addr} (WebSocket at /ws/audio)");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "Failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutdown requested");
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_address_joins_host_and_port() {
        let config = ServerConfig {
            host: "127.0.0.1".into(),
            port: 8000,
        };
        assert_eq!(config.bind_address(), "127.0.0.1:8000");
    }
}
