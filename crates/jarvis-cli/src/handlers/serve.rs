//! Serve command handler.

use anyhow::Result;
use jarvis_axum::{ServerConfig, start_server};
use jarvis_core::Settings;

/// Run the voice bridge until Ctrl-C.
pub async fn execute(settings: Settings, host: Option<String>, port: Option<u16>) -> Result<()> {
    let mut config = ServerConfig::from_settings(&settings);
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(port) = port {
        config.port = port;
    }

    start_server(settings, config).await
}
