//! Models command handler.

use std::sync::Arc;

use anyhow::Result;
use jarvis_core::Settings;
use jarvis_voice::GoogleBackends;
use jarvis_voice::backend::gemini_live::list_models;

/// Print the model catalogue, marking models usable for live sessions.
pub async fn execute(settings: Settings, live_only: bool) -> Result<()> {
    let configured = settings.gemini_model_id.clone();
    let api_key = settings.google_api_key.clone();
    let backends = GoogleBackends::new(Arc::new(settings));

    let models: Vec<_> = list_models(backends.http(), &api_key)
        .await?
        .into_iter()
        .filter(|m| !live_only || m.supports_live())
        .collect();

    if models.is_empty() {
        println!("No models found.");
        return Ok(());
    }

    println!("{:<2} {:<48} {:<6} {}", "", "NAME", "LIVE", "DISPLAY NAME");
    for model in &models {
        let id = model.name.strip_prefix("models/").unwrap_or(&model.name);
        let marker = if id == configured { "*" } else { "" };
        println!(
            "{:<2} {:<48} {:<6} {}",
            marker,
            id,
            if model.supports_live() { "yes" } else { "no" },
            model.display_name.as_deref().unwrap_or(""),
        );
    }
    println!();
    println!("{} model(s)", models.len());
    Ok(())
}
