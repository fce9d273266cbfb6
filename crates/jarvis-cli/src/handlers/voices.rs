//! Voices command handler.

use std::sync::Arc;

use anyhow::Result;
use jarvis_core::Settings;
use jarvis_voice::GoogleBackends;

/// Print the available synthesis voices, marking the configured one.
pub async fn execute(settings: Settings, language: Option<String>) -> Result<()> {
    let configured = settings.tts_voice_name.clone();
    let backends = GoogleBackends::new(Arc::new(settings));

    let mut voices = backends.tts().list_voices(language.as_deref()).await?;
    voices.sort_by(|a, b| a.name.cmp(&b.name));

    if voices.is_empty() {
        println!("No voices found.");
        return Ok(());
    }

    println!("{:<2} {:<32} {:<16} {:<8} {:>8}", "", "NAME", "LANGUAGES", "GENDER", "RATE");
    for voice in &voices {
        let marker = if voice.name == configured { "*" } else { "" };
        println!(
            "{:<2} {:<32} {:<16} {:<8} {:>8}",
            marker,
            voice.name,
            voice.language_codes.join(","),
            voice.ssml_gender.as_deref().unwrap_or("-"),
            voice
                .natural_sample_rate_hertz
                .map_or_else(|| "-".to_string(), |r| r.to_string()),
        );
    }
    println!();
    println!("{} voice(s)", voices.len());
    Ok(())
}
