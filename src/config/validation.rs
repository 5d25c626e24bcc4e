//! Checks run on the merged configuration before the server starts.

use tracing::warn;

use super::{ServerConfig, TlsConfig};
use crate::core::realtime::{OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice, TEMPERATURE_RANGE};
use crate::utils::url_validation::{validate_public_host, validate_realtime_url};

/// Validate the complete merged configuration.
pub(super) fn validate_server_config(
    config: &ServerConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    validate_api_key(&config.openai_api_key)?;
    validate_realtime_url(&config.realtime_url)
        .map_err(|e| format!("Invalid realtime URL '{}': {e}", config.realtime_url))?;
    if let Some(public_host) = &config.public_host {
        validate_public_host(public_host)
            .map_err(|e| format!("Invalid public host '{public_host}': {e}"))?;
    }
    validate_connect_timeout(config.connect_timeout_seconds)?;
    validate_temperature(config.temperature)?;
    validate_audio_format("input_audio_format", &config.input_audio_format)?;
    validate_audio_format("output_audio_format", &config.output_audio_format)?;
    check_voice(&config.voice);
    validate_tls(&config.tls)?;
    Ok(())
}

/// The realtime API key must be present and non-blank.
pub(super) fn validate_api_key(api_key: &Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    match api_key {
        Some(key) if !key.trim().is_empty() => Ok(()),
        _ => Err("OPENAI_API_KEY is required (set it in the environment or openai.api_key)".into()),
    }
}

pub(super) fn validate_connect_timeout(seconds: u64) -> Result<(), Box<dyn std::error::Error>> {
    if seconds == 0 {
        return Err("OPENAI_CONNECT_TIMEOUT_SECONDS must be greater than zero".into());
    }
    Ok(())
}

pub(super) fn validate_temperature(temperature: f32) -> Result<(), Box<dyn std::error::Error>> {
    if !TEMPERATURE_RANGE.contains(&temperature) {
        return Err(format!(
            "Temperature {temperature} is out of range ({}..={})",
            TEMPERATURE_RANGE.start(),
            TEMPERATURE_RANGE.end()
        )
        .into());
    }
    Ok(())
}

pub(super) fn validate_audio_format(
    field: &str,
    value: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    if OpenAIRealtimeAudioFormat::parse(value).is_none() {
        return Err(format!(
            "Unsupported {field} '{value}' (expected pcm16, g711_ulaw or g711_alaw)"
        )
        .into());
    }
    Ok(())
}

/// New voices ship regularly, so an unknown name only warns.
pub(super) fn check_voice(voice: &str) {
    if OpenAIRealtimeVoice::parse(voice).is_none() {
        warn!(voice, "Unknown realtime voice, passing it through unchanged");
    }
}

/// Both TLS files must exist when TLS is configured.
pub(super) fn validate_tls(tls: &Option<TlsConfig>) -> Result<(), Box<dyn std::error::Error>> {
    let Some(tls) = tls else {
        return Ok(());
    };
    if !tls.cert_path.exists() {
        return Err(format!(
            "TLS certificate file not found: {}",
            tls.cert_path.display()
        )
        .into());
    }
    if !tls.key_path.exists() {
        return Err(format!("TLS key file not found: {}", tls.key_path.display()).into());
    }
    Ok(())
}
