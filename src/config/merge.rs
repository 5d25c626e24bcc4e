//! Overlay the YAML file on top of the environment layer.

use std::path::PathBuf;

use super::env::EnvConfig;
use super::utils::read_instructions_file;
use super::yaml::YamlConfig;
use super::{DEFAULT_HOST, DEFAULT_INSTRUCTIONS, DEFAULT_PORT, ServerConfig, TlsConfig};
use crate::core::bridge::{DEFAULT_GREETING, DEFAULT_SESSION_INIT_DELAY};
use crate::core::realtime::{
    DEFAULT_CONNECT_TIMEOUT_SECONDS, DEFAULT_REALTIME_MODEL, OPENAI_REALTIME_URL,
    OpenAIRealtimeAudioFormat, OpenAIRealtimeVoice,
};

const DEFAULT_TEMPERATURE: f32 = 0.8;

/// Build a [`ServerConfig`] from the environment, with optional YAML overrides.
///
/// Priority: YAML > ENV > defaults.
pub(super) fn merge_config(
    yaml: Option<YamlConfig>,
) -> Result<ServerConfig, Box<dyn std::error::Error>> {
    let env = EnvConfig::load()?;
    let yaml = yaml.unwrap_or_default();

    let server = yaml.server.unwrap_or_default();
    let openai = yaml.openai.unwrap_or_default();
    let session = yaml.session.unwrap_or_default();

    let tls = merge_tls(&server, &env)?;

    let instructions = resolve_instructions(
        session.instructions,
        session.instructions_path.map(PathBuf::from),
        env.instructions.clone(),
        env.instructions_path.clone(),
    )?;

    Ok(ServerConfig {
        host: server
            .host
            .or(env.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: server.port.or(env.port).unwrap_or(DEFAULT_PORT),
        public_host: server.public_host.or(env.public_host),
        tls,

        openai_api_key: openai.api_key.or(env.openai_api_key),
        realtime_model: openai
            .model
            .or(env.realtime_model)
            .unwrap_or_else(|| DEFAULT_REALTIME_MODEL.to_string()),
        realtime_url: openai
            .url
            .or(env.realtime_url)
            .unwrap_or_else(|| OPENAI_REALTIME_URL.to_string()),
        connect_timeout_seconds: openai
            .connect_timeout_seconds
            .or(env.connect_timeout_seconds)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECONDS),

        voice: session
            .voice
            .or(env.voice)
            .unwrap_or_else(|| OpenAIRealtimeVoice::default().to_string()),
        instructions,
        input_audio_format: session
            .input_audio_format
            .or(env.input_audio_format)
            .unwrap_or_else(|| OpenAIRealtimeAudioFormat::default().to_string()),
        output_audio_format: session
            .output_audio_format
            .or(env.output_audio_format)
            .unwrap_or_else(|| OpenAIRealtimeAudioFormat::default().to_string()),
        temperature: session
            .temperature
            .or(env.temperature)
            .unwrap_or(DEFAULT_TEMPERATURE),
        greeting: session
            .greeting
            .or(env.greeting)
            .unwrap_or_else(|| DEFAULT_GREETING.to_string()),
        session_init_delay_ms: session
            .init_delay_ms
            .or(env.session_init_delay_ms)
            .unwrap_or(DEFAULT_SESSION_INIT_DELAY.as_millis() as u64),
    })
}

/// TLS is on when a cert and key are both known, unless YAML disables it.
fn merge_tls(
    server: &super::yaml::ServerYaml,
    env: &EnvConfig,
) -> Result<Option<TlsConfig>, Box<dyn std::error::Error>> {
    let tls_yaml = server.tls.clone().unwrap_or_default();
    if tls_yaml.enabled == Some(false) {
        return Ok(None);
    }

    let cert_path = tls_yaml
        .cert_path
        .map(PathBuf::from)
        .or_else(|| env.tls_cert_path.clone());
    let key_path = tls_yaml
        .key_path
        .map(PathBuf::from)
        .or_else(|| env.tls_key_path.clone());

    match (cert_path, key_path) {
        (Some(cert_path), Some(key_path)) => Ok(Some(TlsConfig {
            cert_path,
            key_path,
        })),
        (None, None) if tls_yaml.enabled == Some(true) => {
            Err("TLS is enabled but no cert_path/key_path is configured".into())
        }
        (None, None) => Ok(None),
        (Some(_), None) => Err("TLS cert path is set but TLS key path is missing".into()),
        (None, Some(_)) => Err("TLS key path is set but TLS cert path is missing".into()),
    }
}

/// Inline text beats a file path; YAML beats ENV; the built-in prompt is last.
fn resolve_instructions(
    yaml_inline: Option<String>,
    yaml_path: Option<PathBuf>,
    env_inline: Option<String>,
    env_path: Option<PathBuf>,
) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(text) = yaml_inline.filter(|t| !t.trim().is_empty()) {
        return Ok(text);
    }
    if let Some(path) = yaml_path {
        return read_instructions_file(&path);
    }
    if let Some(text) = env_inline {
        return Ok(text);
    }
    if let Some(path) = env_path {
        return read_instructions_file(&path);
    }
    Ok(DEFAULT_INSTRUCTIONS.to_string())
}
